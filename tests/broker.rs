//! End-to-end scenarios for the broker's external behavior, one test per
//! scenario.

use notify_broker::{
    Broker, BrokerError, NotifyRequest, NotifyResponse, Severity, SubscribeRequest,
};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

fn info(message: &str, active: bool) -> NotifyRequest {
    NotifyRequest {
        message: message.to_string(),
        level: Severity::Info,
        active,
        actions: Vec::new(),
        open: None,
        preview: None,
    }
}

fn blocking(message: &str, active: bool, actions: &[&str]) -> NotifyRequest {
    NotifyRequest {
        message: message.to_string(),
        level: Severity::Warning,
        active,
        actions: actions.iter().map(|a| a.to_string()).collect(),
        open: None,
        preview: None,
    }
}

#[tokio::test]
async fn blocking_fan_out_with_response() {
    let broker = Broker::new();
    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());
    let mut s2 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());
    let mut s3 = broker.subscribe(SubscribeRequest { active: false }, CancellationToken::new());

    let req = blocking("reload?", true, &["yes", "no"]);
    let broker2 = broker.clone();
    let notify_task = tokio::spawn(async move { broker2.notify(req, CancellationToken::new()).await });

    let env1 = s1.recv().await.unwrap().unwrap();
    let env2 = s2.recv().await.unwrap().unwrap();
    assert_eq!(env1.id, 0);
    assert_eq!(env2.id, 0);
    assert_eq!(env1.request.message, "reload?");

    // S3 is ineligible (different `active`); nothing should be waiting for it.
    let s3_result = timeout(Duration::from_millis(50), s3.recv()).await;
    assert!(s3_result.is_err(), "ineligible subscriber should receive nothing");

    broker.respond(0, NotifyResponse::Action("yes".to_string())).unwrap();

    let response = notify_task.await.unwrap().unwrap();
    assert_eq!(response, NotifyResponse::Action("yes".to_string()));
}

#[tokio::test]
async fn non_blocking_info_acks_immediately() {
    let broker = Broker::new();
    let mut s1 = broker.subscribe(SubscribeRequest { active: false }, CancellationToken::new());

    let response = broker
        .notify(info("hi", false), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response, NotifyResponse::Empty);

    let envelope = s1.recv().await.unwrap().unwrap();
    assert_eq!(envelope.id, 0);
    assert_eq!(envelope.request.message, "hi");
}

#[tokio::test]
async fn late_subscriber_replays_blocking_notification() {
    let broker = Broker::new();

    let req = blocking("ok?", true, &["ok"]);
    let broker2 = broker.clone();
    let notify_task = tokio::spawn(async move { broker2.notify(req, CancellationToken::new()).await });

    // Give the dispatcher a moment to insert the pending entry before the
    // late subscriber joins.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());
    let envelope = s1.recv().await.unwrap().unwrap();
    assert_eq!(envelope.id, 0);

    broker.respond(0, NotifyResponse::Action("ok".to_string())).unwrap();
    let response = notify_task.await.unwrap().unwrap();
    assert_eq!(response, NotifyResponse::Action("ok".to_string()));

    // The entry is gone: a second respond for the same id is stale.
    let late = broker.respond(0, NotifyResponse::Action("ok".to_string()));
    assert!(matches!(late, Err(BrokerError::DeadlineExceeded(0))));
}

#[tokio::test]
async fn late_subscriber_does_not_replay_non_blocking_twice() {
    let broker = Broker::new();

    let response = broker
        .notify(info("x", true), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response, NotifyResponse::Empty);

    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());
    let envelope = s1.recv().await.unwrap().unwrap();
    assert_eq!(envelope.id, 0);

    let mut s2 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());
    let s2_result = timeout(Duration::from_millis(50), s2.recv()).await;
    assert!(s2_result.is_err(), "second late joiner must not see a stale non-blocking entry");
}

#[tokio::test]
async fn slow_subscriber_is_evicted_without_stalling_producers() {
    let broker = Broker::new();
    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());

    for _ in 0..101 {
        let response = broker
            .notify(info("tick", true), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, NotifyResponse::Empty);
    }

    // Drain the 100 buffered envelopes; the 101st notification observed the
    // queue full and evicted the subscription, so the stream ends in Aborted.
    for _ in 0..100 {
        assert!(s1.recv().await.unwrap().is_some());
    }
    let final_result = s1.recv().await;
    assert!(matches!(final_result, Err(BrokerError::Aborted(_))));
}

#[tokio::test]
async fn producer_cancellation_races_respond() {
    let broker = Broker::new();
    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());

    let req = blocking("reload?", true, &["yes"]);
    let producer_cancel = CancellationToken::new();
    let broker2 = broker.clone();
    let producer_cancel2 = producer_cancel.clone();
    let notify_task = tokio::spawn(async move { broker2.notify(req, producer_cancel2).await });

    let envelope = s1.recv().await.unwrap().unwrap();
    let id = envelope.id;

    producer_cancel.cancel();
    let respond_result = broker.respond(id, NotifyResponse::Action("yes".to_string()));
    let notify_result = notify_task.await.unwrap();

    match (notify_result, respond_result) {
        (Err(BrokerError::Cancelled), Err(BrokerError::DeadlineExceeded(got_id))) => {
            assert_eq!(got_id, id);
        }
        (Ok(NotifyResponse::Action(action)), Ok(())) => {
            assert_eq!(action, "yes");
        }
        other => panic!("unexpected race outcome: {other:?}"),
    }

    // Either way, the entry is gone exactly once: a further respond is stale.
    let stale = broker.respond(id, NotifyResponse::Action("yes".to_string()));
    assert!(matches!(stale, Err(BrokerError::DeadlineExceeded(_))));
}

#[tokio::test]
async fn invalid_response_does_not_disturb_a_waiting_producer() {
    let broker = Broker::new();
    let mut s1 = broker.subscribe(SubscribeRequest { active: true }, CancellationToken::new());

    let req = blocking("reload?", true, &["yes"]);
    let broker2 = broker.clone();
    let notify_task = tokio::spawn(async move { broker2.notify(req, CancellationToken::new()).await });

    let envelope = s1.recv().await.unwrap().unwrap();
    let id = envelope.id;

    let bad = broker.respond(id, NotifyResponse::Action("maybe".to_string()));
    assert!(matches!(bad, Err(BrokerError::InvalidArgument(_))));

    broker.respond(id, NotifyResponse::Action("yes".to_string())).unwrap();
    let response = notify_task.await.unwrap().unwrap();
    assert_eq!(response, NotifyResponse::Action("yes".to_string()));
}

#[tokio::test]
async fn pending_table_admission_is_bounded() {
    use notify_broker::BrokerConfig;

    let broker = Broker::with_config(BrokerConfig { pending_capacity: 2, subscriber_queue_floor: 100 });

    // Two blocking requests fill the table (no respond, so they stay pending).
    let broker2 = broker.clone();
    let _t1 = tokio::spawn(async move {
        broker2.notify(blocking("a", true, &["ok"]), CancellationToken::new()).await
    });
    let broker3 = broker.clone();
    let _t2 = tokio::spawn(async move {
        broker3.notify(blocking("b", true, &["ok"]), CancellationToken::new()).await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let third = broker
        .notify(blocking("c", true, &["ok"]), CancellationToken::new())
        .await;
    assert!(matches!(third, Err(BrokerError::ResourceExhausted)));
}

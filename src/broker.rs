//! The broker itself: the three external operations, built on top of
//! [`crate::state::BrokerState`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::state::BrokerState;
use crate::subscription::Subscription;
use crate::types::{NotifyRequest, NotifyResponse, SubscribeRequest};

/// An in-process notification broker.
///
/// Cheap to clone: internally an `Arc<Mutex<...>>`. All three operations
/// below synchronize on the same lock; fan-out and replay use non-blocking
/// sends only, so the lock is never held across an `.await`.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<Mutex<BrokerState>>,
    config: BrokerConfig,
}

impl Broker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BrokerState::new())),
            config,
        }
    }

    /// Submit a notification and wait for a response or cancellation.
    ///
    /// Non-blocking requests (see [`NotifyRequest::is_blocking`]) return
    /// `Ok(NotifyResponse::Empty)` essentially immediately; blocking
    /// requests wait until a matching [`Broker::respond`] call arrives or
    /// `cancel` fires.
    pub async fn notify(
        &self,
        req: NotifyRequest,
        cancel: CancellationToken,
    ) -> Result<NotifyResponse, BrokerError> {
        let active = req.active;
        let blocking = req.is_blocking();

        let (id, mut rx) = {
            let mut state = self.inner.lock();
            state.admit(self.config.pending_capacity)?;
            state.dispatch(req)
        };
        debug!(id, active, blocking, "dispatching notification");

        let outcome = tokio::select! {
            biased;
            result = &mut rx => {
                result.map_err(|_| BrokerError::Aborted(format!("request {id} closed without a value")))
            }
            () = cancel.cancelled() => {
                let mut state = self.inner.lock();
                if state.cancel_pending(id) {
                    Err(BrokerError::Cancelled)
                } else {
                    // Respond already won the race and removed the entry;
                    // its value is sitting in `rx`, already resolved.
                    rx.try_recv().map_err(|_| BrokerError::Cancelled)
                }
            }
        };

        match &outcome {
            Ok(_) => debug!(id, active, blocking, "notification resolved"),
            Err(err) => debug!(id, active, blocking, %err, "notification failed"),
        }
        outcome
    }

    /// Subscribe to fan-out notifications matching `req.active`.
    ///
    /// The returned [`Subscription`] replays every eligible entry still in
    /// the pending table at join time, then streams new envelopes as they
    /// are dispatched.
    #[must_use]
    pub fn subscribe(&self, req: SubscribeRequest, cancel: CancellationToken) -> Subscription {
        let mut state = self.inner.lock();
        let capacity = self.config.subscriber_queue_floor.max(state.pending.len()).max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let id = state.register_subscription(req.active, tx);
        debug!(subscription_id = id, active = req.active, capacity, "subscribed");
        drop(state);

        Subscription::new(id, rx, cancel, Arc::clone(&self.inner))
    }

    /// Supply a responder's reaction to a previously-dispatched request.
    pub fn respond(&self, request_id: u64, response: NotifyResponse) -> Result<(), BrokerError> {
        let mut state = self.inner.lock();
        let result = state.respond(request_id, response);
        if let Err(err) = &result {
            debug!(request_id, %err, "respond rejected");
        }
        result
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

//! Broker-internal state: the subscription registry and pending table,
//! plus the dispatcher that mutates them. Every function here assumes the
//! caller already holds the broker's mutex; nothing in this module locks
//! anything itself.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::BrokerError;
use crate::pending::PendingEntry;
use crate::subscription::SubscriptionEntry;
use crate::types::{NotifyRequest, NotifyResponse, SubscribeResponse};

pub(crate) struct BrokerState {
    pub subscriptions: HashMap<u64, SubscriptionEntry>,
    pub pending: HashMap<u64, PendingEntry>,
    next_subscription_id: u64,
    next_notification_id: u64,
}

impl BrokerState {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            pending: HashMap::new(),
            next_subscription_id: 0,
            next_notification_id: 0,
        }
    }

    /// Admission check: the pending table must have room before a request
    /// allocates an id. Performed under the lock rather than as a separate
    /// lock-free fast path, so a burst of concurrent producers can never
    /// overshoot the capacity.
    pub fn admit(&self, pending_capacity: usize) -> Result<(), BrokerError> {
        if self.pending.len() >= pending_capacity {
            return Err(BrokerError::ResourceExhausted);
        }
        Ok(())
    }

    /// Dispatcher: assign an id, fan out to eligible subscribers (evicting
    /// any whose outbound queue is full), insert the pending entry, and for
    /// non-blocking requests pre-populate the response immediately.
    ///
    /// Caller must have already called [`Self::admit`] under the same lock
    /// acquisition.
    pub fn dispatch(&mut self, req: NotifyRequest) -> (u64, oneshot::Receiver<NotifyResponse>) {
        let id = self.next_notification_id;
        self.next_notification_id += 1;

        let blocking = req.is_blocking();
        let active = req.active;
        let envelope = SubscribeResponse { id, request: req };

        self.subscriptions.retain(|sub_id, entry| {
            if entry.active != active {
                return true;
            }
            match entry.sender.try_send(envelope.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(subscription_id = *sub_id, "evicting slow subscriber");
                    false
                }
            }
        });

        let (tx, rx) = oneshot::channel();
        let mut entry = PendingEntry::new(envelope, tx);
        if !blocking {
            entry.close_with(NotifyResponse::Empty);
        }
        self.pending.insert(id, entry);

        (id, rx)
    }

    /// Register a new subscription, replaying eligible pending entries into
    /// its freshly-created outbound queue. Non-blocking entries are removed
    /// from the pending table as they are replayed (they exist only to
    /// bridge producer and first joiner); blocking entries remain until
    /// responded or cancelled.
    ///
    /// Replay candidates are sorted by request id before sending: the
    /// pending table is a `HashMap` with no iteration-order guarantee, but a
    /// joiner that replays two or more notifications must see them in the
    /// same ascending order live fan-out would have delivered them in.
    pub fn register_subscription(
        &mut self,
        active: bool,
        sender: mpsc::Sender<SubscribeResponse>,
    ) -> u64 {
        let mut replay: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.envelope.request.active == active)
            .map(|(&req_id, _)| req_id)
            .collect();
        replay.sort_unstable();

        let mut consumed = Vec::new();
        for req_id in replay {
            let entry = &self.pending[&req_id];
            let _ = sender.try_send(entry.envelope.clone());
            if !entry.envelope.request.is_blocking() {
                consumed.push(req_id);
            }
        }
        for req_id in consumed {
            self.pending.remove(&req_id);
        }

        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.subscriptions.insert(id, SubscriptionEntry { active, sender });
        id
    }

    /// Validate and deliver a responder's payload, removing the pending
    /// entry regardless of whether it was already closed by a racing
    /// producer cancellation.
    pub fn respond(&mut self, request_id: u64, response: NotifyResponse) -> Result<(), BrokerError> {
        let entry = self
            .pending
            .get_mut(&request_id)
            .ok_or(BrokerError::DeadlineExceeded(request_id))?;

        validate(&entry.envelope.request.actions, &response)?;
        entry.close_with(response);
        self.pending.remove(&request_id);
        Ok(())
    }

    /// Remove a pending entry if the producer's own cancellation fires
    /// first. Returns `true` if this call removed it (the producer lost
    /// the race to `respond`), `false` if it was already gone.
    pub fn cancel_pending(&mut self, request_id: u64) -> bool {
        self.pending.remove(&request_id).is_some()
    }
}

fn validate(allowed_actions: &[String], response: &NotifyResponse) -> Result<(), BrokerError> {
    match response {
        NotifyResponse::Empty => Ok(()),
        NotifyResponse::Command(cmd) => {
            if cmd.cmd.is_empty() {
                Err(BrokerError::InvalidArgument("command with empty cmd".to_string()))
            } else {
                Ok(())
            }
        }
        NotifyResponse::Action(action) => {
            if action.is_empty() {
                // Equivalent to an empty response: user cancellation is
                // always allowed.
                Ok(())
            } else if allowed_actions.iter().any(|a| a == action) {
                Ok(())
            } else {
                Err(BrokerError::InvalidArgument(format!(
                    "action {action:?} not in original request's action list"
                )))
            }
        }
    }
}

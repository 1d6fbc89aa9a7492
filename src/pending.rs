//! Pending-table entries: in-flight blocking notifications awaiting a
//! response, keyed by request id in [`crate::state::BrokerState`].

use tokio::sync::oneshot;

use crate::types::{NotifyResponse, SubscribeResponse};

/// A single in-flight notification.
///
/// The response channel is a single-slot handoff: at most one value is
/// ever sent on it, and it is closed exactly once. Modeling the "closed"
/// flag as `Option::take` on the sender gives us that invariant for free —
/// once taken, every subsequent attempt to close observes `None` and is a
/// no-op.
pub(crate) struct PendingEntry {
    pub envelope: SubscribeResponse,
    responder: Option<oneshot::Sender<NotifyResponse>>,
}

impl PendingEntry {
    pub fn new(envelope: SubscribeResponse, responder: oneshot::Sender<NotifyResponse>) -> Self {
        Self {
            envelope,
            responder: Some(responder),
        }
    }

    /// Send `response` and close the entry, unless it was already closed.
    ///
    /// Returns `true` if this call performed the close (i.e. this was the
    /// first and only close), `false` if the entry was already closed by
    /// a previous call.
    pub fn close_with(&mut self, response: NotifyResponse) -> bool {
        match self.responder.take() {
            Some(tx) => {
                // The receiver may already be gone (producer cancelled
                // concurrently and dropped its half); that's fine, the
                // send is still the one-and-only close of this entry.
                let _ = tx.send(response);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.responder.is_none()
    }
}

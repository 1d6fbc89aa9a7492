//! Subscriber-side registry entries and the public handle returned by
//! [`crate::Broker::subscribe`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::BrokerError;
use crate::state::BrokerState;
use crate::types::SubscribeResponse;

/// Registry-side record: everything the dispatcher needs to fan a message
/// out to one subscriber.
pub(crate) struct SubscriptionEntry {
    pub active: bool,
    pub sender: mpsc::Sender<SubscribeResponse>,
}

/// A live subscription. Streams fan-out envelopes to the holder until it
/// cancels, is evicted, or drops this handle.
///
/// Dropping a `Subscription` unsubscribes it: the registry entry is removed
/// under the broker mutex if still present.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<SubscribeResponse>,
    cancel: CancellationToken,
    state: Arc<Mutex<BrokerState>>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        receiver: mpsc::Receiver<SubscribeResponse>,
        cancel: CancellationToken,
        state: Arc<Mutex<BrokerState>>,
    ) -> Self {
        Self { id, receiver, cancel, state }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next fan-out envelope.
    ///
    /// Returns `Ok(Some(envelope))` on a delivered message, `Ok(None)` when
    /// the subscriber's own cancellation fired (a clean exit), and
    /// `Err(BrokerError::Aborted)` if the outbound queue was observed
    /// closed — which only happens after this subscription was evicted for
    /// falling behind.
    pub async fn recv(&mut self) -> Result<Option<SubscribeResponse>, BrokerError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Ok(None),
            msg = self.receiver.recv() => {
                msg.map(Some).ok_or_else(|| {
                    BrokerError::Aborted(format!("subscription {} evicted", self.id))
                })
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.subscriptions.remove(&self.id).is_some() {
            debug!(subscription_id = self.id, "unsubscribed");
        }
    }
}

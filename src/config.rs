//! Broker configuration.

/// Tunables overridable at construction.
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    /// Maximum number of in-flight pending notifications.
    pub pending_capacity: usize,
    /// Floor for a newly-joined subscriber's outbound queue capacity; the
    /// actual capacity is `max(subscriber_queue_floor, pending table size)`
    /// at join time, so an initial replay burst can never itself evict the
    /// subscriber that triggered it.
    pub subscriber_queue_floor: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            pending_capacity: 120,
            subscriber_queue_floor: 100,
        }
    }
}

//! Error taxonomy for the broker boundary.
//!
//! The broker never retries internally and never panics on any of these
//! conditions; every failure mode a caller can hit is represented here.

#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// The pending table is at or above capacity; the request never got an id.
    #[error("pending table at capacity")]
    ResourceExhausted,

    /// The producer observed its pending entry close without a value, or a
    /// subscriber's outbound queue closed while it was still forwarding.
    #[error("aborted: {0}")]
    Aborted(String),

    /// `Respond` referenced an id that is unknown or already resolved. The
    /// two cases are indistinguishable and both benign, so they share a
    /// category deliberately.
    #[error("no pending notification for request {0}")]
    DeadlineExceeded(u64),

    /// `Respond`'s payload did not match what the original request allows:
    /// an action outside its list, or a command with an empty `cmd`.
    #[error("invalid response: {0}")]
    InvalidArgument(String),

    /// A subscriber's transport failed to accept a forwarded message.
    #[error("internal: {0}")]
    Internal(String),

    /// The caller's own cancellation fired before a response arrived.
    #[error("cancelled")]
    Cancelled,
}

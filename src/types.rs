//! Wire-independent data model for the notification broker.
//!
//! These types are the payloads producers, subscribers and responders
//! exchange with the broker. Encoding them onto any particular transport
//! is explicitly someone else's problem.

/// Severity tag attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A resource the producer wants the subscriber to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAction {
    pub target: String,
}

/// A resource the producer wants the subscriber to render inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewAction {
    pub target: String,
}

/// A structured command the user selected instead of a plain action label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub cmd: String,
    pub args: Vec<String>,
}

/// A request from a producer to surface a message to eligible subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub message: String,
    pub level: Severity,
    /// Targets only currently-focused subscribers when true.
    pub active: bool,
    pub actions: Vec<String>,
    pub open: Option<OpenAction>,
    pub preview: Option<PreviewAction>,
}

impl NotifyRequest {
    /// A request is blocking iff it requires a user response: a non-empty
    /// action list, or an `open`/`preview` side effect.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.actions.is_empty() || self.open.is_some() || self.preview.is_some()
    }
}

/// The producer-visible outcome of a `Notify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyResponse {
    /// Non-blocking ack, or a user cancellation of a blocking request.
    Empty,
    /// One of the action labels from the original request.
    Action(String),
    /// A command descriptor with a non-empty `cmd`.
    Command(CommandDescriptor),
}

/// A subscriber's declared interest class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub active: bool,
}

/// The envelope delivered to subscribers: a broker-assigned id paired with
/// the original request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeResponse {
    pub id: u64,
    pub request: NotifyRequest,
}

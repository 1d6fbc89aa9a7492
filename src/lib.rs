//! In-process notification broker.
//!
//! Producers submit notifications through [`Broker::notify`]; the broker
//! fans each one out to every eligible subscriber registered through
//! [`Broker::subscribe`], and, for requests that require a user reaction,
//! blocks the producer until a matching [`Broker::respond`] call arrives or
//! the producer's own [`tokio_util::sync::CancellationToken`] fires.
//!
//! One mutex guards a subscription registry and a pending-response table,
//! fan-out and replay are non-blocking, and a slow subscriber is evicted
//! rather than allowed to stall a producer.

mod broker;
mod config;
mod error;
mod pending;
mod state;
mod subscription;
mod types;

pub use broker::Broker;
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use subscription::Subscription;
pub use types::{
    CommandDescriptor, NotifyRequest, NotifyResponse, OpenAction, PreviewAction, Severity,
    SubscribeRequest, SubscribeResponse,
};

//! Message-stream gateway over a streaming broker.
//!
//! Manages named streams (creation with bounded retries, a registry of their
//! last known state), publishes encoded messages with one-shot recovery of a
//! missing stream, and exposes each subscription as a cancellable,
//! backpressured [`futures::Stream`].

pub mod backends;
pub mod broker;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod publisher;
pub mod registry;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use backends::{MemoryBroker, RedisStreamBroker};
pub use broker::{ConsumerConnection, Delivery, DeliveryHandler, OffsetSpec, StreamBroker};
pub use codec::{JsonCodec, MessageCodec};
pub use config::{BrokerEndpoint, ConfigError, GatewayConfig};
pub use error::{BrokerError, CodecError, GatewayError, GatewayResult};
pub use gateway::StreamGateway;
pub use lifecycle::{EnsureOutcome, InitReport, StreamLifecycle, StreamOutcome};
pub use registry::{StreamRegistry, StreamState};
pub use subscription::MessageStream;

pub use tokio_util::sync::CancellationToken;

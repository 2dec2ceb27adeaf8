//! Broker capability the gateway is written against.
//!
//! A backend provides stream creation and sending on a long-lived producer
//! connection, plus dedicated consumer connections that push each inbound
//! message to a [`DeliveryHandler`].

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::BrokerError;

/// Where a new subscription starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetSpec {
    /// The earliest message still retained by the broker.
    #[default]
    First,
}

/// Returned by a handler to tell the connection whether to keep delivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Continue,
    Stop,
}

/// Receives raw message bytes from a consumer connection, one at a time and
/// in broker order. The connection awaits each call before delivering the
/// next message, so a slow handler slows the reader down.
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    async fn deliver(&self, data: Bytes) -> Delivery;
}

/// Stream management and sending on the shared producer connection.
#[async_trait]
pub trait StreamBroker: Send + Sync + 'static {
    /// Create a stream. `AlreadyExists` is reported as an error value so the
    /// caller can tell a no-op from a creation.
    async fn create_stream(&self, name: &str) -> Result<(), BrokerError>;

    /// Append one message to a stream.
    async fn send(&self, stream: &str, data: Bytes) -> Result<(), BrokerError>;

    /// Open a new consumer connection, never shared with anyone else.
    async fn connect_consumer(&self) -> Result<Box<dyn ConsumerConnection>, BrokerError>;
}

/// A dedicated consumer session.
#[async_trait]
pub trait ConsumerConnection: Send + Sync {
    async fn subscribe(
        &mut self,
        stream: &str,
        offset: OffsetSpec,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), BrokerError>;

    /// Stop delivery and release the session.
    async fn close(&mut self) -> Result<(), BrokerError>;
}

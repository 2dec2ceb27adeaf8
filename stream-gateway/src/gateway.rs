//! Process-wide gateway handle tying the lifecycle, publish and consume paths
//! to one broker and one registry.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::broker::StreamBroker;
use crate::codec::MessageCodec;
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::lifecycle::{EnsureOutcome, InitReport, StreamLifecycle};
use crate::publisher::Publisher;
use crate::registry::StreamRegistry;
use crate::subscription::{MessageStream, Subscriber};

/// Built once at startup and shared as `Arc<StreamGateway<_>>`.
pub struct StreamGateway<C: MessageCodec> {
    config: GatewayConfig,
    registry: StreamRegistry,
    lifecycle: StreamLifecycle,
    publisher: Publisher<C>,
    subscriber: Subscriber<C>,
}

impl<C: MessageCodec> StreamGateway<C> {
    pub fn new(broker: Arc<dyn StreamBroker>, codec: C, config: GatewayConfig) -> Self {
        let codec = Arc::new(codec);
        let registry = StreamRegistry::new();
        let lifecycle = StreamLifecycle::new(broker.clone(), registry.clone(), config.retry_delay);

        Self {
            publisher: Publisher::new(
                broker.clone(),
                codec.clone(),
                lifecycle.clone(),
                config.recovery_max_attempts,
            ),
            subscriber: Subscriber::new(broker, codec, config.queue_capacity),
            registry,
            lifecycle,
            config,
        }
    }

    /// Ensure each named stream with the initialization attempt budget.
    pub async fn init_streams<I, S>(&self, names: I) -> InitReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lifecycle
            .init_streams(names, self.config.init_max_attempts)
            .await
    }

    /// Initialize the streams listed in the configuration.
    pub async fn init_configured_streams(&self) -> InitReport {
        self.init_streams(&self.config.streams).await
    }

    pub async fn ensure_stream(&self, name: &str, max_attempts: u32) -> GatewayResult<EnsureOutcome> {
        self.lifecycle.ensure_stream(name, max_attempts).await
    }

    pub async fn publish(&self, stream: &str, message: &C::Message) -> GatewayResult<()> {
        self.publisher.publish(stream, message).await
    }

    pub async fn consume(
        &self,
        stream: &str,
        cancel: CancellationToken,
    ) -> GatewayResult<MessageStream<C::Message>> {
        self.subscriber.consume(stream, cancel).await
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

//! Publish path: encode, send on the shared producer, recover a missing
//! stream once.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::broker::StreamBroker;
use crate::codec::MessageCodec;
use crate::error::{BrokerError, GatewayError, GatewayResult};
use crate::lifecycle::StreamLifecycle;

pub struct Publisher<C: MessageCodec> {
    broker: Arc<dyn StreamBroker>,
    codec: Arc<C>,
    lifecycle: StreamLifecycle,
    recovery_max_attempts: u32,
}

impl<C: MessageCodec> Publisher<C> {
    pub fn new(
        broker: Arc<dyn StreamBroker>,
        codec: Arc<C>,
        lifecycle: StreamLifecycle,
        recovery_max_attempts: u32,
    ) -> Self {
        Self {
            broker,
            codec,
            lifecycle,
            recovery_max_attempts,
        }
    }

    /// Send one message to `stream`.
    ///
    /// When the broker reports the stream missing, it is recreated once and
    /// the same bytes are sent again. A failed recreation, or a stream still
    /// missing after it, is returned to the caller; nothing is buffered.
    pub async fn publish(&self, stream: &str, message: &C::Message) -> GatewayResult<()> {
        let data = self.codec.encode(message).map_err(|source| {
            error!(stream = %stream, error = %source, "Failed to encode message");
            GatewayError::Encode {
                stream: stream.to_string(),
                source,
            }
        })?;

        match self.broker.send(stream, data.clone()).await {
            Ok(()) => {
                debug!(stream = %stream, bytes = data.len(), "Message published");
                return Ok(());
            }
            Err(BrokerError::StreamDoesNotExist) => {
                warn!(stream = %stream, "Stream does not exist, recreating it");
            }
            Err(source) => return Err(send_error(stream, source)),
        }

        if let Err(e) = self
            .lifecycle
            .ensure_stream(stream, self.recovery_max_attempts)
            .await
        {
            error!(stream = %stream, error = %e, "Stream recovery failed, message not sent");
            return Err(GatewayError::StreamUnavailable {
                stream: stream.to_string(),
                source: Box::new(e),
            });
        }

        match self.broker.send(stream, data).await {
            Ok(()) => {
                info!(stream = %stream, "Message published after stream recovery");
                Ok(())
            }
            Err(BrokerError::StreamDoesNotExist) => {
                error!(stream = %stream, "Stream still missing after recovery");
                Err(GatewayError::StreamDoesNotExist {
                    stream: stream.to_string(),
                })
            }
            Err(source) => Err(send_error(stream, source)),
        }
    }
}

fn send_error(stream: &str, source: BrokerError) -> GatewayError {
    error!(stream = %stream, error = %source, "Failed to send message");
    GatewayError::Broker {
        stream: stream.to_string(),
        operation: "send",
        source,
    }
}

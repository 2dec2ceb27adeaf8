//! Error types for the stream gateway

use thiserror::Error;

/// Outcomes reported by a broker client for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("stream already exists")]
    AlreadyExists,

    #[error("stream does not exist")]
    StreamDoesNotExist,

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, BrokerError::ConnectionRefused(_))
    }
}

/// Serialization failures of the message codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),
}

/// Errors surfaced to gateway callers. Every variant names the stream it
/// concerns so callers can decide what to do next.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("broker refused connection for stream '{stream}' after {attempts} attempts")]
    ConnectionRefused { stream: String, attempts: u32 },

    #[error("stream '{stream}' is missing and could not be recreated: {source}")]
    StreamUnavailable {
        stream: String,
        #[source]
        source: Box<GatewayError>,
    },

    #[error("stream '{stream}' does not exist")]
    StreamDoesNotExist { stream: String },

    #[error("failed to encode message for stream '{stream}': {source}")]
    Encode {
        stream: String,
        #[source]
        source: CodecError,
    },

    #[error("broker {operation} failed for stream '{stream}': {source}")]
    Broker {
        stream: String,
        operation: &'static str,
        #[source]
        source: BrokerError,
    },

    #[error("failed to subscribe to stream '{stream}': {source}")]
    Subscribe {
        stream: String,
        #[source]
        source: BrokerError,
    },
}

impl GatewayError {
    pub fn stream(&self) -> &str {
        match self {
            GatewayError::ConnectionRefused { stream, .. }
            | GatewayError::StreamUnavailable { stream, .. }
            | GatewayError::StreamDoesNotExist { stream }
            | GatewayError::Encode { stream, .. }
            | GatewayError::Broker { stream, .. }
            | GatewayError::Subscribe { stream, .. } => stream,
        }
    }

    /// Whether the broker was unreachable, as opposed to a logic or payload error.
    pub fn is_unavailable(&self) -> bool {
        match self {
            GatewayError::ConnectionRefused { .. } | GatewayError::StreamUnavailable { .. } => true,
            GatewayError::Broker { source, .. } | GatewayError::Subscribe { source, .. } => {
                source.is_connection_refused()
            }
            _ => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

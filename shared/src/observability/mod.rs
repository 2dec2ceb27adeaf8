//! Observability setup shared by all services

pub mod logging;

pub use logging::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Logging configuration error: {0}")]
    Config(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

//! Shared utilities for the chat and user services: logging setup, business
//! errors and localization.

// Re-export common dependencies
pub use serde_json;
pub use tracing;
pub use uuid;

pub mod error;
pub mod localization;
pub mod observability;

pub use error::{BusinessError, BusinessResult};
pub use localization::{
    current_locale, errors, success, with_locale, ErrorCode, Localizer, SuccessCode,
    SuccessResponse,
};
pub use observability::{init_logging, LogConfig, LogFormat, LogLevel};

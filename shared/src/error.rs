//! Business errors: a localizable code plus message arguments.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::localization::messages::errors::UNEXPECTED_ERROR;
use crate::localization::{ErrorCode, Localizer};

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code}")]
pub struct BusinessError {
    pub code: ErrorCode,
    pub args: Vec<(&'static str, String)>,
}

pub type BusinessResult<T> = Result<T, BusinessError>;

impl BusinessError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, name: &'static str, value: impl ToString) -> Self {
        self.args.push((name, value.to_string()));
        self
    }

    /// Log `err` under a fresh error id and return `UNEXPECTED_ERROR`
    /// carrying that id, so users can quote it without seeing internals.
    pub fn unexpected(context: &str, err: impl fmt::Display) -> Self {
        Self::with_error_id(UNEXPECTED_ERROR, context, err)
    }

    /// Like [`BusinessError::unexpected`] with a different code.
    pub fn with_error_id(code: ErrorCode, context: &str, err: impl fmt::Display) -> Self {
        let error_id = Uuid::new_v4();
        error!(error_id = %error_id, code = %code, context, error = %err, "Unexpected error");
        Self::new(code).with_arg("error_id", error_id)
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code.code == code.code
    }

    pub fn status(&self) -> u16 {
        self.code.status
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn error_id(&self) -> Option<&str> {
        self.arg("error_id")
    }

    /// Message in the current request locale.
    pub fn localized_message(&self, localizer: &Localizer) -> String {
        let args: Vec<(&str, &str)> = self.args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        localizer.get_message(self.code.message_key, &args)
    }

    /// `{ "success": false, "code": ..., "error": ... }`
    pub fn to_body(&self, localizer: &Localizer) -> Value {
        json!({
            "success": false,
            "code": self.code.code,
            "error": self.localized_message(localizer),
        })
    }
}

impl From<ErrorCode> for BusinessError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

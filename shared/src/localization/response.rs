//! Localized success payloads.

use serde_json::{json, Value};

use super::localizer::Localizer;
use super::messages::SuccessCode;

#[derive(Debug, Clone)]
pub struct SuccessResponse {
    pub code: SuccessCode,
    pub args: Vec<(&'static str, String)>,
    pub data: Option<Value>,
}

impl SuccessResponse {
    pub fn new(code: SuccessCode) -> Self {
        Self {
            code,
            args: Vec::new(),
            data: None,
        }
    }

    pub fn with_arg(mut self, name: &'static str, value: impl ToString) -> Self {
        self.args.push((name, value.to_string()));
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status(&self) -> u16 {
        self.code.status
    }

    /// `{ "success": true, "message": ... }` in the current locale, plus
    /// `data` when set.
    pub fn to_body(&self, localizer: &Localizer) -> Value {
        let args: Vec<(&str, &str)> = self.args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let mut body = json!({
            "success": true,
            "message": localizer.get_message(self.code.message_key, &args),
        });
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }
}

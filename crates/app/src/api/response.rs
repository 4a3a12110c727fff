//! Response envelope: `{ack: true, message?}` or
//! `{ack: false, error_type, message}`.

use serde_json::{Map, Value};

use gadgethub_domain::error::HubError;

/// Outcome of a command, as sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    ack: bool,
    error_type: Option<String>,
    message: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            ack: true,
            error_type: None,
            message: None,
        }
    }

    #[must_use]
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            message: Some(normalize(message.into())),
            ..Self::ok()
        }
    }

    #[must_use]
    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ack: false,
            error_type: Some(error_type.into()),
            message: Some(normalize(message.into())),
        }
    }

    /// Envelope for a failed operation.
    #[must_use]
    pub fn from_error(err: &HubError) -> Self {
        Self::error(err.error_type(), err.to_string())
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        let mut body = Map::new();
        body.insert("ack".to_string(), Value::Bool(self.ack));
        if let Some(error_type) = self.error_type {
            body.insert("error_type".to_string(), Value::String(error_type));
        }
        if let Some(message) = self.message {
            body.insert("message".to_string(), Value::String(message));
        }
        Value::Object(body)
    }
}

/// Messages travel inside JSON strings on clients that do little escaping.
fn normalize(message: String) -> String {
    if message.contains('"') {
        message.replace('"', "'")
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgethub_domain::error::ApplyError;
    use serde_json::json;

    #[test]
    fn should_render_bare_ack() {
        assert_eq!(ApiResponse::ok().into_value(), json!({"ack": true}));
    }

    #[test]
    fn should_render_error_envelope() {
        let err: HubError = ApplyError {
            message: "Cannot apply source 'X' to gadget 'tv1'".to_string(),
        }
        .into();

        assert_eq!(
            ApiResponse::from_error(&err).into_value(),
            json!({
                "ack": false,
                "error_type": "GadgetUpdateApplyError",
                "message": "Cannot apply source 'X' to gadget 'tv1'",
            })
        );
    }

    #[test]
    fn should_replace_double_quotes_in_messages() {
        let response = ApiResponse::error("ValidationError", r#"unknown field "dimmer""#);
        assert_eq!(
            response.into_value()["message"],
            "unknown field 'dimmer'"
        );
        assert_eq!(
            ApiResponse::ok_with(r#"said "hi""#).into_value()["message"],
            "said 'hi'"
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the gateway said about one send attempt.
///
/// Transport errors and malformed replies are folded into an unsuccessful
/// result instead of an error, so a send never raises past the provider client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub message: Option<String>,
    pub error_code: Option<i64>,
    pub request_id: Option<u64>,
    pub valid: Option<u64>,
    pub invalid: Option<u64>,
    pub duplicates: Option<u64>,
    pub details: Value,
}

impl DeliveryResult {
    /// Reads a `2xx` gateway body such as
    /// `{"successful":true,"request_id":42,"code":100,"message":"Message Submitted Successfully","valid":1,"invalid":0,"duplicates":0}`.
    pub fn from_api_response(body: Value) -> Self {
        let Some(fields) = body.as_object() else {
            return Self::failure(format!("Unexpected response from SMS provider: {}", body));
        };
        Self {
            success: fields.get("successful").and_then(Value::as_bool) == Some(true),
            message: string_field(fields, "message"),
            error_code: int_field(fields, "code"),
            request_id: uint_field(fields, "request_id"),
            valid: uint_field(fields, "valid"),
            invalid: uint_field(fields, "invalid"),
            duplicates: uint_field(fields, "duplicates"),
            details: body,
        }
    }

    /// Reads a non-success HTTP reply, keeping whatever the body explains.
    pub fn from_error_body(status: u16, reason: &str, body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => Self {
                success: false,
                message: Some(string_field(&fields, "message").unwrap_or_else(|| "SMS failed".to_string())),
                error_code: int_field(&fields, "code"),
                details: Value::Object(fields),
                ..Self::default()
            },
            _ => Self {
                success: false,
                message: Some(format!("SMS failed: {} - {}", status, reason)),
                details: serde_json::json!({ "raw_error": body }),
                ..Self::default()
            },
        }
    }

    pub fn empty_response() -> Self {
        Self::failure("Empty response from SMS provider")
    }

    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::failure(format!("SMS service unavailable: {}", reason))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The provider's own message, or a generic one when it gave none.
    pub fn provider_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("SMS failed")
    }

    /// Human readable failure reason with the gateway code, never empty.
    pub fn failure_reason(&self) -> String {
        let message = self.provider_message();
        match self.error_code {
            Some(code) => format!("{} (Error Code: {})", message, code),
            None => message.to_string(),
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn uint_field(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Error-message derivation for non-2xx responses.
//!
//! The backend reports failures in several shapes (validation maps, `detail`
//! documents, bare strings). The derivation walks a fixed decision tree over
//! the decoded JSON and only inspects the field names listed below:
//!
//! 1. `non_field_errors` array: its first string element;
//! 2. `detail` string;
//! 3. `message` string;
//! 4. first field holding a non-empty array starting with a string:
//!    `"{field}: {first}"`;
//! 5. first field holding a string: `"{field}: {value}"`;
//! 6. a bare JSON string payload, verbatim;
//! 7. `"HTTP {status}"`.

use serde_json::{Map, Value};

/// Fixed message for a rejected credential during key validation.
pub const MESSAGE_INVALID_CREDENTIAL: &str = "invalid credential";
/// Fixed message for an exhausted quota during key validation.
pub const MESSAGE_QUOTA_EXCEEDED: &str = "quota exceeded";

const NON_FIELD_ERRORS: &str = "non_field_errors";
const DETAIL: &str = "detail";
const MESSAGE: &str = "message";

/// Derive the user-facing message for a failed response.
///
/// `payload` is `None` when the body was empty or not JSON.
#[must_use]
pub fn error_message(status: u16, payload: Option<&Value>) -> String {
    let derived = match payload {
        Some(Value::Object(fields)) => from_object(fields),
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    };
    derived.unwrap_or_else(|| format!("HTTP {status}"))
}

/// Message for a failed key-validation probe: 401 and 429 map to fixed
/// messages, everything else follows [`error_message`].
#[must_use]
pub fn key_validation_message(status: u16, payload: Option<&Value>) -> String {
    match status {
        401 => MESSAGE_INVALID_CREDENTIAL.to_string(),
        429 => MESSAGE_QUOTA_EXCEEDED.to_string(),
        _ => error_message(status, payload),
    }
}

fn from_object(fields: &Map<String, Value>) -> Option<String> {
    if let Some(Value::Array(errors)) = fields.get(NON_FIELD_ERRORS)
        && let Some(first) = errors.first().and_then(Value::as_str)
    {
        return Some(first.to_string());
    }
    if let Some(detail) = fields.get(DETAIL).and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    if let Some(message) = fields.get(MESSAGE).and_then(Value::as_str) {
        return Some(message.to_string());
    }

    let first_listed = fields.iter().find_map(|(field, value)| {
        value
            .as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_str)
            .map(|first| format!("{field}: {first}"))
    });
    if first_listed.is_some() {
        return first_listed;
    }

    fields.iter().find_map(|(field, value)| {
        value
            .as_str()
            .map(|text| format!("{field}: {text}"))
    })
}

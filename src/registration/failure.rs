//! Failure adapters and the error normalizer.
//!
//! Whatever the account service sends back on failure is classified once,
//! at the network boundary, into [`ServiceFailure`]. The user-facing text
//! is then a plain match over that union.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ServiceError;

pub const DUPLICATE_ACCOUNT_MESSAGE: &str =
    "An account with this email or phone number already exists. Please log in instead.";
pub const ALREADY_REGISTERED_MESSAGE: &str =
    "This information is already registered. Please use different details.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to create account. Please try again.";

/// Keys that carry a top-level message rather than a field error.
const MESSAGE_KEYS: [&str; 3] = ["message", "error", "detail"];

/// Keys that never name a form field.
const META_KEYS: [&str; 13] = [
    "success", "message", "error", "detail", "status", "code", "errors", "status_code",
    "timestamp", "path", "data", "tokens", "user",
];

const IDENTITY_FIELDS: [&str; 4] = ["email", "phone", "phone_number", "username"];

/// Every failure shape the account service is known to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// The email/phone/username is already tied to an account.
    DuplicateIdentity,
    /// Some other uniqueness constraint was hit.
    DuplicateConstraint,
    /// A `field: message` style string, shown as-is.
    Message(String),
    /// Field name → messages.
    FieldErrors(BTreeMap<String, Vec<String>>),
    /// The request never completed.
    Transport(String),
    /// Nothing recognizable; carries the raw message when there was one.
    Unrecognized(Option<String>),
}

impl ServiceFailure {
    /// Classify a JSON failure body. First match wins:
    /// duplicate identity, other duplicate, colon message, field map,
    /// anything else.
    pub fn from_body(body: &Value) -> Self {
        let messages = top_level_messages(body);
        let fields = field_map(body);

        let identity_hit = messages.iter().any(|m| is_identity_duplicate(m))
            || fields.as_ref().is_some_and(|map| {
                map.iter().any(|(field, msgs)| {
                    msgs.iter().any(|m| {
                        is_identity_duplicate(m)
                            || (IDENTITY_FIELDS.contains(&field.as_str()) && is_duplicate(m))
                    })
                })
            });
        if identity_hit {
            return Self::DuplicateIdentity;
        }

        let duplicate_hit = messages.iter().any(|m| is_duplicate(m))
            || fields
                .as_ref()
                .is_some_and(|map| map.values().flatten().any(|m| is_duplicate(m)));
        if duplicate_hit {
            return Self::DuplicateConstraint;
        }

        if let Some(message) = messages.iter().find(|m| m.contains(':')) {
            return Self::Message(message.clone());
        }

        if let Some(map) = fields {
            return Self::FieldErrors(map);
        }

        Self::Unrecognized(messages.into_iter().next())
    }

    /// Classify a raw response body that may not be JSON.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(body) => Self::from_body(&body),
            Err(_) => {
                let trimmed = text.trim();
                // HTML error pages are never shown to users.
                if trimmed.is_empty() || trimmed.starts_with('<') {
                    Self::Unrecognized(None)
                } else {
                    Self::Unrecognized(Some(trimmed.to_string()))
                }
            }
        }
    }
}

impl From<&ServiceError> for ServiceFailure {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Transport(reason) => Self::Transport(reason.clone()),
            ServiceError::InvalidBody { .. } => Self::Unrecognized(None),
        }
    }
}

/// Reduce a failure to the one message shown to the user. Never empty.
pub fn normalize(failure: &ServiceFailure) -> String {
    let text = match failure {
        ServiceFailure::DuplicateIdentity => DUPLICATE_ACCOUNT_MESSAGE.to_string(),
        ServiceFailure::DuplicateConstraint => ALREADY_REGISTERED_MESSAGE.to_string(),
        ServiceFailure::Message(message) => message.clone(),
        ServiceFailure::FieldErrors(map) => map
            .iter()
            .filter(|(_, msgs)| !msgs.is_empty())
            .map(|(_, msgs)| msgs.join(", "))
            .collect::<Vec<_>>()
            .join("; "),
        ServiceFailure::Transport(reason) => reason.trim().to_string(),
        ServiceFailure::Unrecognized(raw) => raw.as_deref().unwrap_or_default().trim().to_string(),
    };
    if text.is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        text
    }
}

// ── Shape probes ────────────────────────────────────────────────────

/// Non-empty `message` / `error` / `detail` strings, in that order.
fn top_level_messages(body: &Value) -> Vec<String> {
    let mut out = Vec::new();
    match body {
        Value::String(s) => out.push(s.clone()),
        Value::Object(obj) => {
            for key in MESSAGE_KEYS {
                match obj.get(key) {
                    Some(Value::String(s)) => out.push(s.clone()),
                    Some(Value::Object(nested)) => {
                        if let Some(Value::String(s)) = nested.get("message") {
                            out.push(s.clone());
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    out.retain(|m| !m.trim().is_empty());
    out
}

/// Find a field → messages map in the body.
///
/// Looked for under `errors`, then an object-valued `error` / `detail`.
/// The body itself is read as a field map only when it carries no
/// top-level message. Meta keys never count as fields.
fn field_map(body: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    let obj = body.as_object()?;
    ["errors", "error", "detail"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(as_field_map)
        .or_else(|| {
            if top_level_messages(body).is_empty() {
                as_field_map(body)
            } else {
                None
            }
        })
}

fn as_field_map(value: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    let obj = value.as_object()?;
    let mut map = BTreeMap::new();
    for (field, messages) in obj {
        if META_KEYS.contains(&field.as_str()) {
            continue;
        }
        let list = match messages {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };
        map.insert(field.clone(), list);
    }
    if map.is_empty() { None } else { Some(map) }
}

fn is_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["already exists", "already registered", "duplicate key", "unique constraint", "must be unique"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn is_identity_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    let names_identity = ["email", "phone", "username", "user with this"]
        .iter()
        .any(|word| lower.contains(word));
    let says_taken = ["already exists", "already registered", "unique constraint"]
        .iter()
        .any(|marker| lower.contains(marker));
    names_identity && says_taken
}

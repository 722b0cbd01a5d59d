use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::auth::StoreError;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Broad classification of a failure, used by callers to decide how to react
/// (e.g. route to the login screen on `SessionExpired`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network failure, timeout or unreadable response.
    Transport,
    /// Refresh was impossible or failed; the session has been torn down.
    SessionExpired,
    /// Non-2xx response unrelated to session renewal.
    Resource,
    /// The credential store could not be read or written.
    Storage,
    /// A successful response did not have the expected shape.
    Decode,
}

/// The single error shape surfaced by the client core.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub kind: ErrorKind,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
            kind,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Build an error from a non-2xx response. The body is kept as JSON when
    /// it parses, otherwise as a (truncated) string.
    pub fn from_status(status: u16, body: &str) -> Self {
        let data = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| Value::String(truncate_body(body)));
        let message = match status {
            401 => "Unauthorized".to_string(),
            403 => "Access denied".to_string(),
            404 => "Resource not found".to_string(),
            429 => "Rate limited".to_string(),
            500..=599 => "Server error".to_string(),
            _ => format!("Request failed with status {}", status),
        };
        Self::new(ErrorKind::Resource, message)
            .with_status(status)
            .with_data(data)
    }

    pub fn transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else {
            format!("Network error: {}", err)
        };
        Self::new(ErrorKind::Transport, message).with_data(Value::String(err.to_string()))
    }

    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Decode, format!("Invalid response: {}", context))
            .with_data(Value::String(err.to_string()))
    }

    /// Session renewal failed; `cause` is the error that ended it.
    pub fn session_expired(cause: &ApiError) -> Self {
        Self::new(ErrorKind::SessionExpired, "Session expired")
            .with_status(401)
            .with_data(serde_json::to_value(cause).unwrap_or(Value::Null))
    }

    pub fn no_refresh_token() -> Self {
        Self::new(ErrorKind::SessionExpired, "No refresh token found").with_status(401)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::SessionExpired
    }

    /// Re-label an error with an operation's message. Session expiry keeps
    /// its own message so the caller can tell it apart.
    pub fn in_operation(self, message: impl Into<String>) -> Self {
        if self.is_session_expired() {
            return self;
        }
        Self {
            message: message.into(),
            ..self
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::new(ErrorKind::Storage, format!("Credential store error: {}", err))
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

use reqwest::StatusCode;
use serde::Serialize;

/// Which part of the error taxonomy an [`ApiError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport failure; nothing was applied.
    Transport,
    /// Session missing, expired, or lacking the required role.
    Unauthorized,
    /// Rejected client-side before any request was sent.
    Validation,
    /// The server refused the operation (e.g. "already suspended").
    Rejected,
    /// The response did not match the expected schema.
    Decode,
    /// The same submission is still in flight; nothing was sent.
    Busy,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error returned by every REST call and client-side validation.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: Option<StatusCode>,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
    /// Whether `message` came from the server body rather than a local default.
    server_message: bool,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: None,
            message: message.into(),
            details: None,
            server_message: false,
        }
    }

    pub fn unauthorized(status: StatusCode, message: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            status: Some(status),
            server_message: message.is_some(),
            message: message.unwrap_or_else(|| "Not authenticated".to_string()),
            details: None,
        }
    }

    pub fn rejected(status: Option<StatusCode>, message: Option<String>) -> Self {
        let fallback = match status {
            Some(status) => format!("Request failed with status {status}"),
            None => "Request was not successful".to_string(),
        };
        Self {
            kind: ErrorKind::Rejected,
            status,
            server_message: message.is_some(),
            message: message.unwrap_or(fallback),
            details: None,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            status: None,
            message: message.into(),
            details: None,
            server_message: false,
        }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        let message = details
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "Validation failed".to_string());
        Self {
            kind: ErrorKind::Validation,
            status: None,
            message,
            details: Some(details),
            server_message: false,
        }
    }

    pub fn busy() -> Self {
        Self {
            kind: ErrorKind::Busy,
            status: None,
            message: "Request already in progress".to_string(),
            details: None,
            server_message: false,
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::validation(vec![FieldError::new(field, message)])
    }

    /// Text to show the user: the server's own message or validation text
    /// when there is one, `fallback` otherwise.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Busy => &self.message,
            _ if self.server_message => &self.message,
            _ => fallback,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            tracing::warn!(?err, "response did not match schema");
            return Self::decode(err.to_string());
        }
        tracing::debug!(?err, "transport error");
        Self::transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!(?err, "response did not match schema");
        Self::decode(err.to_string())
    }
}

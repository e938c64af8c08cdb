//! Error taxonomy shared by the gateway, the synchronizer and the settings layer.

use thiserror::Error;

use crate::notify::Severity;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PosError {
    /// The request never produced an HTTP response (connect, timeout, DNS).
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-2xx status. `message` is the body's
    /// `error`/`message` text, when it had one.
    #[error("{} (HTTP {status})", describe_status(.status, .message))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// Admin-only operation attempted by a staff session.
    #[error("{0}")]
    Forbidden(String),

    #[error("Local settings error: {0}")]
    Storage(String),
}

fn describe_status(status: &u16, message: &Option<String>) -> String {
    if let Some(message) = message {
        return message.clone();
    }
    match *status {
        400 => "Request was rejected by the server".to_string(),
        401 | 403 => "Not authorized".to_string(),
        404 => "Not found".to_string(),
        s if s >= 500 => "Server error".to_string(),
        _ => "Unexpected response from server".to_string(),
    }
}

impl PosError {
    pub fn severity(&self) -> Severity {
        match self {
            PosError::Validation(_) | PosError::Forbidden(_) => Severity::Warning,
            _ => Severity::Danger,
        }
    }

    /// Message from the server's `{error}` body, when there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            PosError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

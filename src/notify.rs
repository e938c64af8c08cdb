//! Short-lived user notifications (toasts).

use serde::Serialize;
use uuid::Uuid;

use crate::error::PosError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
}

impl Toast {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(Severity::Danger, message)
    }

    /// Toast for a failed operation.
    ///
    /// Local rejections show their own message, API failures prefer the
    /// server's `error` text over `fallback`, and transport failures show
    /// `network_message`.
    pub fn from_error(err: &PosError, fallback: &str, network_message: &str) -> Self {
        let message = match err {
            PosError::Validation(msg) | PosError::Forbidden(msg) => msg.clone(),
            PosError::Api { .. } => err.server_message().unwrap_or(fallback).to_string(),
            PosError::Network(_) => network_message.to_string(),
            PosError::Decode(_) | PosError::Storage(_) => fallback.to_string(),
        };
        Self::new(err.severity(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_prefers_server_message() {
        let err = PosError::Api {
            status: 400,
            message: Some("Price too high".into()),
        };
        let toast = Toast::from_error(&err, "Failed to update price", "Server error");
        assert_eq!(toast.message, "Price too high");
        assert_eq!(toast.severity, Severity::Danger);

        let blank = PosError::Api {
            status: 500,
            message: Some("  ".into()),
        };
        let toast = Toast::from_error(&blank, "Failed to update price", "Server error");
        assert_eq!(toast.message, "Failed to update price");

        let bodiless = PosError::Api {
            status: 400,
            message: None,
        };
        let toast = Toast::from_error(&bodiless, "Failed to update price", "Server error");
        assert_eq!(toast.message, "Failed to update price");
    }

    #[test]
    fn from_error_uses_network_message_for_transport_failures() {
        let err = PosError::Network("Cannot reach server".into());
        let toast = Toast::from_error(&err, "Upload failed", "Upload error");
        assert_eq!(toast.message, "Upload error");
    }

    #[test]
    fn validation_toast_is_a_warning() {
        let err = PosError::Validation("Please enter a valid price greater than 0".into());
        let toast = Toast::from_error(&err, "Failed", "Server error");
        assert_eq!(toast.severity, Severity::Warning);
        assert_eq!(toast.message, "Please enter a valid price greater than 0");
    }
}

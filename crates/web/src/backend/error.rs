//! Error types for the manual backend client.

use bon_manual_core::stream::TurnError;
use thiserror::Error;

/// Errors that can occur when talking to the manual backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status and no usable envelope.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder when it was empty.
        message: String,
    },

    /// Backend answered `ok: false`.
    #[error("{0}")]
    Rejected(String),

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Text suitable for a notice shown to the signed-in user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Status { .. } => "Backend Error".to_string(),
            Self::Http(_) | Self::Parse(_) => "Could not reach the manual service.".to_string(),
        }
    }

    /// Whether the backend refused the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

impl From<BackendError> for TurnError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, message } => Self::Status { status, message },
            BackendError::Rejected(message) => Self::Status {
                status: 200,
                message,
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Status {
            status: 502,
            message: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 502: upstream down");
        assert_eq!(err.user_message(), "upstream down");
    }

    #[test]
    fn test_empty_status_body_has_placeholder() {
        let err = BackendError::Status {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message(), "Backend Error");
    }

    #[test]
    fn test_rejection_message_is_shown_verbatim() {
        let err = BackendError::Rejected("Category code already exists".to_string());
        assert_eq!(err.user_message(), "Category code already exists");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_status_maps_to_turn_error() {
        let err: TurnError = BackendError::Status {
            status: 401,
            message: "bad password".to_string(),
        }
        .into();
        assert_eq!(
            err,
            TurnError::Status {
                status: 401,
                message: "bad password".to_string()
            }
        );
    }
}

//! Error shape shared by every service call.

use thiserror::Error;

use crate::geolocation::LocationError;
use crate::models::ApiErrorBody;

// ---

/// Failure of a call against the prediction service.
///
/// `Display` yields the human-readable message only, so a backend error
/// `{ "error": "invalid location" }` prints exactly `invalid location`.
#[derive(Debug, Error)]
pub enum ServiceRequestError {
    // ---
    /// Non-2xx response from the backend.
    #[error("{message}")]
    Backend {
        status: u16,
        message: String,
        hint: Option<String>,
    },

    /// The request never completed (connection refused, reset, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered 2xx but the body did not match the expected shape.
    #[error("malformed response body: {0}")]
    Decode(String),

    #[error("could not encode request body: {0}")]
    Encode(String),

    /// Device geolocation failed.
    #[error(transparent)]
    Location(#[from] LocationError),
}

impl ServiceRequestError {
    // ---
    /// Build a backend error from a status code and whatever error body the
    /// backend supplied.
    pub fn from_status(status: u16, body: ApiErrorBody) -> Self {
        // ---
        let message = body
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));

        Self::Backend {
            status,
            message,
            hint: body.hint,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Backend-supplied remediation hint, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Backend { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// HTTP status for backend-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceRequestError {
    fn from(e: reqwest::Error) -> Self {
        ServiceRequestError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_backend_message_used_verbatim() {
        // ---
        let err = ServiceRequestError::from_status(
            400,
            ApiErrorBody {
                error: Some("invalid location".to_string()),
                hint: Some("Try a city name".to_string()),
            },
        );

        assert_eq!(err.to_string(), "invalid location");
        assert_eq!(err.hint(), Some("Try a city name"));
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_missing_error_falls_back_to_status() {
        // ---
        let err = ServiceRequestError::from_status(500, ApiErrorBody::default());
        assert_eq!(err.message(), "HTTP error! status: 500");
        assert_eq!(err.hint(), None);

        let blank = ServiceRequestError::from_status(
            502,
            ApiErrorBody {
                error: Some(String::new()),
                hint: None,
            },
        );
        assert!(blank.message().contains("502"));
    }

    #[test]
    fn test_non_backend_errors_have_no_status() {
        // ---
        let err = ServiceRequestError::Transport("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.hint(), None);
        assert_eq!(err.to_string(), "request failed: connection refused");
    }
}

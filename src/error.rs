// Error handling module
// Dispatch errors and their user-facing messages

use thiserror::Error;

use crate::kind::RequestKind;
use crate::params;

/// Message shown for every fetch failure, whatever the underlying cause
pub const FETCH_FAILED_MESSAGE: &str =
    "Failed to fetch data. Please check your input and try again.";

/// Errors returned by a dispatch
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A required parameter was absent or blank. No request was sent.
    #[error("Missing required field '{field}' for {kind} request")]
    MissingRequiredField {
        kind: RequestKind,
        field: &'static str,
    },

    /// The request was sent but no usable JSON came back
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchFailure),

    /// The request was cancelled or superseded before it completed
    #[error("Request cancelled")]
    Cancelled,
}

/// Underlying cause of a fetch failure, kept for diagnostics
#[derive(Error, Debug)]
pub enum FetchFailure {
    /// Network, TLS, or body-read error from the HTTP client
    #[error("HTTP request failed ({kind}): {source}")]
    Transport {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Body was not valid JSON
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Message suitable for showing to whoever filled in the request
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::MissingRequiredField { field, .. } => match *field {
                params::VIDEO_URL => "Please enter a video URL".to_string(),
                params::USERNAME => "Please enter a username".to_string(),
                other => format!("Please enter a {}", other.replace('_', " ")),
            },
            DispatchError::FetchFailed(_) => FETCH_FAILED_MESSAGE.to_string(),
            DispatchError::Cancelled => "Request cancelled".to_string(),
        }
    }

    /// True when the failure happened before anything went over the network
    pub fn is_validation(&self) -> bool {
        matches!(self, DispatchError::MissingRequiredField { .. })
    }
}

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DispatchError::MissingRequiredField {
            kind: RequestKind::Comments,
            field: params::VIDEO_URL,
        };
        assert_eq!(
            err.to_string(),
            "Missing required field 'video_url' for comments request"
        );

        let err = DispatchError::FetchFailed(FetchFailure::Status {
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert_eq!(err.to_string(), "Fetch failed: Upstream returned HTTP 502");

        assert_eq!(DispatchError::Cancelled.to_string(), "Request cancelled");
    }

    #[test]
    fn test_user_messages() {
        let err = DispatchError::MissingRequiredField {
            kind: RequestKind::Profile,
            field: params::USERNAME,
        };
        assert_eq!(err.user_message(), "Please enter a username");
        assert!(err.is_validation());

        let err = DispatchError::MissingRequiredField {
            kind: RequestKind::Comments,
            field: params::VIDEO_URL,
        };
        assert_eq!(err.user_message(), "Please enter a video URL");
    }

    #[test]
    fn test_fetch_failures_share_one_message() {
        let decode = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let errors = [
            DispatchError::FetchFailed(FetchFailure::Decode(decode)),
            DispatchError::FetchFailed(FetchFailure::Status {
                status: 404,
                body: String::new(),
            }),
        ];

        for err in &errors {
            assert_eq!(err.user_message(), FETCH_FAILED_MESSAGE);
            assert!(!err.is_validation());
        }
    }

    #[test]
    fn test_fetch_failure_keeps_cause() {
        let decode = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DispatchError = FetchFailure::from(decode).into();

        let source = std::error::Error::source(&err).expect("cause retained");
        assert!(source.to_string().starts_with("Invalid JSON response"));
    }
}

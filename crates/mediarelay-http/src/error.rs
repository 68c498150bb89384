//! Internal error types for the HTTP adapters.
//!
//! These errors are internal to `mediarelay-http` and are mapped to core port
//! errors at the boundary.

use mediarelay_core::{DestinationError, SourceError, UploadPhase};
use thiserror::Error;

/// Result type alias for HTTP adapter operations.
pub type HttpResult<T> = Result<T, HttpAdapterError>;

/// Errors raised while talking HTTP.
#[derive(Debug, Error)]
pub enum HttpAdapterError {
    /// Request completed with a non-success status.
    #[error("Request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
        /// Response body excerpt, if any
        body: String,
    },

    /// The response could not be understood.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HttpAdapterError {
    /// HTTP status code, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidResponse { .. } | Self::InvalidUrl(_) => None,
        }
    }

    /// Detail line including the body excerpt when there is one.
    fn detail(&self) -> String {
        match self {
            Self::Status { body, .. } if !body.is_empty() => format!("{self} ({body})"),
            _ => self.to_string(),
        }
    }

    /// Map to the source port's "could not open" error.
    pub fn into_unavailable(self) -> SourceError {
        match self.status_code() {
            Some(status) => SourceError::unavailable_with_status(self.detail(), status),
            None => SourceError::unavailable(self.detail()),
        }
    }

    /// Map to a destination session error for `phase` at `offset`.
    pub fn into_session(self, phase: UploadPhase, offset: u64) -> DestinationError {
        match self.status_code() {
            Some(status) => DestinationError::session_with_status(phase, offset, self.detail(), status),
            None => DestinationError::session(phase, offset, self.detail()),
        }
    }

    /// Whether the destination refused an attached thumbnail rather than the session.
    ///
    /// 413 and 415 always count; 400 and 422 count when the body names the thumbnail.
    pub fn rejects_attachment(&self) -> bool {
        match self {
            Self::Status {
                status: 413 | 415, ..
            } => true,
            Self::Status {
                status: 400 | 422,
                body,
                ..
            } => body.to_ascii_lowercase().contains("thumb"),
            _ => false,
        }
    }

    /// Map a failed finish call.
    ///
    /// With a thumbnail attached, a thumbnail rejection becomes
    /// `SecondaryArtifact`; everything else is a finish-phase session error.
    pub fn into_finish_error(self, with_thumbnail: bool) -> DestinationError {
        if with_thumbnail && self.rejects_attachment() {
            DestinationError::secondary_artifact(self.detail())
        } else {
            self.into_session(UploadPhase::Finish, 0)
        }
    }
}

/// Longest body excerpt kept in an error.
const BODY_EXCERPT_LEN: usize = 200;

/// Turn a non-success response into a `Status` error, keeping a body excerpt.
pub async fn check_status(response: reqwest::Response) -> HttpResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let body = body.chars().take(BODY_EXCERPT_LEN).collect();
    Err(HttpAdapterError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(body: &str) -> HttpAdapterError {
        HttpAdapterError::Status {
            status: 403,
            url: "https://upload.invalid/v1".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_error_message() {
        let msg = status_error("").to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("upload.invalid"));
    }

    #[test]
    fn test_into_unavailable_keeps_status() {
        let err = status_error("").into_unavailable();
        assert!(matches!(
            err,
            SourceError::Unavailable {
                status_code: Some(403),
                ..
            }
        ));
    }

    #[test]
    fn test_into_session_includes_body_excerpt() {
        let err = status_error("token expired").into_session(UploadPhase::Transfer, 5);
        match err {
            DestinationError::Session {
                phase,
                offset,
                message,
                status_code,
            } => {
                assert_eq!(phase, UploadPhase::Transfer);
                assert_eq!(offset, 5);
                assert!(message.contains("token expired"));
                assert_eq!(status_code, Some(403));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn status_with(status: u16, body: &str) -> HttpAdapterError {
        HttpAdapterError::Status {
            status,
            url: "https://upload.invalid/v1".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_thumbnail_rejection_is_secondary_artifact() {
        let err = status_with(415, "").into_finish_error(true);
        assert!(matches!(err, DestinationError::SecondaryArtifact { .. }));

        let err = status_with(400, "Thumbnail too large").into_finish_error(true);
        assert!(matches!(err, DestinationError::SecondaryArtifact { .. }));
    }

    #[test]
    fn test_session_failure_stays_a_finish_error() {
        for err in [
            status_with(500, "thumb service down").into_finish_error(true),
            status_with(400, "session expired").into_finish_error(true),
            status_with(415, "").into_finish_error(false),
        ] {
            assert!(matches!(
                err,
                DestinationError::Session {
                    phase: UploadPhase::Finish,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_invalid_response_has_no_status() {
        let err = HttpAdapterError::InvalidResponse {
            message: "missing field".to_string(),
        };
        assert_eq!(err.status_code(), None);
    }
}

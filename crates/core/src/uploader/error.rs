//! Error types for the uploader module.

use thiserror::Error;

/// Errors that can occur while uploading an asset.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request could not be built or sent.
    #[error("upload request failed: {0}")]
    Request(String),

    /// The store did not answer in time.
    #[error("upload timed out")]
    Timeout,

    /// Could not connect to the store.
    #[error("connection to asset store failed: {0}")]
    Connection(String),

    /// The store answered with an error status.
    #[error("asset store rejected upload (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store answered 2xx but the body was unusable.
    #[error("invalid response from asset store: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connection(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UploadError::Rejected {
            status: 401,
            message: "Invalid Signature".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "asset store rejected upload (HTTP 401): Invalid Signature"
        );
        assert_eq!(UploadError::Timeout.to_string(), "upload timed out");
    }
}

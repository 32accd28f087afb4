//! Error types for the renderer module.

use thiserror::Error;

/// Errors that can occur while rendering or capturing the target page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Browser could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Page could not be loaded.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// `find_items`/`screenshot` called before `open`.
    #[error("no page is open")]
    NoPage,

    /// Handle does not refer to an element of the current page.
    #[error("element #{0} is not available on the current page")]
    ElementNotFound(usize),

    /// DOM query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// Screenshot of an element failed.
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// The connection to the browser is gone; nothing else will succeed.
    #[error("browser connection lost: {0}")]
    Disconnected(String),
}

impl RenderError {
    /// Whether no further renderer call can be expected to succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::Launch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RenderError::Disconnected("ws closed".into()).is_fatal());
        assert!(!RenderError::Screenshot("zero size".into()).is_fatal());
        assert!(!RenderError::ElementNotFound(3).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::Timeout {
            operation: "navigation".to_string(),
            timeout_ms: 30000,
        };
        assert_eq!(err.to_string(), "navigation timed out after 30000ms");
    }
}

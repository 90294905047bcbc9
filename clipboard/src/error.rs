use thiserror::Error;

/// Errors that can occur when accessing the clipboard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The platform clipboard cannot be reached, or a required native
    /// dependency (such as a display connection) is missing.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// The requested format is not recognized by this clipboard.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    /// The platform rejected the operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl ClipboardError {
    /// Shorthand for [`ClipboardError::Unavailable`].
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable(detail.into())
    }

    /// Shorthand for [`ClipboardError::Unsupported`].
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported(detail.into())
    }

    /// Shorthand for [`ClipboardError::InvalidOperation`].
    pub fn invalid_operation(detail: impl Into<String>) -> Self {
        Self::InvalidOperation(detail.into())
    }
}

/// Result alias used throughout the crate.
pub type ClipboardResult<T> = Result<T, ClipboardError>;

//! Error types for canvas embed resolution and export.

use thiserror::Error;

/// Errors produced while resolving embeds or exporting canvas nodes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    /// Reference string does not match `<path>.canvas#<hex-id>`.
    #[error("Malformed node reference: {0:?}")]
    Parse(String),

    /// Path did not resolve, document is missing, or node id is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Canvas document is not valid JSON.
    #[error("Failed to decode canvas '{path}': {message}")]
    Decode { path: String, message: String },

    /// Rich-text renderer failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Store could not create or append a document.
    #[error("Failed to write '{path}': {message}")]
    StoreWrite { path: String, message: String },

    /// Clipboard write failed.
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// I/O error while reading from the store.
    #[error("I/O error: {0}")]
    Io(String),

    /// Observer was started twice.
    #[error("Embed observer is already running")]
    AlreadyRunning,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for embed operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

impl EmbedError {
    /// Create a not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a render error
    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    /// Create a store write error for `path`
    pub fn store_write(path: impl Into<String>, msg: impl ToString) -> Self {
        Self::StoreWrite {
            path: path.into(),
            message: msg.to_string(),
        }
    }

    /// Whether a single placeholder can fail with this error without
    /// affecting the rest of the pipeline.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::NotFound(_) | Self::Decode { .. } | Self::Render(_) | Self::Io(_)
        )
    }

    /// Short, stable name of the error class. Used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::NotFound(_) => "not_found",
            Self::Decode { .. } => "decode",
            Self::Render(_) => "render",
            Self::StoreWrite { .. } => "store_write",
            Self::Clipboard(_) => "clipboard",
            Self::Io(_) => "io",
            Self::AlreadyRunning => "already_running",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for EmbedError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recoverable() {
        assert!(EmbedError::Parse("x".into()).is_recoverable());
        assert!(EmbedError::not_found("a.canvas").is_recoverable());
        assert!(EmbedError::Decode {
            path: "a.canvas".into(),
            message: "eof".into()
        }
        .is_recoverable());

        assert!(!EmbedError::store_write("a.md", "disk full").is_recoverable());
        assert!(!EmbedError::Clipboard("denied".into()).is_recoverable());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: EmbedError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), "not_found");

        let err: EmbedError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), "io");
    }
}

//! Error types for starcc-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path does not exist
    NotFound,
    /// Write-once violation or rename onto an existing path
    AlreadyExists,
    /// Malformed record bytes
    Codec,
    /// I/O errors
    IO,
    /// Configuration errors
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Codec => "codec",
            ErrorKind::IO => "io",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("Path not found: {}", path))
    }

    pub fn already_exists(path: impl fmt::Display) -> Self {
        Self::new(ErrorKind::AlreadyExists, format!("Path already exists: {}", path))
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codec, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IO, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            _ => ErrorKind::IO,
        };
        StorageError::new(kind, format!("I/O error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("graph_0/part-00000");
        let msg = format!("{}", err);
        assert!(msg.contains("not_found"));
        assert!(msg.contains("graph_0/part-00000"));
    }

    #[test]
    fn test_codec_error() {
        let err = StorageError::codec("truncated edge record");
        assert_eq!(err.kind, ErrorKind::Codec);
        assert!(err.source.is_none());
        assert_eq!(format!("{}", err), "[codec] truncated edge record");
    }

    #[test]
    fn test_from_io_error_keeps_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: StorageError = io_err.into();

        assert!(err.is_not_found());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("no such file"));

        let other: StorageError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(other.kind, ErrorKind::IO);
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::AlreadyExists.as_str(), "already_exists");
        assert_eq!(ErrorKind::Codec.as_str(), "codec");
        assert_eq!(ErrorKind::IO.as_str(), "io");
        assert_eq!(ErrorKind::Config.as_str(), "config");
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<()> {
            Err(StorageError::already_exists("out"))
        }

        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }
}

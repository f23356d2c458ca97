use crate::config::ConfigError;
use starcc_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Input format indeterminate: every line holds a single node id")]
    FormatIndeterminate,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Stage execution failed: {0}")]
    StageExecutionFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn parse<E: std::fmt::Display>(line: usize, e: E) -> Self {
        Self::Parse {
            line,
            message: e.to_string(),
        }
    }

    pub fn stage_failed<E: std::fmt::Display>(e: E) -> Self {
        Self::StageExecutionFailed(e.to_string())
    }

    /// Classify for reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. }
            | Self::FormatIndeterminate
            | Self::Config(_)
            | Self::InvalidStateTransition { .. } => ErrorCategory::Permanent,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Infrastructure,
            Self::StageExecutionFailed(_) | Self::Json(_) | Self::Other(_) => {
                ErrorCategory::Transient
            }
        }
    }
}

/// Error category of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Transient error - a re-run may succeed (task crash, panic)
    Transient,
    /// Permanent error - the input or configuration must change
    Permanent,
    /// Infrastructure error - storage or disk problem
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_serializes_as_display_name() {
        for category in [
            ErrorCategory::Transient,
            ErrorCategory::Permanent,
            ErrorCategory::Infrastructure,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
            let back: ErrorCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
        assert!(serde_json::from_str::<ErrorCategory>("\"invalid\"").is_err());
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            OrchestratorError::parse(3, "bad token").category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            OrchestratorError::FormatIndeterminate.category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            OrchestratorError::from(StorageError::io("disk full")).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            OrchestratorError::stage_failed("reduce task panicked").category(),
            ErrorCategory::Transient
        );
    }

    #[test]
    fn test_parse_error_message_names_line() {
        let err = OrchestratorError::parse(7, "invalid node id 'x'");
        assert_eq!(
            err.to_string(),
            "Parse error at line 7: invalid node id 'x'"
        );
    }
}

//! Error types and error code constants for tuglint.
//!
//! `LintError` is the single error type the CLI renders. Subsystem errors
//! (cancellation, fix application, parsing, configuration) bridge into it
//! through `From` impls, and every variant maps to a stable exit code:
//!
//! - `2`: Invalid arguments (bad flags, bad config)
//! - `3`: Resolution errors (file not found, file failed to parse)
//! - `4`: Apply errors (fix conflicts, failed writes)
//! - `10`: Internal errors (bugs, unexpected IO failures)
//! - `130`: Cancelled

use std::fmt;

use thiserror::Error;

use crate::cancel::Cancelled;
use crate::patch::Conflict;

pub use crate::types::Location;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed config).
    InvalidArguments = 2,
    /// Resolution errors (file not found, parse failure).
    ResolutionError = 3,
    /// Apply errors (conflicting edits, failed writes).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
    /// The run was cancelled.
    Cancelled = 130,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum LintError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A source or reference file could not be parsed.
    #[error("parse error in {file}: {message}")]
    ParseError {
        file: String,
        message: String,
        location: Option<Location>,
    },

    /// Failed to apply fixes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },

    /// The run observed a cancelled token.
    #[error("cancelled")]
    Cancelled,
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&LintError> for OutputErrorCode {
    fn from(err: &LintError) -> Self {
        match err {
            LintError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            LintError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            LintError::ParseError { .. } => OutputErrorCode::ResolutionError,
            LintError::ApplyError { .. } => OutputErrorCode::ApplyError,
            LintError::InternalError { .. } => OutputErrorCode::InternalError,
            LintError::Cancelled => OutputErrorCode::Cancelled,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<Cancelled> for LintError {
    fn from(_: Cancelled) -> Self {
        LintError::Cancelled
    }
}

impl From<std::io::Error> for LintError {
    fn from(err: std::io::Error) -> Self {
        LintError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for LintError {
    fn from(err: serde_json::Error) -> Self {
        LintError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl LintError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        LintError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        LintError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        LintError::InternalError {
            message: message.into(),
        }
    }

    /// Create an apply error from patch conflicts.
    pub fn from_conflicts(file: impl Into<String>, conflicts: &[Conflict]) -> Self {
        let message = conflicts
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        LintError::ApplyError {
            message,
            file: Some(file.into()),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{FileId, Span};

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_arguments_maps_to_2() {
            let err = LintError::invalid_args("unknown severity");
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn resolution_errors_map_to_3() {
            assert_eq!(LintError::file_not_found("a.cs").error_code().code(), 3);
            let err = LintError::ParseError {
                file: "a.cs".to_string(),
                message: "expected ';'".to_string(),
                location: None,
            };
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn conflicts_map_to_apply_error() {
            let err = LintError::from_conflicts(
                "a.cs",
                &[Conflict::FileMissing {
                    file_id: FileId::new(3),
                }],
            );
            assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
            assert_eq!(err.to_string(), "apply error: file file_3 missing");
        }

        #[test]
        fn cancelled_maps_to_130() {
            let err = LintError::from(Cancelled);
            assert_eq!(err.error_code().code(), 130);
        }

        #[test]
        fn io_error_is_internal() {
            let err = LintError::from(std::io::Error::other("disk on fire"));
            assert_eq!(err.error_code().code(), 10);
            assert!(err.to_string().contains("disk on fire"));
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn overlapping_conflict_message() {
            let err = LintError::from_conflicts(
                "b.cs",
                &[Conflict::OverlappingSpans {
                    file_id: FileId::new(0),
                    edit1_span: Span::new(0, 4),
                    edit2_span: Span::new(2, 6),
                }],
            );
            assert_eq!(
                err.to_string(),
                "apply error: overlapping edits in file_0: [0, 4) and [2, 6)"
            );
        }
    }
}

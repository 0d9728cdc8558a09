//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Versioned:** Schema version in response enables forward compatibility

use std::io::{self, Write};

use serde::Serialize;

use crate::diagnostic::{Finding, RuleDescriptor, Severity};
use crate::error::{LintError, OutputErrorCode};
use crate::types::Location;

pub use crate::patch::{MaterializedPatch as Patch, OutputEdit as Edit};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Shared Pieces
// ============================================================================

/// Error information for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a LintError.
    pub fn from_error(err: &LintError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let (details, location) = match err {
            LintError::InvalidArguments { details, .. } => (details.clone(), None),
            LintError::FileNotFound { path } => (Some(serde_json::json!({ "path": path })), None),
            LintError::ParseError { file, location, .. } => (
                Some(serde_json::json!({ "file": file })),
                location.clone(),
            ),
            LintError::ApplyError { file, .. } => {
                let details = file.as_ref().map(|f| serde_json::json!({ "file": f }));
                (details, None)
            }
            _ => (None, None),
        };

        ErrorInfo {
            code,
            message,
            details,
            location,
        }
    }
}

/// A fix that was computed but not applied.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFixInfo {
    pub rule_id: String,
    pub location: Location,
    pub reason: String,
}

/// A source file left out of analysis because it did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFileInfo {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub message: String,
}

fn sort_skipped_files(files: &mut [SkippedFileInfo]) {
    files.sort_by(|a, b| a.file.cmp(&b.file));
}

/// Per-severity finding counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingSummary {
    pub total: usize,
    pub error: usize,
    pub warning: usize,
    pub suggestion: usize,
    pub silent: usize,
}

impl FindingSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = FindingSummary {
            total: findings.len(),
            ..FindingSummary::default()
        };
        for finding in findings {
            match finding.severity {
                Severity::Error => summary.error += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Suggestion => summary.suggestion += 1,
                Severity::Silent => summary.silent += 1,
                Severity::None => {}
            }
        }
        summary
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for the `check` command.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Number of source files analysed.
    pub files_analyzed: usize,
    /// Files that did not parse, sorted by path.
    pub files_skipped: Vec<SkippedFileInfo>,
    /// Findings sorted by (file, line, col).
    pub findings: Vec<Finding>,
    pub summary: FindingSummary,
}

impl CheckResponse {
    pub fn new(files_analyzed: usize, mut findings: Vec<Finding>) -> Self {
        findings.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        let summary = FindingSummary::from_findings(&findings);
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            files_analyzed,
            files_skipped: Vec::new(),
            findings,
            summary,
        }
    }

    pub fn with_files_skipped(mut self, mut files: Vec<SkippedFileInfo>) -> Self {
        sort_skipped_files(&mut files);
        self.files_skipped = files;
        self
    }
}

/// Response for the `fix` command.
#[derive(Debug, Clone, Serialize)]
pub struct FixResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Whether files were left untouched.
    pub dry_run: bool,
    /// Number of fixes applied (or that would be applied).
    pub fixes_applied: usize,
    /// Fixes that were not applicable.
    pub skipped: Vec<SkippedFixInfo>,
    /// Files that did not parse, sorted by path.
    pub files_skipped: Vec<SkippedFileInfo>,
    /// Files written to disk, sorted.
    pub files_written: Vec<String>,
    /// The materialized patch.
    pub patch: Patch,
}

impl FixResponse {
    pub fn new(
        dry_run: bool,
        patch: Patch,
        mut skipped: Vec<SkippedFixInfo>,
        mut files_written: Vec<String>,
    ) -> Self {
        skipped.sort_by(|a, b| a.location.cmp(&b.location));
        files_written.sort();
        FixResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            dry_run,
            fixes_applied: patch.edits.len(),
            skipped,
            files_skipped: Vec::new(),
            files_written,
            patch,
        }
    }

    pub fn with_files_skipped(mut self, mut files: Vec<SkippedFileInfo>) -> Self {
        sort_skipped_files(&mut files);
        self.files_skipped = files;
        self
    }
}

/// One rule as listed by the `rules` command.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub id: String,
    pub title: String,
    pub category: String,
    pub default_severity: Severity,
    pub effective_severity: Severity,
    pub fixable: bool,
}

impl RuleInfo {
    pub fn new(descriptor: &RuleDescriptor, effective_severity: Severity) -> Self {
        RuleInfo {
            id: descriptor.id.to_string(),
            title: descriptor.title.to_string(),
            category: descriptor.category.to_string(),
            default_severity: descriptor.default_severity,
            effective_severity,
            fixable: descriptor.fixable,
        }
    }
}

/// Response for the `rules` command.
#[derive(Debug, Clone, Serialize)]
pub struct RulesResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Registered rules, sorted by id.
    pub rules: Vec<RuleInfo>,
}

impl RulesResponse {
    pub fn new(mut rules: Vec<RuleInfo>) -> Self {
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        RulesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rules,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &LintError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Write a response as pretty-printed JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

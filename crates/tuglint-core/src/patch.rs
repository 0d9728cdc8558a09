//! Patch IR: Edit, Anchor, PatchSet for atomic fix application.
//!
//! This module implements the edit infrastructure fixes are committed through:
//! - Hash-anchored edits (an edit only applies to the bytes it was computed for)
//! - Conflict detection (overlapping spans, stale anchors)
//! - Atomic apply semantics (all-or-nothing)
//! - Patch materialization (unified diff, JSON)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::text::byte_offset_to_position;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Stable file identifier within one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both spans.
    pub fn cover(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Anchor Model
// ============================================================================

/// How an edit finds and validates its target location.
///
/// The edit only applies if the bytes at `span` still hash to
/// `expected_before_hash`. Fixes are computed against one version of a
/// buffer; the hash turns any drift into a conflict instead of a bad edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// Exact span with hash verification.
    SpanExact {
        /// The exact byte range to edit.
        span: Span,
        /// SHA-256 hash of the bytes in `span` before the edit.
        expected_before_hash: ContentHash,
    },
}

impl Anchor {
    /// Create a SpanExact anchor from the bytes currently at `span`.
    pub fn span_exact(span: Span, content: &[u8]) -> Self {
        Anchor::SpanExact {
            span,
            expected_before_hash: ContentHash::compute(content),
        }
    }

    /// Get the span for this anchor.
    pub fn span(&self) -> Span {
        match self {
            Anchor::SpanExact { span, .. } => *span,
        }
    }

    /// Resolve this anchor against the given file content.
    pub fn resolve(&self, content: &[u8]) -> AnchorResolution {
        match self {
            Anchor::SpanExact {
                span,
                expected_before_hash,
            } => {
                if span.end > content.len() {
                    return AnchorResolution::OutOfBounds {
                        span: *span,
                        file_len: content.len(),
                    };
                }

                let actual = ContentHash::compute(&content[span.start..span.end]);
                if &actual != expected_before_hash {
                    return AnchorResolution::HashMismatch {
                        span: *span,
                        expected: expected_before_hash.clone(),
                        actual,
                    };
                }

                AnchorResolution::Resolved(*span)
            }
        }
    }
}

/// Result of attempting to resolve an anchor against file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorResolution {
    /// Anchor resolved successfully to a specific span.
    Resolved(Span),
    /// Content at span doesn't match the expected hash.
    HashMismatch {
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },
    /// Span is out of bounds for the file content.
    OutOfBounds { span: Span, file_len: usize },
}

// ============================================================================
// Preconditions
// ============================================================================

/// Checks that must pass before any edit can apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// File content hash must match.
    FileHashMatches {
        file_id: FileId,
        content_hash: ContentHash,
    },

    /// Edits in a file must not overlap once ordered.
    NoOverlaps,
}

// ============================================================================
// Conflict Detection
// ============================================================================

/// A detected overlap or invalidation that prevents apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Two edits have overlapping spans in the same file.
    OverlappingSpans {
        file_id: FileId,
        edit1_span: Span,
        edit2_span: Span,
    },

    /// Anchor hash mismatch.
    AnchorHashMismatch {
        file_id: FileId,
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Precondition failed.
    PreconditionFailed {
        precondition: Precondition,
        reason: String,
    },

    /// Span is out of bounds for the file.
    SpanOutOfBounds {
        file_id: FileId,
        span: Span,
        file_len: usize,
    },

    /// File not found in context.
    FileMissing { file_id: FileId },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::OverlappingSpans {
                file_id,
                edit1_span,
                edit2_span,
            } => write!(
                f,
                "overlapping edits in {}: {} and {}",
                file_id, edit1_span, edit2_span
            ),
            Conflict::AnchorHashMismatch { file_id, span, .. } => {
                write!(f, "content changed at {} in {}", span, file_id)
            }
            Conflict::PreconditionFailed { reason, .. } => {
                write!(f, "precondition failed: {}", reason)
            }
            Conflict::SpanOutOfBounds {
                file_id,
                span,
                file_len,
            } => write!(
                f,
                "span {} out of bounds for {} (length {})",
                span, file_id, file_len
            ),
            Conflict::FileMissing { file_id } => write!(f, "file {} missing", file_id),
        }
    }
}

// ============================================================================
// Edit Operations
// ============================================================================

/// Optional labels for provenance tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLabels {
    /// The rule whose fix generated this edit.
    pub rule_id: Option<String>,
    /// Human-readable reason for the edit.
    pub reason: Option<String>,
}

/// A single atomic text replacement anchored in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Stable identifier for ordering.
    pub id: u32,
    /// The file this edit applies to.
    pub file_id: FileId,
    /// How to find/verify the target location.
    pub anchor: Anchor,
    /// The new text.
    pub text: String,
    /// Optional provenance labels.
    pub labels: EditLabels,
}

impl Edit {
    /// Create a replace edit.
    pub fn replace(id: u32, file_id: FileId, anchor: Anchor, text: impl Into<String>) -> Self {
        Edit {
            id,
            file_id,
            anchor,
            text: text.into(),
            labels: EditLabels::default(),
        }
    }

    /// Add labels to this edit.
    pub fn with_labels(mut self, labels: EditLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Get the anchor's span.
    pub fn span(&self) -> Span {
        self.anchor.span()
    }
}

// ============================================================================
// PatchSet
// ============================================================================

/// An ordered set of edits with metadata, applied atomically.
///
/// A PatchSet either applies completely or not at all. Preconditions are
/// verified before any edit is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchSet {
    /// Preconditions that must pass before applying.
    pub preconditions: Vec<Precondition>,

    /// The edits to apply, in deterministic order.
    pub edits: Vec<Edit>,

    /// Mapping from FileId to file path (for materialization).
    pub file_paths: HashMap<FileId, String>,
}

impl PatchSet {
    /// Create a new empty PatchSet.
    pub fn new() -> Self {
        PatchSet::default()
    }

    /// Add a precondition.
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Add an edit.
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Register a file path mapping.
    pub fn with_file_path(mut self, file_id: FileId, path: impl Into<String>) -> Self {
        self.file_paths.insert(file_id, path.into());
        self
    }

    /// Check if this PatchSet contains any edits.
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Get the number of edits in this PatchSet.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Get the number of unique files affected by edits in this PatchSet.
    pub fn file_count(&self) -> usize {
        self.edits
            .iter()
            .map(|e| e.file_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Sort edits in deterministic order: by file path, then by span start, then by edit ID.
    pub fn sort_edits(&mut self) {
        let paths = &self.file_paths;
        self.edits.sort_by(|a, b| {
            let path_a = paths.get(&a.file_id).map(String::as_str);
            let path_b = paths.get(&b.file_id).map(String::as_str);
            path_a
                .cmp(&path_b)
                .then_with(|| a.span().start.cmp(&b.span().start))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Detect overlapping edits within this PatchSet.
    ///
    /// Returns a list of all detected conflicts. An empty list means no conflicts.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        let mut edits_by_file: HashMap<FileId, Vec<&Edit>> = HashMap::new();
        for edit in &self.edits {
            edits_by_file.entry(edit.file_id).or_default().push(edit);
        }

        let mut files: Vec<_> = edits_by_file.into_iter().collect();
        files.sort_by_key(|(file_id, _)| *file_id);

        for (file_id, edits) in files {
            for i in 0..edits.len() {
                for j in (i + 1)..edits.len() {
                    let span_i = edits[i].span();
                    let span_j = edits[j].span();
                    if span_i.overlaps(&span_j) {
                        conflicts.push(Conflict::OverlappingSpans {
                            file_id,
                            edit1_span: span_i,
                            edit2_span: span_j,
                        });
                    }
                }
            }
        }

        conflicts
    }

    /// Check if precondition NoOverlaps would be satisfied.
    pub fn has_no_overlaps(&self) -> bool {
        self.detect_conflicts().is_empty()
    }
}

// ============================================================================
// Atomic Apply
// ============================================================================

/// Result of attempting to apply a PatchSet.
#[derive(Debug, Clone)]
pub enum ApplyResult {
    /// All edits applied successfully.
    Success {
        /// The new content for each modified file.
        modified_files: HashMap<FileId, Vec<u8>>,
    },

    /// Apply failed due to conflicts or precondition failures.
    Failed {
        /// The conflicts/failures that prevented apply.
        conflicts: Vec<Conflict>,
    },
}

/// Context for applying a PatchSet.
#[derive(Debug, Clone, Default)]
pub struct ApplyContext {
    /// File contents, keyed by FileId.
    pub file_contents: HashMap<FileId, Vec<u8>>,
    /// File content hashes, keyed by FileId.
    pub file_hashes: HashMap<FileId, ContentHash>,
}

impl ApplyContext {
    /// Register a file's current content, hashing it for precondition checks.
    pub fn with_file(mut self, file_id: FileId, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        self.file_hashes
            .insert(file_id, ContentHash::compute(&content));
        self.file_contents.insert(file_id, content);
        self
    }
}

impl PatchSet {
    /// Apply this PatchSet atomically.
    ///
    /// Either all edits apply successfully, or none do. Edits are applied in
    /// reverse offset order within each file so earlier spans stay valid.
    #[must_use]
    pub fn apply(&self, ctx: &ApplyContext) -> ApplyResult {
        let mut conflicts = Vec::new();

        for precondition in &self.preconditions {
            match precondition {
                Precondition::FileHashMatches {
                    file_id,
                    content_hash,
                } => match ctx.file_hashes.get(file_id) {
                    Some(actual) if actual != content_hash => {
                        conflicts.push(Conflict::PreconditionFailed {
                            precondition: precondition.clone(),
                            reason: format!(
                                "file hash mismatch for {}: expected {}, got {}",
                                file_id, content_hash, actual
                            ),
                        });
                    }
                    Some(_) => {}
                    None => conflicts.push(Conflict::FileMissing { file_id: *file_id }),
                },
                Precondition::NoOverlaps => conflicts.extend(self.detect_conflicts()),
            }
        }

        let mut edits_by_file: HashMap<FileId, Vec<(Span, &Edit)>> = HashMap::new();
        for edit in &self.edits {
            let Some(content) = ctx.file_contents.get(&edit.file_id) else {
                conflicts.push(Conflict::FileMissing {
                    file_id: edit.file_id,
                });
                continue;
            };

            match edit.anchor.resolve(content) {
                AnchorResolution::Resolved(span) => {
                    edits_by_file
                        .entry(edit.file_id)
                        .or_default()
                        .push((span, edit));
                }
                AnchorResolution::HashMismatch {
                    span,
                    expected,
                    actual,
                } => conflicts.push(Conflict::AnchorHashMismatch {
                    file_id: edit.file_id,
                    span,
                    expected,
                    actual,
                }),
                AnchorResolution::OutOfBounds { span, file_len } => {
                    conflicts.push(Conflict::SpanOutOfBounds {
                        file_id: edit.file_id,
                        span,
                        file_len,
                    })
                }
            }
        }

        if !conflicts.is_empty() {
            return ApplyResult::Failed { conflicts };
        }

        let mut modified_files = HashMap::new();
        for (file_id, mut file_edits) in edits_by_file {
            let Some(original) = ctx.file_contents.get(&file_id) else {
                continue;
            };
            let mut content = original.clone();

            file_edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
            for (span, edit) in file_edits {
                content.splice(span.start..span.end, edit.text.bytes());
            }

            modified_files.insert(file_id, content);
        }

        ApplyResult::Success { modified_files }
    }
}

// ============================================================================
// Patch Materialization
// ============================================================================

/// A single edit as it appears in output (for JSON serialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEdit {
    /// Workspace-relative file path.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Original text (for verification).
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    /// 1-indexed line number (for display).
    pub line: u32,
    /// 1-indexed column (for display).
    pub col: u32,
}

/// Materialized patch output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedPatch {
    /// Individual edits (ordered by file, then span.start).
    pub edits: Vec<OutputEdit>,
    /// Unified diff, one hunk per edit.
    pub unified_diff: String,
}

impl PatchSet {
    /// Materialize this PatchSet to output format.
    ///
    /// Requires file contents to compute old_text and line/col positions.
    pub fn materialize(&self, file_contents: &HashMap<FileId, Vec<u8>>) -> MaterializedPatch {
        let mut sorted = self.clone();
        sorted.sort_edits();

        let edits: Vec<OutputEdit> = sorted
            .edits
            .iter()
            .map(|edit| {
                let file = self
                    .file_paths
                    .get(&edit.file_id)
                    .cloned()
                    .unwrap_or_else(|| edit.file_id.to_string());
                let span = edit.span();
                let (old_text, line, col) = match file_contents.get(&edit.file_id) {
                    Some(content) if span.end <= content.len() => {
                        let (line, col) = byte_offset_to_position(content, span.start);
                        (
                            String::from_utf8_lossy(&content[span.start..span.end]).into_owned(),
                            line,
                            col,
                        )
                    }
                    _ => (String::new(), 1, 1),
                };
                OutputEdit {
                    file,
                    span,
                    old_text,
                    new_text: edit.text.clone(),
                    line,
                    col,
                }
            })
            .collect();

        let unified_diff = crate::diff::generate_unified_diff(&edits);
        MaterializedPatch {
            edits,
            unified_diff,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

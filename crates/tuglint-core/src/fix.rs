//! Code-fix protocol and fix-all application.
//!
//! A fixer turns one finding into a [`RewritePlan`] against the *current*
//! document, re-validating everything the finding claimed. Plans become
//! hash-anchored edits in a [`PatchSet`] which is applied all-or-nothing.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cancel::{CancellationToken, Cancelled};
use crate::diagnostic::Finding;
use crate::patch::{
    Anchor, ApplyContext, ApplyResult, Conflict, ContentHash, Edit, EditLabels, FileId, PatchSet,
    Precondition, Span,
};
use crate::semantic::SemanticDocument;

// ============================================================================
// Errors
// ============================================================================

/// Why a fix could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    /// The document no longer contains what the finding described.
    #[error("fix not applicable: {reason}")]
    NotApplicable { reason: String },

    /// The finding's span does not locate a node in the document.
    #[error("malformed span {span}")]
    MalformedSpan { span: Span },

    #[error("cancelled")]
    Cancelled,
}

impl FixError {
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        FixError::NotApplicable {
            reason: reason.into(),
        }
    }
}

impl From<Cancelled> for FixError {
    fn from(_: Cancelled) -> Self {
        FixError::Cancelled
    }
}

// ============================================================================
// RewritePlan
// ============================================================================

/// A single replacement computed for one finding.
///
/// `span` is the replaced range; `full_span` extends it by the node's
/// leading and trailing trivia, which are recorded and left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewritePlan {
    pub rule_id: String,
    pub title: String,
    pub file_id: FileId,
    pub span: Span,
    pub full_span: Span,
    pub replacement: String,
    pub leading_trivia: String,
    pub trailing_trivia: String,
    /// Hash of the bytes at `span` when the plan was built.
    pub expected_hash: ContentHash,
}

impl RewritePlan {
    /// The anchored edit that commits this plan.
    pub fn to_edit(&self, id: u32) -> Edit {
        let anchor = Anchor::SpanExact {
            span: self.span,
            expected_before_hash: self.expected_hash.clone(),
        };
        Edit::replace(id, self.file_id, anchor, self.replacement.clone()).with_labels(EditLabels {
            rule_id: Some(self.rule_id.clone()),
            reason: Some(self.title.clone()),
        })
    }

    /// The text of `full_span` after the rewrite.
    pub fn rewritten_full_text(&self) -> String {
        format!(
            "{}{}{}",
            self.leading_trivia, self.replacement, self.trailing_trivia
        )
    }
}

// ============================================================================
// CodeFix Protocol
// ============================================================================

/// A fixer for one or more rules.
pub trait CodeFix: Send + Sync {
    fn fixable_rule_ids(&self) -> &[&'static str];

    /// Compute a plan for `finding` against the current `document`.
    fn rewrite(
        &self,
        document: &dyn SemanticDocument,
        finding: &Finding,
        cancel: &CancellationToken,
    ) -> Result<RewritePlan, FixError>;
}

/// A finding whose fix was not produced or was dropped.
#[derive(Debug, Clone)]
pub struct SkippedFix {
    pub finding: Finding,
    pub error: FixError,
}

/// Result of planning fixes for one document.
#[derive(Debug, Clone, Default)]
pub struct FixAllOutcome {
    /// Accepted plans, in span order.
    pub plans: Vec<RewritePlan>,
    pub skipped: Vec<SkippedFix>,
    /// Patch holding one edit per accepted plan.
    pub patch: PatchSet,
}

/// Plan fixes for every finding of one document.
///
/// Findings without a fixer are ignored. Fixers that fail are recorded in
/// `skipped`. A plan overlapping an earlier accepted plan is skipped too, so
/// the resulting patch never conflicts with itself.
pub fn fix_all(
    document: &dyn SemanticDocument,
    findings: &[Finding],
    fixers: &[&dyn CodeFix],
    cancel: &CancellationToken,
) -> Result<FixAllOutcome, Cancelled> {
    let mut outcome = FixAllOutcome::default();

    for finding in findings {
        cancel.check()?;
        let Some(fixer) = fixers
            .iter()
            .find(|f| f.fixable_rule_ids().contains(&finding.rule_id.as_str()))
        else {
            continue;
        };
        match fixer.rewrite(document, finding, cancel) {
            Ok(plan) => outcome.plans.push(plan),
            Err(FixError::Cancelled) => return Err(Cancelled),
            Err(error) => {
                warn!(location = %finding.location, %error, "fix skipped");
                outcome.skipped.push(SkippedFix {
                    finding: finding.clone(),
                    error,
                });
            }
        }
    }

    outcome.plans.sort_by_key(|p| (p.span.start, p.span.end));
    let mut accepted: Vec<RewritePlan> = Vec::with_capacity(outcome.plans.len());
    for plan in std::mem::take(&mut outcome.plans) {
        if let Some(prev) = accepted.last() {
            if prev.span.overlaps(&plan.span) {
                let finding = findings
                    .iter()
                    .find(|f| f.span == plan.span)
                    .cloned();
                if let Some(finding) = finding {
                    outcome.skipped.push(SkippedFix {
                        finding,
                        error: FixError::not_applicable("overlaps another fix"),
                    });
                }
                continue;
            }
        }
        accepted.push(plan);
    }

    let file_id = document.file_id();
    let mut patch = PatchSet::new()
        .with_file_path(file_id, document.path())
        .with_precondition(Precondition::FileHashMatches {
            file_id,
            content_hash: ContentHash::compute(document.text().as_bytes()),
        })
        .with_precondition(Precondition::NoOverlaps);
    for (id, plan) in accepted.iter().enumerate() {
        patch = patch.with_edit(plan.to_edit(id as u32));
    }
    patch.sort_edits();

    debug!(
        path = document.path(),
        plans = accepted.len(),
        skipped = outcome.skipped.len(),
        "planned fixes"
    );
    outcome.plans = accepted;
    outcome.patch = patch;
    Ok(outcome)
}

/// Apply a single-document patch to `text`, returning the new text.
pub fn apply_to_text(patch: &PatchSet, file_id: FileId, text: &str) -> Result<String, Vec<Conflict>> {
    let ctx = ApplyContext::default().with_file(file_id, text);
    match patch.apply(&ctx) {
        ApplyResult::Success { mut modified_files } => {
            let bytes = modified_files
                .remove(&file_id)
                .unwrap_or_else(|| text.as_bytes().to_vec());
            String::from_utf8(bytes).map_err(|_| {
                vec![Conflict::PreconditionFailed {
                    precondition: Precondition::NoOverlaps,
                    reason: "edit produced invalid UTF-8".to_string(),
                }]
            })
        }
        ApplyResult::Failed { conflicts } => Err(conflicts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(text: &str, span: Span, replacement: &str) -> RewritePlan {
        RewritePlan {
            rule_id: "T0001".to_string(),
            title: "Replace".to_string(),
            file_id: FileId::new(0),
            span,
            full_span: span,
            replacement: replacement.to_string(),
            leading_trivia: String::new(),
            trailing_trivia: String::new(),
            expected_hash: ContentHash::compute(&text.as_bytes()[span.start..span.end]),
        }
    }

    #[test]
    fn to_edit_carries_labels_and_anchor() {
        let p = plan("a.b.c", Span::new(0, 3), "x");
        let edit = p.to_edit(4);
        assert_eq!(edit.id, 4);
        assert_eq!(edit.span(), Span::new(0, 3));
        assert_eq!(edit.labels.rule_id.as_deref(), Some("T0001"));
        assert_eq!(edit.text, "x");
    }

    #[test]
    fn apply_to_text_uses_anchors() {
        let text = "var a = A.B; var b = A.B;";
        let patch = PatchSet::new()
            .with_precondition(Precondition::NoOverlaps)
            .with_edit(plan(text, Span::new(8, 11), "Z").to_edit(0))
            .with_edit(plan(text, Span::new(21, 24), "Z").to_edit(1));
        assert_eq!(
            apply_to_text(&patch, FileId::new(0), text).as_deref(),
            Ok("var a = Z; var b = Z;")
        );
    }

    #[test]
    fn stale_plan_does_not_apply() {
        let original = "var a = A.B;";
        let edited = "var a = A.C;";
        let patch = PatchSet::new().with_edit(plan(original, Span::new(8, 11), "Z").to_edit(0));
        match apply_to_text(&patch, FileId::new(0), edited) {
            Err(conflicts) => assert!(matches!(
                conflicts.as_slice(),
                [Conflict::AnchorHashMismatch { .. }]
            )),
            Ok(text) => panic!("stale plan applied: {}", text),
        }
    }

    #[test]
    fn rewritten_full_text_keeps_trivia() {
        let mut p = plan("  a.b // c\n", Span::new(2, 5), "x");
        p.full_span = Span::new(0, 11);
        p.leading_trivia = "  ".to_string();
        p.trailing_trivia = " // c\n".to_string();
        assert_eq!(p.rewritten_full_text(), "  x // c\n");
    }

    #[test]
    fn fix_error_display() {
        assert_eq!(
            FixError::MalformedSpan {
                span: Span::new(3, 9)
            }
            .to_string(),
            "malformed span [3, 9)"
        );
        assert_eq!(
            FixError::not_applicable("symbol changed").to_string(),
            "fix not applicable: symbol changed"
        );
    }
}

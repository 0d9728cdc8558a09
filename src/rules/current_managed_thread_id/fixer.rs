// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Code fix: replace the chain with `Environment.CurrentManagedThreadId`.

use tracing::trace;
use tuglint_core::cancel::CancellationToken;
use tuglint_core::diagnostic::Finding;
use tuglint_core::fix::{CodeFix, FixError, RewritePlan};
use tuglint_core::patch::ContentHash;
use tuglint_core::semantic::SemanticDocument;

use super::matcher::match_operation;
use super::resolver::{resolve, CURRENT_MANAGED_THREAD_ID};
use super::{fix_title, RULE_ID};

#[derive(Debug, Default)]
pub struct CurrentManagedThreadIdFix;

impl CodeFix for CurrentManagedThreadIdFix {
    fn fixable_rule_ids(&self) -> &[&'static str] {
        &[RULE_ID]
    }

    fn rewrite(
        &self,
        document: &dyn SemanticDocument,
        finding: &Finding,
        cancel: &CancellationToken,
    ) -> Result<RewritePlan, FixError> {
        cancel.check()?;
        let text = document.text();
        let malformed = FixError::MalformedSpan { span: finding.span };
        if finding.span.end > text.len() || finding.span.is_empty() {
            return Err(malformed);
        }
        let node = document.find_node(finding.span).ok_or(malformed.clone())?;
        let span = document.node_span(node).ok_or(malformed.clone())?;
        let full_span = document.node_full_span(node).ok_or(malformed)?;

        let compilation = document.compilation();
        let symbols =
            resolve(compilation).ok_or_else(|| FixError::not_applicable("thread id symbols unavailable"))?;

        cancel.check()?;
        let operation = document
            .operation(node)
            .ok_or_else(|| FixError::not_applicable("node is not a bound expression"))?;
        match_operation(&symbols, &operation)
            .ok_or_else(|| FixError::not_applicable("expression no longer matches"))?;

        let type_name = document
            .minimal_type_name(symbols.replacement.environment, span.start)
            .ok_or_else(|| FixError::not_applicable("Environment cannot be named here"))?;
        let member = compilation
            .symbol_name(symbols.replacement.current_managed_thread_id)
            .unwrap_or(CURRENT_MANAGED_THREAD_ID);
        let replacement = format!("{}.{}", type_name, member);
        trace!(path = document.path(), %span, %replacement, "planned rewrite");

        let slice = |start: usize, end: usize| text.get(start..end).unwrap_or_default().to_string();
        Ok(RewritePlan {
            rule_id: RULE_ID.to_string(),
            title: fix_title(),
            file_id: document.file_id(),
            span,
            full_span,
            leading_trivia: slice(full_span.start, span.start),
            trailing_trivia: slice(span.end, full_span.end),
            expected_hash: ContentHash::compute(text.get(span.start..span.end).unwrap_or_default().as_bytes()),
            replacement,
        })
    }
}

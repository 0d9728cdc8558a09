// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! CA1839: use `Environment.CurrentManagedThreadId` instead of
//! `Thread.CurrentThread.ManagedThreadId`.
//!
//! The rule starts once per compilation by resolving its well-known
//! symbols ([`resolver`]). When they are present it registers for property
//! references and reports each two-level chain ([`matcher`]). The fix
//! ([`fixer`]) re-validates the finding against the current document and
//! replaces the chain with the shortest name for `Environment` that binds
//! at that position.

pub mod fixer;
pub mod matcher;
pub mod resolver;

use std::sync::Arc;

use tuglint_core::diagnostic::{format_message, Finding, RuleDescriptor, Severity};
use tuglint_core::driver::{OperationAnalyzer, OperationContext, Rule};
use tuglint_core::semantic::{Compilation, Operation, OperationKind, SemanticDocument};
use tuglint_core::types::Location;

pub use fixer::CurrentManagedThreadIdFix;
pub use matcher::{match_operation, MatchResult};
pub use resolver::{resolve, ResolvedSymbols};

pub const RULE_ID: &str = "CA1839";

/// The expression the rule recommends.
pub const REPLACEMENT_LABEL: &str = "Environment.CurrentManagedThreadId";

/// The expression the rule flags.
pub const FLAGGED_LABEL: &str = "Thread.CurrentThread.ManagedThreadId";

const FIX_TITLE_FORMAT: &str = "Use '{0}'";

pub static DESCRIPTOR: RuleDescriptor = RuleDescriptor {
    id: RULE_ID,
    title: "Use 'Environment.CurrentManagedThreadId'",
    message_format: "Use '{0}' instead of '{1}'",
    category: "Performance",
    default_severity: Severity::Suggestion,
    fixable: true,
};

/// Title of the code fix.
pub fn fix_title() -> String {
    format_message(FIX_TITLE_FORMAT, &[REPLACEMENT_LABEL])
}

/// Turn a match into a finding. The message uses the fixed labels, not the
/// matched text.
pub fn emit(matched: &MatchResult, document: &dyn SemanticDocument, severity: Severity) -> Finding {
    Finding {
        rule_id: matched.rule_id.to_string(),
        severity,
        message: format_message(DESCRIPTOR.message_format, &[REPLACEMENT_LABEL, FLAGGED_LABEL]),
        file_id: document.file_id(),
        span: matched.span,
        location: Location::from_span(document.path(), document.line_index(), matched.span),
    }
}

/// The CA1839 rule.
#[derive(Debug, Default)]
pub struct CurrentManagedThreadIdRule;

impl Rule for CurrentManagedThreadIdRule {
    fn descriptor(&self) -> &'static RuleDescriptor {
        &DESCRIPTOR
    }

    fn on_compilation_start(&self, compilation: &dyn Compilation) -> Option<Arc<dyn OperationAnalyzer>> {
        let symbols = resolve(compilation)?;
        Some(Arc::new(ThreadIdAnalyzer { symbols }))
    }
}

struct ThreadIdAnalyzer {
    symbols: ResolvedSymbols,
}

impl OperationAnalyzer for ThreadIdAnalyzer {
    fn operation_kinds(&self) -> &[OperationKind] {
        &[OperationKind::PropertyReference]
    }

    fn analyze(&self, operation: &Operation, ctx: &mut OperationContext<'_>) {
        if let Some(matched) = match_operation(&self.symbols, operation) {
            let finding = emit(&matched, ctx.document(), ctx.severity());
            ctx.report(finding);
        }
    }
}

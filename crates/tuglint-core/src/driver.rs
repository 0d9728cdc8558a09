//! Analyzer driver: runs registered rules over bound documents.
//!
//! A rule is started once per compilation. Starting may decline (the
//! well-known symbols a rule needs are missing), in which case the rule is
//! inert for every document of that compilation. Otherwise the rule hands
//! back an [`OperationAnalyzer`] that the driver feeds every operation of the
//! kinds it registered for.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::cancel::{CancellationToken, Cancelled};
use crate::diagnostic::{Finding, RuleDescriptor, Severity};
use crate::semantic::{
    walk_operation, Compilation, CompilationId, Operation, OperationKind, SemanticDocument,
    VisitResult,
};

// ============================================================================
// Rule Protocol
// ============================================================================

/// A registered analysis rule.
pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &'static RuleDescriptor;

    /// Prepare per-compilation state. `None` makes the rule inert for the
    /// whole compilation.
    fn on_compilation_start(
        &self,
        compilation: &dyn Compilation,
    ) -> Option<Arc<dyn OperationAnalyzer>>;
}

/// Per-compilation analyzer produced by [`Rule::on_compilation_start`].
pub trait OperationAnalyzer: Send + Sync {
    /// Operation kinds this analyzer wants to see.
    fn operation_kinds(&self) -> &[OperationKind];

    fn analyze(&self, operation: &Operation, ctx: &mut OperationContext<'_>);
}

/// What an analyzer sees while inspecting one operation.
pub struct OperationContext<'a> {
    document: &'a dyn SemanticDocument,
    descriptor: &'static RuleDescriptor,
    severity: Severity,
    findings: Vec<Finding>,
}

impl<'a> OperationContext<'a> {
    pub fn document(&self) -> &'a dyn SemanticDocument {
        self.document
    }

    pub fn descriptor(&self) -> &'static RuleDescriptor {
        self.descriptor
    }

    /// Severity after configuration overrides.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn report(&mut self, finding: Finding) {
        trace!(rule = %finding.rule_id, location = %finding.location, "finding");
        self.findings.push(finding);
    }
}

// ============================================================================
// AnalyzerDriver
// ============================================================================

type StartedRule = Option<Arc<dyn OperationAnalyzer>>;

/// Runs rules over documents, caching per-compilation rule state.
///
/// The driver is `Sync`; documents of one compilation may be analysed from
/// several threads at once. The compilation cache is read-mostly and each
/// rule is started at most once per compilation.
pub struct AnalyzerDriver {
    rules: Vec<Arc<dyn Rule>>,
    severity_overrides: HashMap<String, Severity>,
    analyze_generated: bool,
    started: DashMap<(CompilationId, &'static str), StartedRule>,
}

impl AnalyzerDriver {
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        AnalyzerDriver {
            rules,
            severity_overrides: HashMap::new(),
            analyze_generated: false,
            started: DashMap::new(),
        }
    }

    /// Override the severity of one rule. `Severity::None` disables it.
    pub fn with_severity(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    /// Whether documents flagged as generated code are analysed.
    pub fn with_generated_code(mut self, analyze: bool) -> Self {
        self.analyze_generated = analyze;
        self
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn effective_severity(&self, descriptor: &RuleDescriptor) -> Severity {
        self.severity_overrides
            .get(descriptor.id)
            .copied()
            .unwrap_or(descriptor.default_severity)
    }

    /// Whether `rule_id` was started for `compilation` and is active there.
    pub fn is_active(&self, compilation: CompilationId, rule_id: &str) -> Option<bool> {
        self.started
            .iter()
            .find(|entry| entry.key().0 == compilation && entry.key().1 == rule_id)
            .map(|entry| entry.value().is_some())
    }

    fn start_rule(&self, rule: &Arc<dyn Rule>, compilation: &dyn Compilation) -> StartedRule {
        let key = (compilation.id(), rule.descriptor().id);
        if let Some(started) = self.started.get(&key) {
            return started.value().clone();
        }
        self.started
            .entry(key)
            .or_insert_with(|| {
                let started = rule.on_compilation_start(compilation);
                if started.is_none() {
                    debug!(
                        rule = rule.descriptor().id,
                        compilation = compilation.id().0,
                        "rule inert for compilation"
                    );
                }
                started
            })
            .value()
            .clone()
    }

    /// Analyse one document with every enabled rule.
    ///
    /// Findings are returned in span order. Cancellation is checked between
    /// operation visits.
    pub fn analyze_document(
        &self,
        document: &dyn SemanticDocument,
        cancel: &CancellationToken,
    ) -> Result<Vec<Finding>, Cancelled> {
        cancel.check()?;
        if document.is_generated() && !self.analyze_generated {
            debug!(path = document.path(), "skipping generated code");
            return Ok(Vec::new());
        }

        let compilation = document.compilation();
        let mut findings = Vec::new();

        for rule in &self.rules {
            let descriptor = rule.descriptor();
            let severity = self.effective_severity(descriptor);
            if !severity.is_enabled() {
                continue;
            }
            let Some(analyzer) = self.start_rule(rule, compilation) else {
                continue;
            };

            let kinds = analyzer.operation_kinds();
            let mut ctx = OperationContext {
                document,
                descriptor,
                severity,
                findings: Vec::new(),
            };
            let mut cancelled = false;
            for root in document.operations() {
                let result = walk_operation(root, &mut |op| {
                    if cancel.is_cancelled() {
                        cancelled = true;
                        return VisitResult::Stop;
                    }
                    if kinds.contains(&op.kind()) {
                        analyzer.analyze(op, &mut ctx);
                    }
                    VisitResult::Continue
                });
                if result == VisitResult::Stop {
                    break;
                }
            }
            if cancelled {
                return Err(Cancelled);
            }
            findings.append(&mut ctx.findings);
        }

        findings.sort_by(|a, b| {
            (a.span.start, a.span.end, &a.rule_id).cmp(&(b.span.start, b.span.end, &b.rule_id))
        });
        debug!(
            path = document.path(),
            findings = findings.len(),
            "analysed document"
        );
        Ok(findings)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{FileId, Span};
    use crate::semantic::{NodeId, OperationData, SymbolId, SymbolKind, SymbolRef};
    use crate::text::LineIndex;
    use crate::types::Location;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeCompilation {
        id: CompilationId,
    }

    impl Compilation for FakeCompilation {
        fn id(&self) -> CompilationId {
            self.id
        }
        fn type_by_metadata_name(&self, _: &str) -> Option<SymbolRef> {
            None
        }
        fn members(&self, _: SymbolRef) -> Vec<SymbolRef> {
            Vec::new()
        }
        fn symbol_name(&self, _: SymbolRef) -> Option<&str> {
            None
        }
        fn symbol_kind(&self, _: SymbolRef) -> Option<SymbolKind> {
            None
        }
        fn symbol_display(&self, s: SymbolRef) -> String {
            s.to_string()
        }
    }

    struct FakeDocument {
        compilation: FakeCompilation,
        text: String,
        index: LineIndex,
        roots: Vec<Operation>,
        generated: bool,
    }

    impl FakeDocument {
        fn new(compilation: u64, literals: usize, generated: bool) -> Self {
            let text = "x".repeat(literals);
            let roots = (0..literals)
                .map(|i| Operation {
                    syntax: NodeId(i as u32),
                    span: Span::new(i, i + 1),
                    ty: None,
                    data: OperationData::Literal,
                })
                .rev()
                .collect();
            FakeDocument {
                compilation: FakeCompilation {
                    id: CompilationId(compilation),
                },
                index: LineIndex::new(&text),
                text,
                roots,
                generated,
            }
        }
    }

    impl SemanticDocument for FakeDocument {
        fn file_id(&self) -> FileId {
            FileId::new(0)
        }
        fn path(&self) -> &str {
            "fake.cs"
        }
        fn text(&self) -> &str {
            &self.text
        }
        fn line_index(&self) -> &LineIndex {
            &self.index
        }
        fn compilation(&self) -> &dyn Compilation {
            &self.compilation
        }
        fn operations(&self) -> &[Operation] {
            &self.roots
        }
        fn find_node(&self, _: Span) -> Option<NodeId> {
            None
        }
        fn node_span(&self, _: NodeId) -> Option<Span> {
            None
        }
        fn node_full_span(&self, _: NodeId) -> Option<Span> {
            None
        }
        fn minimal_type_name(&self, _: SymbolRef, _: usize) -> Option<String> {
            None
        }
        fn is_generated(&self) -> bool {
            self.generated
        }
    }

    static LITERAL_RULE: RuleDescriptor = RuleDescriptor {
        id: "T0001",
        title: "literal",
        message_format: "literal",
        category: "Test",
        default_severity: Severity::Warning,
        fixable: false,
    };

    /// Reports every literal; inert for compilation 0.
    struct LiteralRule {
        starts: AtomicUsize,
    }

    struct LiteralAnalyzer {
        cancel_after_first: Option<CancellationToken>,
    }

    impl Rule for LiteralRule {
        fn descriptor(&self) -> &'static RuleDescriptor {
            &LITERAL_RULE
        }

        fn on_compilation_start(
            &self,
            compilation: &dyn Compilation,
        ) -> Option<Arc<dyn OperationAnalyzer>> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if compilation.id() == CompilationId(0) {
                return None;
            }
            Some(Arc::new(LiteralAnalyzer {
                cancel_after_first: None,
            }))
        }
    }

    impl OperationAnalyzer for LiteralAnalyzer {
        fn operation_kinds(&self) -> &[OperationKind] {
            &[OperationKind::Literal]
        }

        fn analyze(&self, operation: &Operation, ctx: &mut OperationContext<'_>) {
            let doc = ctx.document();
            ctx.report(Finding {
                rule_id: ctx.descriptor().id.to_string(),
                severity: ctx.severity(),
                message: ctx.descriptor().message_format.to_string(),
                file_id: doc.file_id(),
                span: operation.span,
                location: Location::from_span(doc.path(), doc.line_index(), operation.span),
            });
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
        }
    }

    fn driver() -> (Arc<LiteralRule>, AnalyzerDriver) {
        let rule = Arc::new(LiteralRule {
            starts: AtomicUsize::new(0),
        });
        let driver = AnalyzerDriver::new(vec![rule.clone() as Arc<dyn Rule>]);
        (rule, driver)
    }

    mod dispatch_tests {
        use super::*;

        #[test]
        fn findings_are_sorted_by_span() {
            let (_, driver) = driver();
            let findings = driver
                .analyze_document(&FakeDocument::new(1, 3, false), &CancellationToken::new())
                .unwrap_or_default();
            let starts: Vec<_> = findings.iter().map(|f| f.span.start).collect();
            assert_eq!(starts, vec![0, 1, 2]);
            assert!(findings.iter().all(|f| f.severity == Severity::Warning));
        }

        #[test]
        fn rule_starts_once_per_compilation() {
            let (rule, driver) = driver();
            let cancel = CancellationToken::new();
            for _ in 0..3 {
                driver
                    .analyze_document(&FakeDocument::new(1, 1, false), &cancel)
                    .ok();
            }
            driver
                .analyze_document(&FakeDocument::new(2, 1, false), &cancel)
                .ok();
            assert_eq!(rule.starts.load(Ordering::SeqCst), 2);
            assert_eq!(driver.is_active(CompilationId(1), "T0001"), Some(true));
        }

        #[test]
        fn inert_rule_reports_nothing() {
            let (_, driver) = driver();
            let findings = driver
                .analyze_document(&FakeDocument::new(0, 4, false), &CancellationToken::new())
                .unwrap_or_default();
            assert!(findings.is_empty());
            assert_eq!(driver.is_active(CompilationId(0), "T0001"), Some(false));
        }
    }

    mod configuration_tests {
        use super::*;

        #[test]
        fn severity_override_applies() {
            let (_, driver) = driver();
            let driver = driver.with_severity("T0001", Severity::Error);
            let findings = driver
                .analyze_document(&FakeDocument::new(1, 1, false), &CancellationToken::new())
                .unwrap_or_default();
            assert_eq!(findings[0].severity, Severity::Error);
        }

        #[test]
        fn severity_none_disables_rule() {
            let (rule, driver) = driver();
            let driver = driver.with_severity("T0001", Severity::None);
            let findings = driver
                .analyze_document(&FakeDocument::new(1, 2, false), &CancellationToken::new())
                .unwrap_or_default();
            assert!(findings.is_empty());
            assert_eq!(rule.starts.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn generated_code_skipped_unless_enabled() {
            let (_, driver) = driver();
            let doc = FakeDocument::new(1, 2, true);
            let cancel = CancellationToken::new();
            assert!(driver
                .analyze_document(&doc, &cancel)
                .unwrap_or_default()
                .is_empty());
            let driver = driver.with_generated_code(true);
            assert_eq!(driver.analyze_document(&doc, &cancel).map(|f| f.len()), Ok(2));
        }
    }

    mod cancellation_tests {
        use super::*;

        struct CancellingRule {
            token: CancellationToken,
        }

        impl Rule for CancellingRule {
            fn descriptor(&self) -> &'static RuleDescriptor {
                &LITERAL_RULE
            }

            fn on_compilation_start(&self, _: &dyn Compilation) -> Option<Arc<dyn OperationAnalyzer>> {
                Some(Arc::new(LiteralAnalyzer {
                    cancel_after_first: Some(self.token.clone()),
                }))
            }
        }

        #[test]
        fn pre_cancelled_token_returns_cancelled() {
            let (_, driver) = driver();
            let cancel = CancellationToken::new();
            cancel.cancel();
            assert_eq!(
                driver.analyze_document(&FakeDocument::new(1, 1, false), &cancel),
                Err(Cancelled)
            );
        }

        #[test]
        fn cancellation_between_visits_discards_findings() {
            let token = CancellationToken::new();
            let rule: Arc<dyn Rule> = Arc::new(CancellingRule {
                token: token.clone(),
            });
            let driver = AnalyzerDriver::new(vec![rule]);
            assert_eq!(
                driver.analyze_document(&FakeDocument::new(1, 5, false), &token),
                Err(Cancelled)
            );
        }
    }
}

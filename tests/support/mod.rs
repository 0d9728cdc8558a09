//! Shared test support utilities.
//!
//! Builds compilations from inline C# sources, runs the registered rules,
//! and applies fixes. Expected finding spans are written inline with
//! `[|` and `|]` markers.

#![allow(dead_code)]

use tuglint::cancel::CancellationToken;
use tuglint::csharp::{CSharpDocument, CompilationBuilder, MetadataReference, Project};
use tuglint::diagnostic::Finding;
use tuglint::driver::AnalyzerDriver;
use tuglint::fix::{apply_to_text, fix_all, CodeFix, FixAllOutcome};
use tuglint::patch::Span;
use tuglint::rules::{all_fixers, all_rules};
use tuglint::semantic::SemanticDocument;

/// Strip `[|`/`|]` markers, returning the plain text and the marked spans.
pub fn parse_markup(markup: &str) -> (String, Vec<Span>) {
    let mut text = String::with_capacity(markup.len());
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut rest = markup;
    loop {
        let next_open = rest.find("[|");
        let next_close = rest.find("|]");
        let (index, is_open) = match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => (o, true),
            (_, Some(c)) => (c, false),
            (Some(o), None) => (o, true),
            (None, None) => break,
        };
        text.push_str(&rest[..index]);
        if is_open {
            assert!(open.is_none(), "nested [| markers are not supported");
            open = Some(text.len());
        } else {
            let start = open.take().expect("|] without [|");
            spans.push(Span::new(start, text.len()));
        }
        rest = &rest[index + 2..];
    }
    assert!(open.is_none(), "unclosed [| marker");
    text.push_str(rest);
    (text, spans)
}

/// Build a project over `sources` plus the bundled core library.
pub fn project(sources: &[&str]) -> Project {
    project_with(sources, true)
}

pub fn project_with(sources: &[&str], core_library: bool) -> Project {
    let mut builder = CompilationBuilder::new();
    for (index, source) in sources.iter().enumerate() {
        builder
            .add_source(format!("Test{}.cs", index), source, false)
            .unwrap_or_else(|err| panic!("{}", err.render(false)));
    }
    if core_library {
        builder.add_reference(MetadataReference::core_library().expect("core library parses"));
    }
    builder.build()
}

pub fn driver() -> AnalyzerDriver {
    AnalyzerDriver::new(all_rules())
}

pub fn analyze(document: &CSharpDocument) -> Vec<Finding> {
    analyze_with(&driver(), document)
}

pub fn analyze_with(driver: &AnalyzerDriver, document: &CSharpDocument) -> Vec<Finding> {
    driver
        .analyze_document(document, &CancellationToken::new())
        .expect("not cancelled")
}

/// Findings for a single source.
pub fn findings(source: &str) -> Vec<Finding> {
    let project = project(&[source]);
    analyze(&project.documents[0])
}

/// Plan fixes for every finding of `document`.
pub fn plan_fixes(document: &CSharpDocument, findings: &[Finding]) -> FixAllOutcome {
    let fixers = all_fixers();
    let fixers: Vec<&dyn CodeFix> = fixers.iter().map(|f| f.as_ref()).collect();
    fix_all(document, findings, &fixers, &CancellationToken::new()).expect("not cancelled")
}

/// Analyse and fix a single source, returning the fixed text.
pub fn fix_source(source: &str) -> String {
    let project = project(&[source]);
    let document = &project.documents[0];
    let findings = analyze(document);
    let outcome = plan_fixes(document, &findings);
    assert!(outcome.skipped.is_empty(), "skipped fixes: {:?}", outcome.skipped);
    apply_to_text(&outcome.patch, document.file_id(), document.text()).expect("patch applies")
}

/// Check that the marked spans are exactly the findings, then that fixing
/// gives `expected` and leaves nothing to report.
pub fn verify_fix(markup: &str, expected: &str) {
    let (source, spans) = parse_markup(markup);
    let found: Vec<Span> = findings(&source).iter().map(|f| f.span).collect();
    assert_eq!(found, spans, "finding spans differ from markup");
    let fixed = fix_source(&source);
    assert_eq!(fixed, expected);
    assert!(findings(&fixed).is_empty(), "fix is not a fixed point");
}

/// Check that the source has no findings.
pub fn verify_no_findings(source: &str) {
    let found = findings(source);
    assert!(found.is_empty(), "unexpected findings: {:?}", found);
}

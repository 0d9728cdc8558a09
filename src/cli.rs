// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Command implementations behind the `tuglint` binary.
//!
//! Each command collects `.cs` sources, builds one compilation over all of
//! them plus the configured metadata references, and runs the registered
//! rules. Parsing and analysis run in parallel per document; fixes are
//! planned per document and applied all-or-nothing. A file that does not
//! parse is reported and left out of the compilation.
//!
//! All functions return `Result<T, LintError>`; the binary renders errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use tuglint_core::cancel::{CancellationToken, Cancelled};
use tuglint_core::diagnostic::Finding;
use tuglint_core::diff::generate_unified_diff;
use tuglint_core::driver::AnalyzerDriver;
use tuglint_core::error::LintError;
use tuglint_core::fix::{apply_to_text, fix_all, CodeFix};
use tuglint_core::output::{
    CheckResponse, FixResponse, Patch, RuleInfo, RulesResponse, SkippedFileInfo, SkippedFixInfo,
};
use tuglint_core::semantic::SemanticDocument;
use tuglint_csharp::{parse, CompilationBuilder, MetadataReference, ParseError, Project, ReferenceError};

use crate::config::{is_generated, Config, SourceFilter};
use crate::rules::{all_fixers, all_rules};

// ============================================================================
// Sources
// ============================================================================

/// A source file read from disk.
#[derive(Debug, Clone)]
pub struct SourceInput {
    /// Path as reported in output.
    pub display_path: String,
    /// Path the file is read from and written back to.
    pub disk_path: PathBuf,
    pub text: String,
    pub generated: bool,
}

/// Collect `.cs` files from `paths`. Directories are walked; explicit files
/// are taken as given. The result is sorted by display path.
pub fn collect_sources(paths: &[PathBuf], filter: &SourceFilter) -> Result<Vec<SourceInput>, LintError> {
    let mut sources = Vec::new();
    for root in paths {
        if root.is_file() {
            sources.push(read_source(root, root.display().to_string())?);
            continue;
        }
        if !root.is_dir() {
            return Err(LintError::file_not_found(root.display().to_string()));
        }
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(%err, "skipping unreadable path");
                    None
                }
            })
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel_path) = path.strip_prefix(root) else {
                continue;
            };
            if !filter.matches(rel_path) {
                continue;
            }
            sources.push(read_source(path, path.display().to_string())?);
        }
    }
    sources.sort_by(|a, b| a.display_path.cmp(&b.display_path));
    sources.dedup_by(|a, b| a.display_path == b.display_path);
    debug!(files = sources.len(), "collected sources");
    Ok(sources)
}

fn read_source(path: &Path, display_path: String) -> Result<SourceInput, LintError> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => LintError::file_not_found(display_path.clone()),
        _ => LintError::from(err),
    })?;
    Ok(SourceInput {
        generated: is_generated(path, &text),
        display_path,
        disk_path: path.to_path_buf(),
        text,
    })
}

// ============================================================================
// Compilation
// ============================================================================

fn parse_failure(err: ParseError) -> LintError {
    warn!("{}", err.render(false));
    err.into()
}

fn reference_failure(err: ReferenceError) -> LintError {
    match err {
        ReferenceError::Io { path, source } => match source.kind() {
            std::io::ErrorKind::NotFound => LintError::file_not_found(path),
            _ => LintError::from(source),
        },
        ReferenceError::Parse(err) => parse_failure(err),
    }
}

/// A compilation over the sources that parsed.
pub struct BuiltProject {
    pub project: Project,
    /// For each document, its index in the collected sources.
    pub source_indexes: Vec<usize>,
    /// Sources left out because they did not parse.
    pub skipped: Vec<SkippedFileInfo>,
}

/// Parse every source in parallel and build one compilation. Sources that
/// do not parse are logged and skipped; references that do not parse fail
/// the build.
pub fn build_project(sources: &[SourceInput], config: &Config) -> Result<BuiltProject, LintError> {
    let trees: Vec<_> = sources
        .par_iter()
        .map(|source| parse(&source.display_path, &source.text))
        .collect();

    let mut builder = CompilationBuilder::new();
    let mut source_indexes = Vec::with_capacity(sources.len());
    let mut skipped = Vec::new();
    for (index, (source, tree)) in sources.iter().zip(trees).enumerate() {
        match tree {
            Ok(tree) => {
                builder.add_tree(source.display_path.clone(), tree, source.generated);
                source_indexes.push(index);
            }
            Err(err) => {
                warn!(file = %source.display_path, "skipping file that does not parse\n{}", err.render(false));
                skipped.push(SkippedFileInfo {
                    file: err.path,
                    line: err.line,
                    col: err.col,
                    message: err.message,
                });
            }
        }
    }
    if config.default_references {
        builder.add_reference(MetadataReference::core_library().map_err(parse_failure)?);
    }
    if !config.references.is_empty() {
        let paths: Vec<&Path> = config.references.iter().map(|p| p.as_path()).collect();
        builder.add_reference(MetadataReference::from_files("user", &paths).map_err(reference_failure)?);
    }
    Ok(BuiltProject {
        project: builder.build(),
        source_indexes,
        skipped,
    })
}

/// A driver over every registered rule, configured from `config`.
pub fn build_driver(config: &Config) -> Result<AnalyzerDriver, LintError> {
    let rules = all_rules();
    let known: Vec<&str> = rules.iter().map(|r| r.descriptor().id).collect();
    let overrides = config.severity_overrides(&known)?;
    let mut driver = AnalyzerDriver::new(rules).with_generated_code(config.analyze_generated_code);
    for (rule_id, severity) in overrides {
        driver = driver.with_severity(rule_id, severity);
    }
    Ok(driver)
}

fn analyze_all(
    project: &Project,
    driver: &AnalyzerDriver,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<Finding>>, Cancelled> {
    project
        .documents
        .par_iter()
        .map(|document| driver.analyze_document(document, cancel))
        .collect()
}

// ============================================================================
// Commands
// ============================================================================

/// Analyse `paths` and report findings.
pub fn run_check(paths: &[PathBuf], config: &Config, cancel: &CancellationToken) -> Result<CheckResponse, LintError> {
    let filter = SourceFilter::new(&config.exclude)?;
    let sources = collect_sources(paths, &filter)?;
    let built = build_project(&sources, config)?;
    let driver = build_driver(config)?;
    let findings: Vec<Finding> = analyze_all(&built.project, &driver, cancel)?.into_iter().flatten().collect();
    let analyzed = built.source_indexes.len();
    info!(
        files = analyzed,
        skipped = built.skipped.len(),
        findings = findings.len(),
        "check complete"
    );
    Ok(CheckResponse::new(analyzed, findings).with_files_skipped(built.skipped))
}

/// Analyse `paths`, fix every finding that has a fix, and write the
/// results back unless `dry_run`.
///
/// Every document's patch is applied in memory first; nothing is written if
/// any of them conflicts.
pub fn run_fix(
    paths: &[PathBuf],
    config: &Config,
    dry_run: bool,
    cancel: &CancellationToken,
) -> Result<FixResponse, LintError> {
    let filter = SourceFilter::new(&config.exclude)?;
    let sources = collect_sources(paths, &filter)?;
    let built = build_project(&sources, config)?;
    let driver = build_driver(config)?;
    let findings = analyze_all(&built.project, &driver, cancel)?;

    let fixers = all_fixers();
    let fixers: Vec<&dyn CodeFix> = fixers.iter().map(|f| f.as_ref()).collect();

    let mut edits = Vec::new();
    let mut skipped = Vec::new();
    let mut rewritten: Vec<(usize, String)> = Vec::new();
    let documents = built.project.documents.iter().zip(&findings);
    for ((document, findings), &index) in documents.zip(&built.source_indexes) {
        if findings.is_empty() {
            continue;
        }
        let outcome = fix_all(document, findings, &fixers, cancel)?;
        skipped.extend(outcome.skipped.iter().map(|s| SkippedFixInfo {
            rule_id: s.finding.rule_id.clone(),
            location: s.finding.location.clone(),
            reason: s.error.to_string(),
        }));
        if !outcome.patch.has_edits() {
            continue;
        }
        let text = apply_to_text(&outcome.patch, document.file_id(), document.text())
            .map_err(|conflicts| LintError::from_conflicts(document.path(), &conflicts))?;
        let contents = HashMap::from([(document.file_id(), document.text().as_bytes().to_vec())]);
        edits.extend(outcome.patch.materialize(&contents).edits);
        rewritten.push((index, text));
    }

    let mut files_written = Vec::new();
    if !dry_run {
        for (index, text) in &rewritten {
            let source = &sources[*index];
            fs::write(&source.disk_path, text).map_err(|err| LintError::ApplyError {
                message: err.to_string(),
                file: Some(source.display_path.clone()),
            })?;
            files_written.push(source.display_path.clone());
        }
    }
    info!(
        fixes = edits.len(),
        skipped = skipped.len(),
        files = rewritten.len(),
        dry_run,
        "fix complete"
    );

    let unified_diff = generate_unified_diff(&edits);
    let patch = Patch { edits, unified_diff };
    Ok(FixResponse::new(dry_run, patch, skipped, files_written).with_files_skipped(built.skipped))
}

/// List the registered rules with their effective severities.
pub fn run_rules(config: &Config) -> Result<RulesResponse, LintError> {
    let driver = build_driver(config)?;
    let rules = driver
        .rules()
        .iter()
        .map(|rule| {
            let descriptor = rule.descriptor();
            RuleInfo::new(descriptor, driver.effective_severity(descriptor))
        })
        .collect();
    Ok(RulesResponse::new(rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuglint_core::diagnostic::Severity;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    const PROGRAM: &str = "using System.Threading;\n\nclass Program\n{\n    int Id() => Thread.CurrentThread.ManagedThreadId;\n}\n";

    mod collection {
        use super::*;

        #[test]
        fn walks_directories_and_filters() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "src/A.cs", "class A { }");
            write(dir.path(), "src/B.txt", "not C#");
            write(dir.path(), "obj/Gen.cs", "class Gen { }");
            write(dir.path(), "src/Api.g.cs", "class Api { }");
            let filter = SourceFilter::new(&[]).unwrap();
            let sources = collect_sources(&[dir.path().to_path_buf()], &filter).unwrap();
            let names: Vec<_> = sources
                .iter()
                .map(|s| s.disk_path.file_name().unwrap().to_string_lossy().to_string())
                .collect();
            assert_eq!(names, vec!["A.cs", "Api.g.cs"]);
            assert!(!sources[0].generated);
            assert!(sources[1].generated);
        }

        #[cfg(unix)]
        #[test]
        fn unreadable_directory_does_not_stop_collection() {
            use std::os::unix::fs::PermissionsExt;

            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "src/A.cs", "class A { }");
            write(dir.path(), "locked/B.cs", "class B { }");
            let locked = dir.path().join("locked");
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

            let filter = SourceFilter::new(&[]).unwrap();
            let result = collect_sources(&[dir.path().to_path_buf()], &filter);
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

            let sources = result.unwrap();
            assert!(sources.iter().any(|s| s.display_path.ends_with("A.cs")));
        }

        #[test]
        fn missing_path_is_file_not_found() {
            let filter = SourceFilter::new(&[]).unwrap();
            let err = collect_sources(&[PathBuf::from("/definitely/not/here")], &filter).unwrap_err();
            assert_eq!(err.error_code().code(), 3);
        }
    }

    mod commands {
        use super::*;

        #[test]
        fn check_reports_findings() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "Program.cs", PROGRAM);
            let response =
                run_check(&[dir.path().to_path_buf()], &Config::default(), &CancellationToken::new()).unwrap();
            assert_eq!(response.files_analyzed, 1);
            assert_eq!(response.findings.len(), 1);
            assert_eq!(response.findings[0].location.line, 5);
            assert_eq!(response.findings[0].location.col, 17);
        }

        #[test]
        fn fix_rewrites_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = write(dir.path(), "Program.cs", PROGRAM);
            let response =
                run_fix(&[dir.path().to_path_buf()], &Config::default(), false, &CancellationToken::new()).unwrap();
            assert_eq!(response.fixes_applied, 1);
            assert_eq!(response.files_written.len(), 1);
            let text = fs::read_to_string(&path).unwrap();
            assert!(text.contains("int Id() => System.Environment.CurrentManagedThreadId;"));
        }

        #[test]
        fn dry_run_leaves_files_alone() {
            let dir = tempfile::tempdir().unwrap();
            let path = write(dir.path(), "Program.cs", PROGRAM);
            let response =
                run_fix(&[dir.path().to_path_buf()], &Config::default(), true, &CancellationToken::new()).unwrap();
            assert_eq!(response.fixes_applied, 1);
            assert!(response.files_written.is_empty());
            assert!(response.patch.unified_diff.contains("+"));
            assert_eq!(fs::read_to_string(&path).unwrap(), PROGRAM);
        }

        #[test]
        fn unparseable_files_are_skipped() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "Bad.cs", "class C { int x = 1 }");
            write(dir.path(), "Program.cs", PROGRAM);
            let response =
                run_check(&[dir.path().to_path_buf()], &Config::default(), &CancellationToken::new()).unwrap();
            assert_eq!(response.files_analyzed, 1);
            assert_eq!(response.findings.len(), 1);
            assert!(response.findings[0].location.file.ends_with("Program.cs"));
            assert_eq!(response.files_skipped.len(), 1);
            assert!(response.files_skipped[0].file.ends_with("Bad.cs"));
            assert_eq!(response.files_skipped[0].message, "expected ';', found '}'");
        }

        #[test]
        fn fix_writes_the_file_that_parsed() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "A.cs", "class {");
            let path = write(dir.path(), "B.cs", PROGRAM);
            let response =
                run_fix(&[dir.path().to_path_buf()], &Config::default(), false, &CancellationToken::new()).unwrap();
            assert_eq!(response.files_skipped.len(), 1);
            assert_eq!(response.files_written.len(), 1);
            assert!(response.files_written[0].ends_with("B.cs"));
            assert!(fs::read_to_string(&path).unwrap().contains("System.Environment.CurrentManagedThreadId"));
            assert_eq!(fs::read_to_string(dir.path().join("A.cs")).unwrap(), "class {");
        }

        #[test]
        fn cancelled_token_stops_the_run() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "Program.cs", PROGRAM);
            let cancel = CancellationToken::new();
            cancel.cancel();
            let err = run_check(&[dir.path().to_path_buf()], &Config::default(), &cancel).unwrap_err();
            assert!(matches!(err, LintError::Cancelled));
        }

        #[test]
        fn rules_lists_effective_severity() {
            let mut config = Config::default();
            config.set_severity("CA1839", Severity::Warning);
            let response = run_rules(&config).unwrap();
            assert_eq!(response.rules.len(), 1);
            assert_eq!(response.rules[0].effective_severity, Severity::Warning);
            assert_eq!(response.rules[0].default_severity, Severity::Suggestion);
        }
    }
}

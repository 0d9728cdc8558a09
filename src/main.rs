// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Binary entry point for the tuglint CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Report findings as JSON
//! tuglint check src/
//!
//! # Preview fixes as a unified diff
//! tuglint --format text fix --dry-run src/
//!
//! # Apply fixes
//! tuglint fix src/
//!
//! # List rules
//! tuglint rules
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tuglint::cancel::CancellationToken;
use tuglint::cli::{run_check, run_fix, run_rules};
use tuglint::config::Config;
use tuglint::diagnostic::Severity;
use tuglint::error::{LintError, OutputErrorCode};
use tuglint::output::{
    emit_response, CheckResponse, ErrorResponse, FixResponse, RulesResponse, SkippedFileInfo,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Semantic lint rules with verified fixes for C# sources.
#[derive(Parser, Debug)]
#[command(name = "tuglint", version, about = "Semantic lint rules with verified fixes")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Config file (default: tuglint.json in the current directory, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extra declaration-only reference source. Can be given multiple times.
    #[arg(long = "reference", global = true)]
    references: Vec<PathBuf>,

    /// Do not add the bundled core library reference.
    #[arg(long, global = true)]
    no_default_references: bool,

    /// Analyze generated code too.
    #[arg(long, global = true)]
    include_generated: bool,

    /// Severity override in format `<rule>=<severity>`, e.g. `CA1839=warning`.
    #[arg(long, global = true, value_parser = parse_severity_override)]
    severity: Vec<(String, Severity)>,
}

/// Parse a severity override in `<rule>=<severity>` format.
fn parse_severity_override(s: &str) -> Result<(String, Severity), String> {
    let Some((rule, severity)) = s.split_once('=') else {
        return Err(format!(
            "invalid severity format '{}', expected '<rule>=<severity>' (e.g., 'CA1839=warning')",
            s
        ));
    };
    Ok((rule.to_string(), severity.parse()?))
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full JSON response (default).
    #[default]
    Json,
    /// Human-readable text.
    Text,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze C# sources and report findings.
    Check {
        /// Files or directories to analyze.
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Fix findings in place.
    ///
    /// Use --dry-run to preview changes without modifying files.
    Fix {
        /// Files or directories to fix.
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
        /// Preview changes without applying.
        #[arg(long)]
        dry_run: bool,
    },
    /// List registered rules.
    Rules,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), LintError> {
    let config = load_config(&cli.global)?;
    let cancel = CancellationToken::new();
    let format = cli.global.format;
    match cli.command {
        Command::Check { paths } => {
            let response = run_check(&paths, &config, &cancel)?;
            emit(format, &response, render_check)
        }
        Command::Fix { paths, dry_run } => {
            let response = run_fix(&paths, &config, dry_run, &cancel)?;
            emit(format, &response, render_fix)
        }
        Command::Rules => {
            let response = run_rules(&config)?;
            emit(format, &response, render_rules)
        }
    }
}

/// Load the config file and apply command-line overrides.
fn load_config(global: &GlobalArgs) -> Result<Config, LintError> {
    let mut config = match &global.config {
        Some(path) => {
            if !path.is_file() {
                return Err(LintError::file_not_found(path.display().to_string()));
            }
            Config::load(path)?
        }
        None => Config::discover(&std::env::current_dir()?)?.unwrap_or_default(),
    };
    config.references.extend(global.references.iter().cloned());
    if global.no_default_references {
        config.default_references = false;
    }
    if global.include_generated {
        config.analyze_generated_code = true;
    }
    for (rule, severity) in &global.severity {
        config.set_severity(rule.clone(), *severity);
    }
    Ok(config)
}

// ============================================================================
// Output
// ============================================================================

fn emit<T: serde::Serialize>(
    format: OutputFormat,
    response: &T,
    render: fn(&T) -> String,
) -> Result<(), LintError> {
    let mut stdout = io::stdout();
    match format {
        OutputFormat::Json => emit_response(response, &mut stdout)?,
        OutputFormat::Text => write!(stdout, "{}", render(response))?,
    }
    stdout.flush()?;
    Ok(())
}

fn render_skipped_files(files: &[SkippedFileInfo], out: &mut String) {
    for file in files {
        out.push_str(&format!(
            "not analyzed {}:{}:{}: {}\n",
            file.file, file.line, file.col, file.message
        ));
    }
}

fn render_check(response: &CheckResponse) -> String {
    let mut out = String::new();
    for finding in &response.findings {
        out.push_str(&finding.to_line());
        out.push('\n');
    }
    render_skipped_files(&response.files_skipped, &mut out);
    out.push_str(&format!(
        "{} finding(s) in {} file(s)\n",
        response.summary.total, response.files_analyzed
    ));
    out
}

fn render_fix(response: &FixResponse) -> String {
    let mut out = response.patch.unified_diff.clone();
    for skipped in &response.skipped {
        out.push_str(&format!(
            "skipped {}[{}]: {}\n",
            skipped.location, skipped.rule_id, skipped.reason
        ));
    }
    render_skipped_files(&response.files_skipped, &mut out);
    let verb = if response.dry_run { "would apply" } else { "applied" };
    out.push_str(&format!(
        "{} {} fix(es), {} file(s) written\n",
        verb,
        response.fixes_applied,
        response.files_written.len()
    ));
    out
}

fn render_rules(response: &RulesResponse) -> String {
    response
        .rules
        .iter()
        .map(|rule| {
            format!(
                "{}  {}  [{}]  {}{}\n",
                rule.id,
                rule.effective_severity,
                rule.category,
                rule.title,
                if rule.fixable { " (fixable)" } else { "" }
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn check_defaults_to_current_directory() {
            let cli = Cli::try_parse_from(["tuglint", "check"]).unwrap();
            match cli.command {
                Command::Check { paths } => assert_eq!(paths, vec![PathBuf::from(".")]),
                _ => panic!("expected Check"),
            }
            assert_eq!(cli.global.format, OutputFormat::Json);
        }

        #[test]
        fn fix_dry_run_and_global_flags() {
            let cli = Cli::try_parse_from([
                "tuglint",
                "fix",
                "src",
                "--dry-run",
                "--format",
                "text",
                "--reference",
                "a.cs",
                "--reference",
                "b.cs",
                "--no-default-references",
            ])
            .unwrap();
            match cli.command {
                Command::Fix { paths, dry_run } => {
                    assert_eq!(paths, vec![PathBuf::from("src")]);
                    assert!(dry_run);
                }
                _ => panic!("expected Fix"),
            }
            assert_eq!(cli.global.format, OutputFormat::Text);
            assert_eq!(cli.global.references.len(), 2);
            assert!(cli.global.no_default_references);
        }

        #[test]
        fn severity_override_format() {
            assert_eq!(
                parse_severity_override("CA1839=warning"),
                Ok(("CA1839".to_string(), Severity::Warning))
            );
            assert!(parse_severity_override("CA1839").is_err());
            assert!(parse_severity_override("CA1839=loud").is_err());
        }

        #[test]
        fn flags_override_config() {
            let cli = Cli::try_parse_from([
                "tuglint",
                "--include-generated",
                "--severity",
                "CA1839=none",
                "--config",
                "/definitely/missing/tuglint.json",
                "rules",
            ])
            .unwrap();
            assert!(matches!(load_config(&cli.global), Err(LintError::FileNotFound { .. })));
            assert!(cli.global.include_generated);
            assert_eq!(cli.global.severity, vec![("CA1839".to_string(), Severity::None)]);
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn check_text_lists_files_not_analyzed() {
            let response = CheckResponse::new(1, vec![]).with_files_skipped(vec![SkippedFileInfo {
                file: "src/Broken.cs".to_string(),
                line: 1,
                col: 7,
                message: "expected identifier, found '{'".to_string(),
            }]);
            assert_eq!(
                render_check(&response),
                "not analyzed src/Broken.cs:1:7: expected identifier, found '{'\n0 finding(s) in 1 file(s)\n"
            );
        }
    }
}

// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Configuration: the `tuglint.json` file, source filtering, and generated
//! code detection.
//!
//! ## File format
//!
//! ```json
//! {
//!   "rules": { "CA1839": { "severity": "warning" } },
//!   "analyze_generated_code": false,
//!   "exclude": ["**/Migrations/**"],
//!   "references": ["stubs/extra.cs"],
//!   "default_references": true
//! }
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tuglint_core::diagnostic::Severity;
use tuglint_core::error::LintError;

/// Name of the configuration file discovered in the working directory.
pub const CONFIG_FILE_NAME: &str = "tuglint.json";

/// Directories never analysed.
pub const DEFAULT_EXCLUSIONS: &[&str] = &["**/.git/**", "**/bin/**", "**/obj/**", "**/node_modules/**"];

/// File name suffixes of generated C# sources.
const GENERATED_SUFFIXES: &[&str] = &[".g.cs", ".g.i.cs", ".designer.cs", ".generated.cs"];

/// How many leading bytes are searched for a generated-code marker.
const GENERATED_HEADER_LIMIT: usize = 2048;

static GENERATED_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*auto-generated|<autogenerated").ok());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown rule '{0}'")]
    UnknownRule(String),
}

impl From<ConfigError> for LintError {
    fn from(err: ConfigError) -> Self {
        LintError::InvalidArguments {
            message: err.to_string(),
            details: None,
        }
    }
}

/// Per-rule settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rules: BTreeMap<String, RuleConfig>,
    pub analyze_generated_code: bool,
    pub exclude: Vec<String>,
    pub references: Vec<PathBuf>,
    pub default_references: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rules: BTreeMap::new(),
            analyze_generated_code: false,
            exclude: Vec::new(),
            references: Vec::new(),
            default_references: true,
        }
    }
}

impl Config {
    pub fn parse(path: &str, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load a config file. Relative reference paths are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path_text = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path_text.clone(),
            source,
        })?;
        let mut config = Self::parse(&path_text, &text)?;
        if let Some(dir) = path.parent() {
            for reference in &mut config.references {
                if reference.is_relative() {
                    *reference = dir.join(&*reference);
                }
            }
        }
        debug!(path = %path_text, "loaded config");
        Ok(config)
    }

    /// Load `tuglint.json` from `dir` if present.
    pub fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Severity overrides with rule ids checked against `known`.
    pub fn severity_overrides(&self, known: &[&str]) -> Result<Vec<(String, Severity)>, ConfigError> {
        let mut overrides = Vec::new();
        for (id, rule) in &self.rules {
            let Some(canonical) = known.iter().find(|k| k.eq_ignore_ascii_case(id)) else {
                return Err(ConfigError::UnknownRule(id.clone()));
            };
            if let Some(severity) = rule.severity {
                overrides.push((canonical.to_string(), severity));
            }
        }
        Ok(overrides)
    }

    pub fn set_severity(&mut self, rule_id: impl Into<String>, severity: Severity) {
        self.rules.entry(rule_id.into()).or_default().severity = Some(severity);
    }
}

// ============================================================================
// Source Filtering
// ============================================================================

/// Decides which files under an analysed directory are read.
#[derive(Debug)]
pub struct SourceFilter {
    exclusions: GlobSet,
    default_exclusions: GlobSet,
}

impl SourceFilter {
    pub fn new(exclude: &[String]) -> Result<Self, ConfigError> {
        let defaults: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
        Ok(SourceFilter {
            exclusions: build_glob_set(exclude)?,
            default_exclusions: build_glob_set(&defaults)?,
        })
    }

    /// Whether a path (relative to the walked root) is analysed.
    pub fn matches(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != "cs") {
            return false;
        }
        !self.default_exclusions.is_match(path) && !self.exclusions.is_match(path)
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: "<combined>".to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Generated Code
// ============================================================================

/// Whether a source file is generated code: by file name, or by an
/// `<auto-generated>` marker in a comment near the top of the file.
pub fn is_generated(path: &Path, text: &str) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if GENERATED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return true;
    }
    let mut end = text.len().min(GENERATED_HEADER_LIMIT);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let header = &text[..end];
    GENERATED_HEADER
        .as_ref()
        .is_some_and(|re| header.lines().take_while(|l| is_comment_or_blank(l)).any(|l| re.is_match(l)))
}

fn is_comment_or_blank(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with("//") || line.starts_with("/*") || line.starts_with('*') || line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    mod config_file {
        use super::*;

        #[test]
        fn empty_object_gives_defaults() {
            let config = Config::parse("tuglint.json", "{}").unwrap();
            assert_eq!(config, Config::default());
            assert!(config.default_references);
            assert!(!config.analyze_generated_code);
        }

        #[test]
        fn parses_every_field() {
            let config = Config::parse(
                "tuglint.json",
                r#"{
                    "rules": { "CA1839": { "severity": "warning" } },
                    "analyze_generated_code": true,
                    "exclude": ["gen/**"],
                    "references": ["extra.cs"],
                    "default_references": false
                }"#,
            )
            .unwrap();
            assert_eq!(config.rules["CA1839"].severity, Some(Severity::Warning));
            assert!(config.analyze_generated_code);
            assert_eq!(config.exclude, vec!["gen/**".to_string()]);
            assert_eq!(config.references, vec![PathBuf::from("extra.cs")]);
            assert!(!config.default_references);
        }

        #[test]
        fn rejects_unknown_fields_and_severities() {
            assert!(matches!(
                Config::parse("c.json", r#"{ "rulez": {} }"#),
                Err(ConfigError::Parse { .. })
            ));
            assert!(Config::parse("c.json", r#"{ "rules": { "CA1839": { "severity": "loud" } } }"#).is_err());
        }

        #[test]
        fn severity_overrides_check_rule_ids() {
            let mut config = Config::default();
            config.set_severity("ca1839", Severity::None);
            assert_eq!(
                config.severity_overrides(&["CA1839"]).unwrap(),
                vec![("CA1839".to_string(), Severity::None)]
            );
            config.set_severity("CA9999", Severity::Error);
            assert!(matches!(
                config.severity_overrides(&["CA1839"]),
                Err(ConfigError::UnknownRule(id)) if id == "CA9999"
            ));
        }

        #[test]
        fn load_resolves_references_relative_to_file() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "references": ["lib.cs"] }"#).unwrap();
            let config = Config::discover(dir.path()).unwrap().unwrap();
            assert_eq!(config.references, vec![dir.path().join("lib.cs")]);

            let empty = tempfile::tempdir().unwrap();
            assert!(Config::discover(empty.path()).unwrap().is_none());
        }

        #[test]
        fn load_names_the_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("missing.json");
            match Config::load(&path) {
                Err(ConfigError::Io { path: shown, .. }) => assert_eq!(shown, path.display().to_string()),
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn config_errors_are_invalid_arguments() {
            let err: LintError = ConfigError::UnknownRule("X".to_string()).into();
            assert_eq!(err.error_code().code(), 2);
        }
    }

    mod filtering {
        use super::*;

        #[test]
        fn only_cs_files_outside_default_exclusions() {
            let filter = SourceFilter::new(&[]).unwrap();
            assert!(filter.matches(Path::new("src/Program.cs")));
            assert!(!filter.matches(Path::new("src/Program.vb")));
            assert!(!filter.matches(Path::new("src/obj/Debug/Program.cs")));
            assert!(!filter.matches(Path::new("bin/Program.cs")));
        }

        #[test]
        fn user_exclusions_apply() {
            let filter = SourceFilter::new(&["**/Migrations/**".to_string()]).unwrap();
            assert!(!filter.matches(Path::new("src/Migrations/Init.cs")));
            assert!(filter.matches(Path::new("src/Models/User.cs")));
        }

        #[test]
        fn invalid_pattern_is_reported() {
            assert!(matches!(
                SourceFilter::new(&["[oops".to_string()]),
                Err(ConfigError::InvalidPattern { .. })
            ));
        }
    }

    mod generated_code {
        use super::*;

        #[test]
        fn by_file_name() {
            assert!(is_generated(Path::new("Form1.Designer.cs"), "class C { }"));
            assert!(is_generated(Path::new("obj/Api.g.cs"), "class C { }"));
            assert!(!is_generated(Path::new("Program.cs"), "class C { }"));
        }

        #[test]
        fn by_header_comment() {
            let text = "// <auto-generated>\n//   This code was generated by a tool.\n// </auto-generated>\nclass C { }\n";
            assert!(is_generated(Path::new("Api.cs"), text));
        }

        #[test]
        fn marker_after_code_does_not_count() {
            let text = "class C { }\n// <auto-generated>\n";
            assert!(!is_generated(Path::new("Api.cs"), text));
        }
    }
}

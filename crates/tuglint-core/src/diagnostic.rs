//! Diagnostics: severities, rule descriptors, and findings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::patch::{FileId, Span};
use crate::types::Location;

/// How loudly a finding is reported.
///
/// `None` disables the rule; the driver drops findings with that severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Silent,
    Suggestion,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Silent => "silent",
            Severity::Suggestion => "suggestion",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Whether findings at this severity are reported at all.
    pub fn is_enabled(&self) -> bool {
        *self != Severity::None
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "silent" | "hidden" => Ok(Severity::Silent),
            "suggestion" | "info" => Ok(Severity::Suggestion),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Static metadata of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    /// Message with positional `{0}`, `{1}`, ... placeholders.
    pub message_format: &'static str,
    pub category: &'static str,
    pub default_severity: Severity,
    /// Whether the rule ships a code fix.
    pub fixable: bool,
}

/// Substitute positional `{N}` placeholders with `args[N]`.
///
/// Placeholders without a matching argument are left as written.
pub fn format_message(format: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(format.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            args.get(index).map(|a| (*a, close))
        });
        match arg {
            Some((text, close)) => {
                out.push_str(text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One reported occurrence of a rule in a document.
///
/// Findings are independent values. A fix re-derives everything it needs
/// from the current document, so a stale finding can only fail, never
/// misapply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip)]
    pub file_id: FileId,
    /// Span of the flagged expression (trivia excluded).
    #[serde(skip)]
    pub span: Span,
    pub location: Location,
}

impl Finding {
    /// Render as `file:line:col: severity[RULE]: message`.
    pub fn to_line(&self) -> String {
        format!(
            "{}: {}[{}]: {}",
            self.location, self.severity, self.rule_id, self.message
        )
    }
}

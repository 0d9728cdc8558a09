//! Core infrastructure for tuglint.
//!
//! This crate provides language-agnostic infrastructure:
//! - Patch IR for anchored, conflict-checked, atomic edits
//! - Operation IR and the semantic traits a host front end implements
//! - Diagnostics, the analyzer driver, and the code-fix protocol
//! - Error types and error codes
//! - JSON output types for CLI responses
//! - Text utilities and diff generation

pub mod cancel;
pub mod diagnostic;
pub mod diff;
pub mod driver;
pub mod error;
pub mod fix;
pub mod output;
pub mod patch;
pub mod semantic;
pub mod text;
pub mod types;

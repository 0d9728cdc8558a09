//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

// patch module - foundation types for edit/diff operations
use tuglint::patch::{
    Anchor, AnchorResolution, ApplyContext, ApplyResult, Conflict, ContentHash, Edit, EditLabels,
    FileId, MaterializedPatch, OutputEdit, PatchSet, Precondition, Span,
};

// semantic module - the model rules run against
use tuglint::semantic::{
    find_operation, members_named, walk_operation, Compilation, CompilationId, NodeId, Operation,
    OperationData, OperationKind, PropertyReference, SemanticDocument, SymbolId, SymbolKind,
    SymbolRef, VisitResult,
};

// diagnostic, driver, and fix modules - the analysis protocol
use tuglint::cancel::{CancellationToken, Cancelled};
use tuglint::diagnostic::{format_message, Finding, RuleDescriptor, Severity};
use tuglint::driver::{AnalyzerDriver, OperationAnalyzer, OperationContext, Rule};
use tuglint::fix::{
    apply_to_text, fix_all, CodeFix, FixAllOutcome, FixError, RewritePlan, SkippedFix,
};

// error module - error types and codes
use tuglint::error::{LintError, OutputErrorCode};

// output module - JSON output types
use tuglint::output::{
    emit_response, CheckResponse, Edit as OutputEditAlias, ErrorInfo, ErrorResponse,
    FindingSummary, FixResponse, Patch, RuleInfo, RulesResponse, SkippedFileInfo, SkippedFixInfo,
    SCHEMA_VERSION,
};

// text and types modules - positions and locations
use tuglint::diff::generate_unified_diff;
use tuglint::text::{byte_offset_to_position, extract_span, extract_span_str, LineIndex};
use tuglint::types::Location;

// ============================================================================
// C# Front End
// ============================================================================

use tuglint::csharp::{
    parse, CSharpCompilation, CSharpDocument, CompilationBuilder, MetadataReference, ParseError,
    Project, ReferenceError,
};
use tuglint::csharp::syntax::{Expr, NodeKind, SyntaxTree};
use tuglint::csharp::tokenizer::{tokenize, Token, TokenKind};

// ============================================================================
// Rules and CLI
// ============================================================================

use tuglint::cli::{
    build_driver, build_project, collect_sources, run_check, run_fix, run_rules, BuiltProject,
    SourceInput,
};
use tuglint::config::{
    is_generated, Config, ConfigError, RuleConfig, SourceFilter, CONFIG_FILE_NAME,
    DEFAULT_EXCLUSIONS,
};
use tuglint::rules::current_managed_thread_id::{
    emit, fix_title, match_operation, resolve, CurrentManagedThreadIdFix,
    CurrentManagedThreadIdRule, MatchResult, ResolvedSymbols, DESCRIPTOR, RULE_ID,
};
use tuglint::rules::{all_fixers, all_rules, descriptor};

#[test]
fn api_surface_compiles() {
    // This test exists only to ensure the imports above compile.
    // If you're here because this test failed to compile, you've broken the public API.
}

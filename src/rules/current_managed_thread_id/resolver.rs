// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Well-known symbols of the rule.

use tracing::debug;
use tuglint_core::semantic::{members_named, Compilation, SymbolRef};

pub const THREAD_TYPE: &str = "System.Threading.Thread";
pub const CURRENT_THREAD: &str = "CurrentThread";
pub const MANAGED_THREAD_ID: &str = "ManagedThreadId";
pub const ENVIRONMENT_TYPE: &str = "System.Environment";
pub const CURRENT_MANAGED_THREAD_ID: &str = "CurrentManagedThreadId";

/// The declarations the rule compares operations against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSymbols {
    pub thread: SymbolRef,
    /// `Thread.CurrentThread`, the outer accessor.
    pub current_thread: SymbolRef,
    /// `Thread.ManagedThreadId`, the flagged accessor.
    pub managed_thread_id: SymbolRef,
    pub replacement: Replacement,
}

/// `Environment.CurrentManagedThreadId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    pub environment: SymbolRef,
    pub current_managed_thread_id: SymbolRef,
}

fn first_member(compilation: &dyn Compilation, ty: SymbolRef, name: &str) -> Option<SymbolRef> {
    members_named(compilation, ty, name).into_iter().next()
}

/// Resolve the replacement pair alone.
pub fn resolve_replacement(compilation: &dyn Compilation) -> Option<Replacement> {
    let environment = compilation.type_by_metadata_name(ENVIRONMENT_TYPE)?;
    let current_managed_thread_id = first_member(compilation, environment, CURRENT_MANAGED_THREAD_ID)?;
    Some(Replacement {
        environment,
        current_managed_thread_id,
    })
}

/// Resolve all five declarations, or `None` if any is missing.
pub fn resolve(compilation: &dyn Compilation) -> Option<ResolvedSymbols> {
    let resolved = (|| {
        let thread = compilation.type_by_metadata_name(THREAD_TYPE)?;
        let current_thread = first_member(compilation, thread, CURRENT_THREAD)?;
        let managed_thread_id = first_member(compilation, thread, MANAGED_THREAD_ID)?;
        let replacement = resolve_replacement(compilation)?;
        Some(ResolvedSymbols {
            thread,
            current_thread,
            managed_thread_id,
            replacement,
        })
    })();
    if resolved.is_none() {
        debug!(compilation = compilation.id().0, "thread id symbols unavailable");
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuglint_core::semantic::SymbolKind;
    use tuglint_csharp::{CompilationBuilder, MetadataReference, Project};

    fn project(source: &str, core_library: bool) -> Project {
        let mut builder = CompilationBuilder::new();
        builder.add_source("Test.cs", source, false).unwrap();
        if core_library {
            builder.add_reference(MetadataReference::core_library().unwrap());
        }
        builder.build()
    }

    #[test]
    fn resolves_from_core_library() {
        let project = project("class C { }", true);
        let compilation = project.compilation.as_ref();
        let symbols = resolve(compilation).unwrap();
        assert_eq!(compilation.symbol_name(symbols.current_thread), Some(CURRENT_THREAD));
        assert_eq!(compilation.symbol_name(symbols.managed_thread_id), Some(MANAGED_THREAD_ID));
        assert_eq!(compilation.symbol_kind(symbols.managed_thread_id), Some(SymbolKind::Property));
        assert_eq!(
            compilation.symbol_display(symbols.replacement.environment),
            ENVIRONMENT_TYPE
        );
        assert_ne!(symbols.current_thread, symbols.managed_thread_id);
    }

    #[test]
    fn none_without_references() {
        let project = project("class C { }", false);
        assert!(resolve(project.compilation.as_ref()).is_none());
        assert!(resolve_replacement(project.compilation.as_ref()).is_none());
    }

    #[test]
    fn none_when_a_member_is_missing() {
        let source = r#"
namespace System
{
    public static class Environment { public static int ProcessorCount => 1; }
}
namespace System.Threading
{
    public class Thread
    {
        public static Thread CurrentThread => null;
        public int ManagedThreadId => 0;
    }
}
"#;
        assert!(resolve(project(source, false).compilation.as_ref()).is_none());
    }

    #[test]
    fn source_declaration_wins_over_reference() {
        let source = r#"
namespace System
{
    public static class Environment { public static int CurrentManagedThreadId => 0; }
}
"#;
        let project = project(source, true);
        let compilation = project.compilation.as_ref();
        let replacement = resolve_replacement(compilation).unwrap();
        let names: Vec<&str> = compilation
            .members(replacement.environment)
            .into_iter()
            .filter_map(|m| compilation.symbol_name(m))
            .collect();
        assert!(names.contains(&CURRENT_MANAGED_THREAD_ID));
        assert!(!names.contains(&"ProcessorCount"));
    }
}

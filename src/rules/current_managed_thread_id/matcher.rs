// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Matching `Thread.CurrentThread.ManagedThreadId` by symbol identity.

use tuglint_core::patch::Span;
use tuglint_core::semantic::Operation;

use super::resolver::ResolvedSymbols;
use super::RULE_ID;

/// A matched two-level accessor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// The whole chain, `Thread.CurrentThread.ManagedThreadId`.
    pub span: Span,
    /// The `CurrentThread` reference.
    pub receiver_span: Span,
    pub rule_id: &'static str,
}

/// Match one operation.
///
/// The operation must reference `ManagedThreadId` on an instance that is
/// itself a reference to `CurrentThread`. How `CurrentThread` was reached
/// is not inspected.
pub fn match_operation(symbols: &ResolvedSymbols, operation: &Operation) -> Option<MatchResult> {
    let inner = operation.as_property_reference()?;
    if inner.property != symbols.managed_thread_id {
        return None;
    }
    let receiver = inner.instance.as_deref()?;
    let outer = receiver.as_property_reference()?;
    if outer.property != symbols.current_thread {
        return None;
    }
    Some(MatchResult {
        span: operation.span,
        receiver_span: receiver.span,
        rule_id: RULE_ID,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::current_managed_thread_id::resolver::Replacement;
    use tuglint_core::semantic::{
        CompilationId, NodeId, OperationData, PropertyReference, SymbolId, SymbolRef,
    };

    fn sym(id: u32) -> SymbolRef {
        SymbolRef::new(CompilationId(1), SymbolId(id))
    }

    fn symbols() -> ResolvedSymbols {
        ResolvedSymbols {
            thread: sym(1),
            current_thread: sym(2),
            managed_thread_id: sym(3),
            replacement: Replacement {
                environment: sym(4),
                current_managed_thread_id: sym(5),
            },
        }
    }

    fn property(node: u32, span: (usize, usize), property: SymbolRef, instance: Option<Operation>) -> Operation {
        Operation {
            syntax: NodeId(node),
            span: Span::new(span.0, span.1),
            ty: None,
            data: OperationData::PropertyReference(PropertyReference {
                property,
                instance: instance.map(Box::new),
            }),
        }
    }

    #[test]
    fn matches_two_level_chain() {
        let receiver = property(1, (0, 20), sym(2), None);
        let chain = property(2, (0, 36), sym(3), Some(receiver));
        let result = match_operation(&symbols(), &chain);
        assert_eq!(
            result,
            Some(MatchResult {
                span: Span::new(0, 36),
                receiver_span: Span::new(0, 20),
                rule_id: "CA1839",
            })
        );
    }

    #[test]
    fn rejects_other_inner_property() {
        let receiver = property(1, (0, 20), sym(2), None);
        let chain = property(2, (0, 25), sym(9), Some(receiver));
        assert!(match_operation(&symbols(), &chain).is_none());
    }

    #[test]
    fn rejects_other_receiver() {
        let local = Operation {
            syntax: NodeId(1),
            span: Span::new(0, 6),
            ty: Some(sym(1)),
            data: OperationData::LocalReference { local: sym(40) },
        };
        let chain = property(2, (0, 22), sym(3), Some(local));
        assert!(match_operation(&symbols(), &chain).is_none());

        let other = property(1, (0, 10), sym(8), None);
        let chain = property(2, (0, 26), sym(3), Some(other));
        assert!(match_operation(&symbols(), &chain).is_none());
    }

    #[test]
    fn rejects_missing_instance_and_other_kinds() {
        let chain = property(2, (0, 15), sym(3), None);
        assert!(match_operation(&symbols(), &chain).is_none());

        let literal = Operation {
            syntax: NodeId(1),
            span: Span::new(0, 1),
            ty: None,
            data: OperationData::Literal,
        };
        assert!(match_operation(&symbols(), &literal).is_none());
    }

    #[test]
    fn same_names_in_other_compilation_do_not_match() {
        let foreign = |id| SymbolRef::new(CompilationId(2), SymbolId(id));
        let receiver = property(1, (0, 20), foreign(2), None);
        let chain = property(2, (0, 36), foreign(3), Some(receiver));
        assert!(match_operation(&symbols(), &chain).is_none());
    }
}

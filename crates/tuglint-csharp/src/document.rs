// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A parsed and bound C# source file.

use std::collections::HashMap;
use std::sync::Arc;

use tuglint_core::patch::{FileId, Span};
use tuglint_core::semantic::{Compilation, NodeId, Operation, SemanticDocument, SymbolId, SymbolKind, SymbolRef};
use tuglint_core::text::LineIndex;

use crate::scope::{Lookup, NamespaceOrType, Resolver, ScopeId, Scopes};
use crate::symbols::CSharpCompilation;
use crate::syntax::SyntaxTree;

#[derive(Debug)]
pub struct CSharpDocument {
    file_id: FileId,
    path: String,
    tree: SyntaxTree,
    line_index: LineIndex,
    compilation: Arc<CSharpCompilation>,
    operations: Vec<Operation>,
    scopes: Scopes,
    node_scopes: HashMap<NodeId, ScopeId>,
    generated: bool,
}

impl CSharpDocument {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        file_id: FileId,
        path: String,
        tree: SyntaxTree,
        compilation: Arc<CSharpCompilation>,
        operations: Vec<Operation>,
        scopes: Scopes,
        node_scopes: HashMap<NodeId, ScopeId>,
        generated: bool,
    ) -> Self {
        let line_index = LineIndex::new(&tree.text);
        CSharpDocument {
            file_id,
            path,
            tree,
            line_index,
            compilation,
            operations,
            scopes,
            node_scopes,
            generated,
        }
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn csharp_compilation(&self) -> &Arc<CSharpCompilation> {
        &self.compilation
    }

    /// The binding scope in effect at `position`: the scope recorded for the
    /// innermost bound expression there, or the file scope.
    pub fn scope_at(&self, position: usize) -> ScopeId {
        let len = self.tree.text.len();
        let start = position.min(len);
        let span = Span::new(start, (start + 1).min(len));
        self.tree
            .find_node(span)
            .and_then(|node| {
                std::iter::once(node)
                    .chain(self.tree.ancestors(node))
                    .find_map(|n| self.node_scopes.get(&n).copied())
            })
            .unwrap_or(ScopeId(0))
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.compilation.table(), &self.scopes)
    }

    /// Names of `ty` and its containers, outermost first, global namespace
    /// excluded. `None` for generic types, which have no plain spelling.
    fn qualified_parts(&self, ty: SymbolId) -> Option<Vec<&str>> {
        let table = self.compilation.table();
        let global = table.global();
        let mut parts = Vec::new();
        let mut current = Some(ty);
        while let Some(id) = current {
            if id == global {
                break;
            }
            let symbol = table.get(id)?;
            if symbol.kind == SymbolKind::Type && symbol.arity > 0 {
                return None;
            }
            parts.push(symbol.name.as_str());
            current = symbol.parent;
        }
        parts.reverse();
        Some(parts)
    }

    /// Whether `parts` written at `scope` means `ty` in expression context.
    fn names_type(&self, scope: ScopeId, parts: &[&str], ty: SymbolId) -> bool {
        let resolver = self.resolver();
        let Some(first) = parts.first() else {
            return false;
        };
        let first_ok = match resolver.lookup(scope, first, 0) {
            Lookup::Type(_) | Lookup::Namespace(_) => true,
            // `Color Color`: a member whose type is the named type still
            // lets the name bind as that type.
            Lookup::Members { symbols, .. } => {
                let named = resolver.resolve_parts(Some(scope), None, &[(first, 0)]);
                let table = self.compilation.table();
                match named {
                    Some(NamespaceOrType::Type(t)) => symbols
                        .iter()
                        .all(|s| table.get(*s).is_some_and(|m| m.ty == Some(t) && m.kind != SymbolKind::Method)),
                    _ => false,
                }
            }
            _ => false,
        };
        if !first_ok {
            return false;
        }
        let parts: Vec<(&str, usize)> = parts.iter().map(|p| (*p, 0)).collect();
        resolver.resolve_parts(Some(scope), None, &parts) == Some(NamespaceOrType::Type(ty))
    }
}

impl SemanticDocument for CSharpDocument {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn text(&self) -> &str {
        &self.tree.text
    }

    fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    fn compilation(&self) -> &dyn Compilation {
        self.compilation.as_ref()
    }

    fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn find_node(&self, span: Span) -> Option<NodeId> {
        self.tree.find_node(span)
    }

    fn node_span(&self, node: NodeId) -> Option<Span> {
        self.tree.node_span(node)
    }

    fn node_full_span(&self, node: NodeId) -> Option<Span> {
        self.tree.node_full_span(node)
    }

    fn minimal_type_name(&self, ty: SymbolRef, position: usize) -> Option<String> {
        let id = self.compilation.local(ty)?;
        if self.compilation.table().kind(id) != Some(SymbolKind::Type) {
            return None;
        }
        let parts = self.qualified_parts(id)?;
        let scope = self.scope_at(position);
        for skip in (0..parts.len()).rev() {
            let suffix = &parts[skip..];
            if self.names_type(scope, suffix, id) {
                return Some(suffix.join("."));
            }
        }
        let resolver = self.resolver();
        let all: Vec<(&str, usize)> = parts.iter().map(|p| (*p, 0)).collect();
        if resolver.resolve_parts(Some(scope), Some("global"), &all) == Some(NamespaceOrType::Type(id)) {
            return Some(format!("global::{}", parts.join(".")));
        }
        None
    }

    fn is_generated(&self) -> bool {
        self.generated
    }
}

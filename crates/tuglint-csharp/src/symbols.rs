// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Symbol table for one compilation.
//!
//! Namespaces are merged across every source file and reference. Types are
//! keyed by `(container, name, arity, origin)`: partial declarations within
//! one origin merge into a single symbol, while the same type declared in
//! source and in a reference (or in two references) stays distinct. Lookups
//! prefer the source declaration and treat a clash between references as
//! ambiguous.

use std::collections::HashMap;

use tuglint_core::semantic::{Compilation, CompilationId, SymbolId, SymbolKind, SymbolRef};

use crate::syntax::TypeKind;

/// Where a symbol was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Source,
    /// Index of the metadata reference.
    Reference(u32),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub parent: Option<SymbolId>,
    pub origin: Origin,
    /// Generic arity for types, parameter count for methods.
    pub arity: usize,
    pub is_static: bool,
    pub type_kind: Option<TypeKind>,
    /// Declared type of fields, properties, locals and parameters; return
    /// type of methods.
    pub ty: Option<SymbolId>,
    /// Base class of types.
    pub base: Option<SymbolId>,
    /// Namespaces and types of a namespace; members and nested types of a type.
    pub children: Vec<SymbolId>,
}

impl Symbol {
    fn new(name: &str, kind: SymbolKind, parent: Option<SymbolId>, origin: Origin) -> Self {
        Symbol {
            name: name.to_string(),
            kind,
            parent,
            origin,
            arity: 0,
            is_static: false,
            type_kind: None,
            ty: None,
            base: None,
            children: Vec::new(),
        }
    }
}

/// Outcome of choosing among same-named types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePick {
    Found(SymbolId),
    Ambiguous,
    Missing,
}

impl TypePick {
    pub fn found(self) -> Option<SymbolId> {
        match self {
            TypePick::Found(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    global: SymbolId,
    /// `(container, name, arity, origin)` to type, for partial merging.
    type_index: HashMap<(SymbolId, String, usize, Origin), SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: vec![Symbol::new("", SymbolKind::Namespace, None, Origin::Source)],
            global: SymbolId(0),
            type_index: HashMap::new(),
        }
    }

    pub fn global(&self) -> SymbolId {
        self.global
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        let parent = symbol.parent;
        self.symbols.push(symbol);
        if let Some(parent) = parent {
            if let Some(p) = self.symbols.get_mut(parent.0 as usize) {
                p.children.push(id);
            }
        }
        id
    }

    // ------------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------------

    /// The child namespace `name` of `parent`, created on first use.
    pub fn add_namespace(&mut self, parent: SymbolId, name: &str) -> SymbolId {
        if let Some(existing) = self.namespace_child(parent, name) {
            return existing;
        }
        self.push(Symbol::new(name, SymbolKind::Namespace, Some(parent), Origin::Source))
    }

    /// Declare a type, merging with an earlier partial of the same origin.
    pub fn add_type(
        &mut self,
        container: SymbolId,
        name: &str,
        arity: usize,
        kind: TypeKind,
        origin: Origin,
        is_static: bool,
    ) -> SymbolId {
        let key = (container, name.to_string(), arity, origin);
        if let Some(&existing) = self.type_index.get(&key) {
            if let Some(symbol) = self.symbols.get_mut(existing.0 as usize) {
                symbol.is_static |= is_static;
            }
            return existing;
        }
        let mut symbol = Symbol::new(name, SymbolKind::Type, Some(container), origin);
        symbol.arity = arity;
        symbol.is_static = is_static;
        symbol.type_kind = Some(kind);
        let id = self.push(symbol);
        self.type_index.insert(key, id);
        id
    }

    pub fn add_member(
        &mut self,
        container: SymbolId,
        name: &str,
        kind: SymbolKind,
        is_static: bool,
        arity: usize,
    ) -> SymbolId {
        let origin = self.get(container).map_or(Origin::Source, |s| s.origin);
        let mut symbol = Symbol::new(name, kind, Some(container), origin);
        symbol.is_static = is_static;
        symbol.arity = arity;
        self.push(symbol)
    }

    /// Declare a local or parameter. Variables have no parent and are not
    /// members of anything.
    pub fn add_variable(&mut self, name: &str, kind: SymbolKind, ty: Option<SymbolId>) -> SymbolId {
        let mut symbol = Symbol::new(name, kind, None, Origin::Source);
        symbol.ty = ty;
        self.push(symbol)
    }

    pub fn set_type(&mut self, id: SymbolId, ty: Option<SymbolId>) {
        if let Some(symbol) = self.symbols.get_mut(id.0 as usize) {
            symbol.ty = ty;
        }
    }

    pub fn set_base(&mut self, id: SymbolId, base: Option<SymbolId>) {
        if let Some(symbol) = self.symbols.get_mut(id.0 as usize) {
            symbol.base = base;
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn name(&self, id: SymbolId) -> &str {
        self.get(id).map_or("", |s| s.name.as_str())
    }

    pub fn kind(&self, id: SymbolId) -> Option<SymbolKind> {
        self.get(id).map(|s| s.kind)
    }

    pub fn children(&self, id: SymbolId) -> &[SymbolId] {
        self.get(id).map_or(&[], |s| s.children.as_slice())
    }

    pub fn namespace_child(&self, ns: SymbolId, name: &str) -> Option<SymbolId> {
        self.children(ns).iter().copied().find(|&c| {
            self.get(c)
                .is_some_and(|s| s.kind == SymbolKind::Namespace && s.name == name)
        })
    }

    /// Types named `name` declared directly in `container`. `arity` of
    /// `None` matches any arity.
    pub fn types_named(&self, container: SymbolId, name: &str, arity: Option<usize>) -> Vec<SymbolId> {
        self.children(container)
            .iter()
            .copied()
            .filter(|&c| {
                self.get(c).is_some_and(|s| {
                    s.kind == SymbolKind::Type
                        && s.name == name
                        && arity.map_or(true, |a| a == s.arity)
                })
            })
            .collect()
    }

    /// Choose among same-named candidates: a source declaration wins, a
    /// single reference declaration is used, anything else is ambiguous.
    pub fn pick_type(&self, candidates: &[SymbolId]) -> TypePick {
        let source: Vec<SymbolId> = candidates
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_some_and(|s| s.origin == Origin::Source))
            .collect();
        let pool = if source.is_empty() { candidates.to_vec() } else { source };
        match pool.as_slice() {
            [] => TypePick::Missing,
            [only] => TypePick::Found(*only),
            _ => TypePick::Ambiguous,
        }
    }

    /// Non-type members named `name` on `ty` or the nearest base that
    /// declares any.
    pub fn lookup_members(&self, ty: SymbolId, name: &str) -> Vec<SymbolId> {
        let mut current = Some(ty);
        let mut guard = 0;
        while let Some(t) = current {
            let found: Vec<SymbolId> = self
                .children(t)
                .iter()
                .copied()
                .filter(|&c| {
                    self.get(c)
                        .is_some_and(|s| s.kind != SymbolKind::Type && s.name == name)
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
            current = self.get(t).and_then(|s| s.base);
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        Vec::new()
    }

    /// Nested types named `name` on `ty` or its bases.
    pub fn lookup_nested_types(&self, ty: SymbolId, name: &str, arity: Option<usize>) -> Vec<SymbolId> {
        let mut current = Some(ty);
        let mut guard = 0;
        while let Some(t) = current {
            let found = self.types_named(t, name, arity);
            if !found.is_empty() {
                return found;
            }
            current = self.get(t).and_then(|s| s.base);
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        Vec::new()
    }

    /// Whether `ty` is `target` or derives from it.
    pub fn derives_from(&self, ty: SymbolId, target: SymbolId) -> bool {
        let mut current = Some(ty);
        let mut guard = 0;
        while let Some(t) = current {
            if t == target {
                return true;
            }
            current = self.get(t).and_then(|s| s.base);
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        false
    }

    /// Fully qualified name with `.` separators, e.g. `System.Threading.Thread`.
    pub fn display(&self, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(symbol) = self.get(c) else {
                break;
            };
            if c == self.global {
                break;
            }
            parts.push(symbol.name.as_str());
            current = symbol.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Look up a type by metadata name: `Ns.Outer+Inner`, with generic
    /// arity written as `` Name`2 ``.
    pub fn type_by_metadata_name(&self, metadata_name: &str) -> Option<SymbolId> {
        let mut segments = metadata_name.split('+');
        let outer = segments.next()?;
        let (ns_path, type_name) = match outer.rfind('.') {
            Some(dot) => (&outer[..dot], &outer[dot + 1..]),
            None => ("", outer),
        };
        let mut ns = self.global;
        if !ns_path.is_empty() {
            for part in ns_path.split('.') {
                ns = self.namespace_child(ns, part)?;
            }
        }
        let (name, arity) = split_arity(type_name);
        let mut ty = self.pick_type(&self.types_named(ns, name, Some(arity))).found()?;
        for nested in segments {
            let (name, arity) = split_arity(nested);
            ty = self.pick_type(&self.types_named(ty, name, Some(arity))).found()?;
        }
        Some(ty)
    }
}

fn split_arity(name: &str) -> (&str, usize) {
    match name.split_once('`') {
        Some((base, arity)) => (base, arity.parse().unwrap_or(0)),
        None => (name, 0),
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// An immutable, fully declared and bound compilation.
#[derive(Debug)]
pub struct CSharpCompilation {
    id: CompilationId,
    table: SymbolTable,
}

impl CSharpCompilation {
    pub(crate) fn new(id: CompilationId, table: SymbolTable) -> Self {
        CSharpCompilation { id, table }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn to_ref(&self, id: SymbolId) -> SymbolRef {
        SymbolRef::new(self.id, id)
    }

    /// The local symbol id of `symbol`, if it belongs to this compilation.
    pub fn local(&self, symbol: SymbolRef) -> Option<SymbolId> {
        (symbol.compilation == self.id && self.table.get(symbol.id).is_some()).then_some(symbol.id)
    }
}

impl Compilation for CSharpCompilation {
    fn id(&self) -> CompilationId {
        self.id
    }

    fn type_by_metadata_name(&self, metadata_name: &str) -> Option<SymbolRef> {
        self.table
            .type_by_metadata_name(metadata_name)
            .map(|id| self.to_ref(id))
    }

    fn members(&self, ty: SymbolRef) -> Vec<SymbolRef> {
        match self.local(ty) {
            Some(id) if self.table.kind(id) == Some(SymbolKind::Type) => self
                .table
                .children(id)
                .iter()
                .map(|&c| self.to_ref(c))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn symbol_name(&self, symbol: SymbolRef) -> Option<&str> {
        self.local(symbol).map(|id| self.table.name(id))
    }

    fn symbol_kind(&self, symbol: SymbolRef) -> Option<SymbolKind> {
        self.local(symbol).and_then(|id| self.table.kind(id))
    }

    fn symbol_display(&self, symbol: SymbolRef) -> String {
        match self.local(symbol) {
            Some(id) => self.table.display(id),
            None => symbol.to_string(),
        }
    }
}

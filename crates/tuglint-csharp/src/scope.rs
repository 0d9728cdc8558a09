// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Lexical scopes and name lookup.
//!
//! Scopes form a parent-linked arena per document. A scope never changes
//! after it is pushed: declaring a local pushes a new child scope, and every
//! later statement in the block binds against that child.
//!
//! Simple-name lookup walks outward, trying in order:
//!
//! 1. locals, then parameters
//! 2. members and nested types of each enclosing type, bases included
//! 3. at each namespace level: the namespace's own types and namespaces,
//!    then using aliases, then types from using-namespace directives, then
//!    members of using-static types

use tuglint_core::semantic::{SymbolId, SymbolKind};

use crate::symbols::{SymbolTable, TypePick};
use crate::syntax::{QualifiedName, TypeSyntax};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// A namespace or type, as named by a using directive or qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOrType {
    Namespace(SymbolId),
    Type(SymbolId),
}

/// Resolved using directives of one namespace level.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    pub namespaces: Vec<SymbolId>,
    pub static_types: Vec<SymbolId>,
    pub aliases: Vec<(String, NamespaceOrType)>,
}

impl Imports {
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty() && self.static_types.is_empty() && self.aliases.is_empty()
    }

    fn alias(&self, name: &str) -> Option<NamespaceOrType> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| *target)
    }
}

#[derive(Debug, Clone)]
pub enum ScopeKind {
    Namespace { ns: SymbolId, imports: Imports },
    Type(SymbolId),
    Parameters(Vec<(String, SymbolId)>),
    Local { name: String, symbol: SymbolId },
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
}

#[derive(Debug, Clone, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { parent, kind });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// `id` and its ancestors, innermost first.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.get(id), move |s| s.parent.and_then(|p| self.get(p)))
    }
}

/// Result of looking up a simple name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Local(SymbolId),
    Parameter(SymbolId),
    /// Members named by the lookup, all declared on (or inherited by)
    /// `container`. `implicit_this` is set when they were found through an
    /// enclosing type rather than a using-static directive.
    Members {
        symbols: Vec<SymbolId>,
        container: SymbolId,
        implicit_this: bool,
    },
    Type(SymbolId),
    Namespace(SymbolId),
    Ambiguous,
    NotFound,
}

/// Metadata name of a predefined type keyword.
pub fn predefined_metadata_name(keyword: &str) -> Option<&'static str> {
    Some(match keyword {
        "bool" => "System.Boolean",
        "byte" => "System.Byte",
        "sbyte" => "System.SByte",
        "char" => "System.Char",
        "decimal" => "System.Decimal",
        "double" => "System.Double",
        "float" => "System.Single",
        "int" => "System.Int32",
        "uint" => "System.UInt32",
        "long" => "System.Int64",
        "ulong" => "System.UInt64",
        "short" => "System.Int16",
        "ushort" => "System.UInt16",
        "object" => "System.Object",
        "string" => "System.String",
        "void" => "System.Void",
        _ => return None,
    })
}

/// Read-only name resolution over one document's scopes.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pub table: &'a SymbolTable,
    pub scopes: &'a Scopes,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a SymbolTable, scopes: &'a Scopes) -> Self {
        Resolver { table, scopes }
    }

    /// The innermost type enclosing `scope`.
    pub fn enclosing_type(&self, scope: ScopeId) -> Option<SymbolId> {
        self.scopes.chain(scope).find_map(|s| match s.kind {
            ScopeKind::Type(t) => Some(t),
            _ => None,
        })
    }

    /// Look up a simple name used as an expression.
    pub fn lookup(&self, scope: ScopeId, name: &str, arity: usize) -> Lookup {
        for s in self.scopes.chain(scope) {
            match &s.kind {
                ScopeKind::Local { name: local, symbol } if arity == 0 && local == name => {
                    return Lookup::Local(*symbol);
                }
                ScopeKind::Local { .. } => {}
                ScopeKind::Parameters(params) => {
                    if arity == 0 {
                        if let Some((_, symbol)) = params.iter().find(|(p, _)| p == name) {
                            return Lookup::Parameter(*symbol);
                        }
                    }
                }
                ScopeKind::Type(ty) => {
                    if arity == 0 {
                        let members = self.table.lookup_members(*ty, name);
                        if !members.is_empty() {
                            return Lookup::Members {
                                symbols: members,
                                container: *ty,
                                implicit_this: true,
                            };
                        }
                    }
                    if let Some(found) =
                        self.pick(&self.table.lookup_nested_types(*ty, name, Some(arity)))
                    {
                        return found;
                    }
                }
                ScopeKind::Namespace { ns, imports } => {
                    let found = self.lookup_in_namespace_level(*ns, imports, name, arity, true);
                    if found != Lookup::NotFound {
                        return found;
                    }
                }
            }
        }
        Lookup::NotFound
    }

    /// Look up a simple name in a type context: locals and members are
    /// skipped.
    pub fn lookup_namespace_or_type(&self, scope: ScopeId, name: &str, arity: usize) -> Lookup {
        for s in self.scopes.chain(scope) {
            match &s.kind {
                ScopeKind::Type(ty) => {
                    if let Some(found) =
                        self.pick(&self.table.lookup_nested_types(*ty, name, Some(arity)))
                    {
                        return found;
                    }
                }
                ScopeKind::Namespace { ns, imports } => {
                    let found = self.lookup_in_namespace_level(*ns, imports, name, arity, false);
                    if found != Lookup::NotFound {
                        return found;
                    }
                }
                ScopeKind::Local { .. } | ScopeKind::Parameters(_) => {}
            }
        }
        Lookup::NotFound
    }

    fn pick(&self, candidates: &[SymbolId]) -> Option<Lookup> {
        match self.table.pick_type(candidates) {
            TypePick::Found(t) => Some(Lookup::Type(t)),
            TypePick::Ambiguous => Some(Lookup::Ambiguous),
            TypePick::Missing => None,
        }
    }

    fn lookup_in_namespace_level(
        &self,
        ns: SymbolId,
        imports: &Imports,
        name: &str,
        arity: usize,
        include_members: bool,
    ) -> Lookup {
        if let Some(found) = self.pick(&self.table.types_named(ns, name, Some(arity))) {
            return found;
        }
        if arity == 0 {
            if let Some(child) = self.table.namespace_child(ns, name) {
                return Lookup::Namespace(child);
            }
            match imports.alias(name) {
                Some(NamespaceOrType::Namespace(n)) => return Lookup::Namespace(n),
                Some(NamespaceOrType::Type(t)) => return Lookup::Type(t),
                None => {}
            }
        }

        // Types from imported namespaces. One namespace may hold the same type
        // from source and a reference; two namespaces supplying it is a clash.
        let mut found: Option<SymbolId> = None;
        for &imported in &imports.namespaces {
            match self.table.pick_type(&self.table.types_named(imported, name, Some(arity))) {
                TypePick::Found(t) if found.is_some_and(|f| f != t) => return Lookup::Ambiguous,
                TypePick::Found(t) => found = Some(t),
                TypePick::Ambiguous => return Lookup::Ambiguous,
                TypePick::Missing => {}
            }
        }
        if let Some(t) = found {
            return Lookup::Type(t);
        }

        for &ty in &imports.static_types {
            if let Some(found) = self.pick(&self.table.lookup_nested_types(ty, name, Some(arity))) {
                return found;
            }
            if include_members && arity == 0 {
                let members: Vec<SymbolId> = self
                    .table
                    .lookup_members(ty, name)
                    .into_iter()
                    .filter(|&m| self.table.get(m).is_some_and(|s| s.is_static))
                    .collect();
                if !members.is_empty() {
                    return Lookup::Members {
                        symbols: members,
                        container: ty,
                        implicit_this: false,
                    };
                }
            }
        }
        Lookup::NotFound
    }

    /// A namespace or type named `name` inside `container`.
    pub fn member_of(&self, container: NamespaceOrType, name: &str, arity: usize) -> Option<NamespaceOrType> {
        match container {
            NamespaceOrType::Namespace(ns) => {
                if let Some(t) = self.table.pick_type(&self.table.types_named(ns, name, Some(arity))).found() {
                    return Some(NamespaceOrType::Type(t));
                }
                if arity == 0 {
                    return self.table.namespace_child(ns, name).map(NamespaceOrType::Namespace);
                }
                None
            }
            NamespaceOrType::Type(ty) => self
                .table
                .pick_type(&self.table.lookup_nested_types(ty, name, Some(arity)))
                .found()
                .map(NamespaceOrType::Type),
        }
    }

    /// Resolve the left side of `alias::Name`. `global` is the global
    /// namespace; anything else must be a using alias in scope.
    pub fn resolve_alias(&self, scope: Option<ScopeId>, alias: &str) -> Option<NamespaceOrType> {
        if alias == "global" {
            return Some(NamespaceOrType::Namespace(self.table.global()));
        }
        let scope = scope?;
        self.scopes.chain(scope).find_map(|s| match &s.kind {
            ScopeKind::Namespace { imports, .. } => imports.alias(alias),
            _ => None,
        })
    }

    /// Resolve a dotted name. `scope` of `None` resolves from the global
    /// namespace alone, as using directives at file level do.
    pub fn resolve_parts(
        &self,
        scope: Option<ScopeId>,
        alias: Option<&str>,
        parts: &[(&str, usize)],
    ) -> Option<NamespaceOrType> {
        let (first, rest) = parts.split_first()?;
        let mut current = match (alias, scope) {
            (Some(alias), _) => {
                let start = self.resolve_alias(scope, alias)?;
                self.member_of(start, first.0, first.1)?
            }
            (None, Some(scope)) => match self.lookup_namespace_or_type(scope, first.0, first.1) {
                Lookup::Type(t) => NamespaceOrType::Type(t),
                Lookup::Namespace(n) => NamespaceOrType::Namespace(n),
                _ => return None,
            },
            (None, None) => self.member_of(
                NamespaceOrType::Namespace(self.table.global()),
                first.0,
                first.1,
            )?,
        };
        for (name, arity) in rest {
            current = self.member_of(current, name, *arity)?;
        }
        Some(current)
    }

    pub fn resolve_qualified(&self, scope: Option<ScopeId>, name: &QualifiedName) -> Option<NamespaceOrType> {
        let parts: Vec<(&str, usize)> = name
            .parts
            .iter()
            .map(|p| (p.ident.text.as_str(), p.type_args.len()))
            .collect();
        self.resolve_parts(scope, name.alias.as_ref().map(|a| a.text.as_str()), &parts)
    }

    /// Resolve a type reference. Arrays and tuples are not modelled;
    /// `T?` resolves to `T`.
    pub fn resolve_type(&self, scope: ScopeId, ty: &TypeSyntax) -> Option<SymbolId> {
        match ty {
            TypeSyntax::Predefined { keyword, .. } => {
                self.table.type_by_metadata_name(predefined_metadata_name(keyword)?)
            }
            TypeSyntax::Named(name) => match self.resolve_qualified(Some(scope), name)? {
                NamespaceOrType::Type(t) => Some(t),
                NamespaceOrType::Namespace(_) => None,
            },
            TypeSyntax::Nullable { inner, .. } => self.resolve_type(scope, inner),
            TypeSyntax::Array { .. } | TypeSyntax::Tuple { .. } => None,
        }
    }

    /// Whether `symbol` is a static member (or a type, which is always
    /// accessed statically).
    pub fn is_static(&self, symbol: SymbolId) -> bool {
        self.table
            .get(symbol)
            .is_some_and(|s| s.is_static || s.kind == SymbolKind::Type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Origin;
    use crate::syntax::TypeKind;

    struct Fixture {
        table: SymbolTable,
        scopes: Scopes,
        thread: SymbolId,
        current: SymbolId,
        system: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut table = SymbolTable::new();
        let system = table.add_namespace(table.global(), "System");
        let threading = table.add_namespace(system, "Threading");
        let thread = table.add_type(threading, "Thread", 0, TypeKind::Class, Origin::Reference(0), false);
        let current = table.add_member(thread, "CurrentThread", SymbolKind::Property, true, 0);
        table.add_type(system, "Environment", 0, TypeKind::Class, Origin::Reference(0), true);
        Fixture {
            table,
            scopes: Scopes::default(),
            thread,
            current,
            system,
        }
    }

    #[test]
    fn using_namespace_brings_types_into_scope() {
        let mut f = fixture();
        let threading = f.table.namespace_child(f.system, "Threading");
        let imports = Imports {
            namespaces: threading.into_iter().collect(),
            ..Imports::default()
        };
        let root = f.scopes.push(
            None,
            ScopeKind::Namespace {
                ns: f.table.global(),
                imports,
            },
        );
        let r = Resolver::new(&f.table, &f.scopes);
        assert_eq!(r.lookup(root, "Thread", 0), Lookup::Type(f.thread));
        assert_eq!(r.lookup(root, "Thread", 1), Lookup::NotFound);
        assert_eq!(r.lookup(root, "Environment", 0), Lookup::NotFound);
        assert_eq!(r.lookup(root, "System", 0), Lookup::Namespace(f.system));
    }

    #[test]
    fn locals_shadow_members_and_types() {
        let mut f = fixture();
        let local = f.table.add_variable("Thread", SymbolKind::Local, None);
        let root = f.scopes.push(
            None,
            ScopeKind::Namespace {
                ns: f.table.global(),
                imports: Imports::default(),
            },
        );
        let inner = f.scopes.push(
            Some(root),
            ScopeKind::Local {
                name: "Thread".to_string(),
                symbol: local,
            },
        );
        let r = Resolver::new(&f.table, &f.scopes);
        assert_eq!(r.lookup(inner, "Thread", 0), Lookup::Local(local));
        assert_eq!(r.lookup_namespace_or_type(inner, "Thread", 0), Lookup::NotFound);
    }

    #[test]
    fn using_static_exposes_static_members() {
        let mut f = fixture();
        let imports = Imports {
            static_types: vec![f.thread],
            ..Imports::default()
        };
        let root = f.scopes.push(
            None,
            ScopeKind::Namespace {
                ns: f.table.global(),
                imports,
            },
        );
        let r = Resolver::new(&f.table, &f.scopes);
        assert_eq!(
            r.lookup(root, "CurrentThread", 0),
            Lookup::Members {
                symbols: vec![f.current],
                container: f.thread,
                implicit_this: false,
            }
        );
    }

    #[test]
    fn aliases_and_global_qualification() {
        let mut f = fixture();
        let imports = Imports {
            aliases: vec![("T".to_string(), NamespaceOrType::Type(f.thread))],
            ..Imports::default()
        };
        let root = f.scopes.push(
            None,
            ScopeKind::Namespace {
                ns: f.table.global(),
                imports,
            },
        );
        let r = Resolver::new(&f.table, &f.scopes);
        assert_eq!(r.lookup(root, "T", 0), Lookup::Type(f.thread));
        assert_eq!(
            r.resolve_parts(Some(root), Some("global"), &[("System", 0), ("Threading", 0), ("Thread", 0)]),
            Some(NamespaceOrType::Type(f.thread))
        );
        assert!(matches!(
            r.resolve_parts(None, None, &[("System", 0), ("Environment", 0)]),
            Some(NamespaceOrType::Type(_))
        ));
    }

    #[test]
    fn conflicting_imports_are_ambiguous() {
        let mut f = fixture();
        let other = f.table.add_namespace(f.table.global(), "Other");
        f.table.add_type(other, "Thread", 0, TypeKind::Class, Origin::Source, false);
        let threading = f.table.namespace_child(f.system, "Threading");
        let imports = Imports {
            namespaces: threading.into_iter().chain([other]).collect(),
            ..Imports::default()
        };
        let root = f.scopes.push(
            None,
            ScopeKind::Namespace {
                ns: f.table.global(),
                imports,
            },
        );
        let r = Resolver::new(&f.table, &f.scopes);
        assert_eq!(r.lookup(root, "Thread", 0), Lookup::Ambiguous);
    }
}

// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Building a compilation from source files and metadata references.
//!
//! Building runs in passes over every syntax tree:
//!
//! 1. declare namespaces, types and members
//! 2. build declaration scopes and resolve using directives
//! 3. resolve base classes
//! 4. resolve member types
//! 5. bind member bodies of source files
//!
//! The result is immutable: a [`Project`] holding the shared compilation and
//! one [`CSharpDocument`] per source file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use tuglint_core::patch::FileId;
use tuglint_core::semantic::{CompilationId, NodeId, Operation, SymbolId, SymbolKind};

use crate::binder::Binder;
use crate::document::CSharpDocument;
use crate::error::ParseError;
use crate::parser::parse;
use crate::reference::MetadataReference;
use crate::scope::{Imports, NamespaceOrType, Resolver, ScopeId, ScopeKind, Scopes};
use crate::symbols::{CSharpCompilation, Origin, SymbolTable};
use crate::syntax::*;

static NEXT_COMPILATION_ID: AtomicU64 = AtomicU64::new(1);

/// A parsed source file waiting to be compiled.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub tree: SyntaxTree,
    pub generated: bool,
}

/// Collects sources and references, then builds a [`Project`].
#[derive(Debug, Default)]
pub struct CompilationBuilder {
    sources: Vec<SourceFile>,
    references: Vec<MetadataReference>,
}

/// A built compilation and its documents, in the order sources were added.
#[derive(Debug)]
pub struct Project {
    pub compilation: Arc<CSharpCompilation>,
    pub documents: Vec<CSharpDocument>,
}

impl CompilationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add a source file.
    pub fn add_source(
        &mut self,
        path: impl Into<String>,
        text: &str,
        generated: bool,
    ) -> Result<FileId, ParseError> {
        let path = path.into();
        let tree = parse(&path, text)?;
        Ok(self.add_tree(path, tree, generated))
    }

    /// Add an already parsed source file.
    pub fn add_tree(&mut self, path: impl Into<String>, tree: SyntaxTree, generated: bool) -> FileId {
        let id = FileId::new(self.sources.len() as u32);
        self.sources.push(SourceFile {
            path: path.into(),
            tree,
            generated,
        });
        id
    }

    pub fn add_reference(&mut self, reference: MetadataReference) -> &mut Self {
        self.references.push(reference);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn build(self) -> Project {
        let CompilationBuilder {
            sources,
            references,
        } = self;
        let id = CompilationId(NEXT_COMPILATION_ID.fetch_add(1, Ordering::Relaxed));
        let mut table = SymbolTable::new();

        let units: Vec<(&SyntaxTree, Origin)> = sources
            .iter()
            .map(|s| (&s.tree, Origin::Source))
            .chain(references.iter().enumerate().flat_map(|(i, r)| {
                r.trees().iter().map(move |t| (t, Origin::Reference(i as u32)))
            }))
            .collect();

        // Pass 1: declarations.
        let mut declared: HashMap<(usize, NodeId), SymbolId> = HashMap::new();
        for (unit, &(tree, origin)) in units.iter().enumerate() {
            let global = table.global();
            declare_members(&mut table, &mut declared, unit, &tree.root.members, global, origin);
        }

        // Pass 2: declaration scopes.
        let global_imports = {
            let scopes = Scopes::default();
            let resolver = Resolver::new(&table, &scopes);
            let usings: Vec<&UsingDirective> = sources
                .iter()
                .flat_map(|s| s.tree.root.usings.iter())
                .filter(|u| u.global)
                .collect();
            let mut imports = Imports::default();
            resolve_imports(&resolver, None, usings, &mut imports);
            imports
        };
        let mut unit_scopes: Vec<Scopes> = Vec::with_capacity(units.len());
        let mut unit_roots: Vec<ScopeId> = Vec::with_capacity(units.len());
        let mut entries: Vec<TypeEntry<'_>> = Vec::new();
        for (unit, &(tree, origin)) in units.iter().enumerate() {
            let mut scopes = Scopes::default();
            let mut imports = if origin == Origin::Source {
                global_imports.clone()
            } else {
                Imports::default()
            };
            {
                let resolver = Resolver::new(&table, &scopes);
                let local = tree.root.usings.iter().filter(|u| !u.global);
                resolve_imports(&resolver, None, local, &mut imports);
            }
            let root = scopes.push(
                None,
                ScopeKind::Namespace {
                    ns: table.global(),
                    imports,
                },
            );
            let mut walker = ScopeWalker {
                table: &table,
                declared: &declared,
                unit,
                scopes: &mut scopes,
                entries: &mut entries,
            };
            walker.walk(&tree.root.members, root, table.global());
            unit_scopes.push(scopes);
            unit_roots.push(root);
        }

        // Pass 3: base classes. Explicit bases first so a partial without a
        // base list does not reset one declared elsewhere.
        let object = table.type_by_metadata_name("System.Object");
        let mut bases: Vec<(SymbolId, SymbolId)> = Vec::new();
        for entry in &entries {
            let resolver = Resolver::new(&table, &unit_scopes[entry.unit]);
            let outer = entry.outer;
            let base = entry.decl.bases.iter().find_map(|b| {
                let t = resolver.resolve_type(outer, b)?;
                let kind = table.get(t).and_then(|s| s.type_kind);
                matches!(kind, Some(TypeKind::Class) | Some(TypeKind::Record)).then_some(t)
            });
            if let Some(base) = base {
                if base != entry.symbol && !table.derives_from(base, entry.symbol) {
                    bases.push((entry.symbol, base));
                }
            }
        }
        for (ty, base) in bases {
            table.set_base(ty, Some(base));
        }
        for entry in &entries {
            let needs_default = table.get(entry.symbol).is_some_and(|s| {
                s.base.is_none() && s.type_kind != Some(TypeKind::Interface)
            });
            if needs_default && Some(entry.symbol) != object {
                table.set_base(entry.symbol, object);
            }
        }

        // Pass 4: member types.
        let mut member_types: Vec<(SymbolId, Option<SymbolId>)> = Vec::new();
        for entry in &entries {
            let resolver = Resolver::new(&table, &unit_scopes[entry.unit]);
            let scope = entry.scope;
            let lookup = |node: NodeId| declared.get(&(entry.unit, node)).copied();
            for member in &entry.decl.members {
                match member {
                    MemberDecl::Field(field) => {
                        let ty = resolver.resolve_type(scope, &field.ty);
                        for declarator in &field.declarators {
                            if let Some(symbol) = lookup(declarator.id) {
                                member_types.push((symbol, ty));
                            }
                        }
                    }
                    MemberDecl::Property(prop) => {
                        if let Some(symbol) = lookup(prop.id) {
                            member_types.push((symbol, resolver.resolve_type(scope, &prop.ty)));
                        }
                    }
                    MemberDecl::Method(method) => {
                        if let Some(symbol) = lookup(method.id) {
                            member_types
                                .push((symbol, resolver.resolve_type(scope, &method.return_type)));
                        }
                    }
                    MemberDecl::EnumMember(member) => {
                        if let Some(symbol) = lookup(member.id) {
                            member_types.push((symbol, Some(entry.symbol)));
                        }
                    }
                    MemberDecl::Constructor(ctor) => {
                        if let Some(symbol) = lookup(ctor.id) {
                            member_types.push((symbol, Some(entry.symbol)));
                        }
                    }
                    MemberDecl::Type(_) | MemberDecl::Namespace(_) => {}
                }
            }
        }
        for (symbol, ty) in member_types {
            table.set_type(symbol, ty);
        }

        // Pass 5: bind source bodies.
        let mut bindings: Vec<(Scopes, HashMap<NodeId, ScopeId>, Vec<Operation>)> =
            Vec::with_capacity(sources.len());
        let mut unit_scopes = unit_scopes.into_iter();
        for (unit, source) in sources.iter().enumerate() {
            let mut scopes = unit_scopes.next().unwrap_or_default();
            let mut node_scopes = HashMap::new();
            let mut operations = Vec::new();
            {
                let mut binder = Binder::new(&mut table, &source.tree, &mut scopes, &mut node_scopes, id);
                if let Some(&root) = unit_roots.get(unit) {
                    binder.bind_top_level(&source.tree.root.statements, root, &mut operations);
                }
                for entry in entries.iter().filter(|e| e.unit == unit) {
                    binder.bind_type_members(entry.decl, entry.scope, &mut operations);
                }
            }
            operations.sort_by_key(|op| (op.span.start, op.span.end));
            bindings.push((scopes, node_scopes, operations));
        }
        drop(entries);
        drop(units);

        debug!(
            compilation = id.0,
            sources = sources.len(),
            references = references.len(),
            symbols = table.len(),
            "compilation built"
        );

        let compilation = Arc::new(CSharpCompilation::new(id, table));
        let documents = sources
            .into_iter()
            .zip(bindings)
            .enumerate()
            .map(|(index, (source, (scopes, node_scopes, operations)))| {
                CSharpDocument::new(
                    FileId::new(index as u32),
                    source.path,
                    source.tree,
                    Arc::clone(&compilation),
                    operations,
                    scopes,
                    node_scopes,
                    source.generated,
                )
            })
            .collect();
        Project {
            compilation,
            documents,
        }
    }
}

// ============================================================================
// Declaration
// ============================================================================

fn declare_members(
    table: &mut SymbolTable,
    declared: &mut HashMap<(usize, NodeId), SymbolId>,
    unit: usize,
    members: &[MemberDecl],
    container: SymbolId,
    origin: Origin,
) {
    for member in members {
        match member {
            MemberDecl::Namespace(ns) => {
                let mut current = container;
                for part in &ns.name.parts {
                    current = table.add_namespace(current, &part.ident.text);
                }
                declare_members(table, declared, unit, &ns.members, current, origin);
            }
            MemberDecl::Type(decl) => {
                let symbol = table.add_type(
                    container,
                    &decl.name.text,
                    decl.type_params.len(),
                    decl.kind,
                    origin,
                    decl.modifiers.is_static(),
                );
                declared.insert((unit, decl.id), symbol);
                declare_members(table, declared, unit, &decl.members, symbol, origin);
            }
            MemberDecl::Field(field) => {
                let is_static = field.modifiers.is_static();
                for declarator in &field.declarators {
                    let symbol =
                        table.add_member(container, &declarator.name.text, SymbolKind::Field, is_static, 0);
                    declared.insert((unit, declarator.id), symbol);
                }
            }
            MemberDecl::EnumMember(member) => {
                let symbol = table.add_member(container, &member.name.text, SymbolKind::Field, true, 0);
                declared.insert((unit, member.id), symbol);
            }
            MemberDecl::Property(prop) => {
                let symbol = table.add_member(
                    container,
                    &prop.name.text,
                    SymbolKind::Property,
                    prop.modifiers.is_static(),
                    prop.params.len(),
                );
                declared.insert((unit, prop.id), symbol);
            }
            MemberDecl::Method(method) => {
                let symbol = table.add_member(
                    container,
                    &method.name.text,
                    SymbolKind::Method,
                    method.modifiers.is_static(),
                    method.params.len(),
                );
                declared.insert((unit, method.id), symbol);
            }
            MemberDecl::Constructor(ctor) => {
                let symbol = table.add_member(
                    container,
                    ".ctor",
                    SymbolKind::Constructor,
                    ctor.modifiers.is_static(),
                    ctor.params.len(),
                );
                declared.insert((unit, ctor.id), symbol);
            }
        }
    }
}

// ============================================================================
// Declaration Scopes
// ============================================================================

/// A type declaration with the scope inside it (`scope`) and the scope
/// it is declared in (`outer`).
struct TypeEntry<'t> {
    unit: usize,
    decl: &'t TypeDecl,
    symbol: SymbolId,
    scope: ScopeId,
    outer: ScopeId,
}

struct ScopeWalker<'a, 't> {
    table: &'a SymbolTable,
    declared: &'a HashMap<(usize, NodeId), SymbolId>,
    unit: usize,
    scopes: &'a mut Scopes,
    entries: &'a mut Vec<TypeEntry<'t>>,
}

impl<'a, 't> ScopeWalker<'a, 't> {
    fn walk(&mut self, members: &'t [MemberDecl], scope: ScopeId, ns: SymbolId) {
        for member in members {
            match member {
                MemberDecl::Namespace(decl) => {
                    let mut scope = scope;
                    let mut current = ns;
                    let last = decl.name.parts.len().saturating_sub(1);
                    for (index, part) in decl.name.parts.iter().enumerate() {
                        let Some(child) = self.table.namespace_child(current, &part.ident.text) else {
                            break;
                        };
                        current = child;
                        let mut imports = Imports::default();
                        if index == last {
                            let resolver = Resolver::new(self.table, self.scopes);
                            resolve_imports(&resolver, Some(scope), decl.usings.iter(), &mut imports);
                        }
                        scope = self
                            .scopes
                            .push(Some(scope), ScopeKind::Namespace { ns: current, imports });
                    }
                    self.walk(&decl.members, scope, current);
                }
                MemberDecl::Type(decl) => {
                    let Some(&symbol) = self.declared.get(&(self.unit, decl.id)) else {
                        continue;
                    };
                    let inner = self.scopes.push(Some(scope), ScopeKind::Type(symbol));
                    self.entries.push(TypeEntry {
                        unit: self.unit,
                        decl,
                        symbol,
                        scope: inner,
                        outer: scope,
                    });
                    self.walk(&decl.members, inner, ns);
                }
                _ => {}
            }
        }
    }
}

/// Resolve using directives into `imports`. Targets resolve in `context`,
/// or from the global namespace when `context` is `None`.
fn resolve_imports<'u>(
    resolver: &Resolver<'_>,
    context: Option<ScopeId>,
    usings: impl IntoIterator<Item = &'u UsingDirective>,
    imports: &mut Imports,
) {
    for using in usings {
        let target = match &using.target {
            TypeSyntax::Named(name) => resolver.resolve_qualified(context, name),
            TypeSyntax::Predefined { keyword, .. } => crate::scope::predefined_metadata_name(keyword)
                .and_then(|n| resolver.table.type_by_metadata_name(n))
                .map(NamespaceOrType::Type),
            _ => None,
        };
        match (&using.kind, target) {
            (UsingKind::Namespace, Some(NamespaceOrType::Namespace(ns))) => imports.namespaces.push(ns),
            (UsingKind::Static, Some(NamespaceOrType::Type(ty))) => imports.static_types.push(ty),
            (UsingKind::Alias(alias), Some(target)) => {
                imports.aliases.push((alias.text.clone(), target));
            }
            (kind, target) => {
                warn!(?kind, resolved = target.is_some(), "ignoring unresolved using directive");
            }
        }
    }
}

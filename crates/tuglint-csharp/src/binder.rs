// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Binding: syntax to operations.
//!
//! The binder walks member bodies and initializers of one document and
//! produces the document's root [`Operation`]s. Names bind through the
//! scope arena; member access binds against the static type of its
//! receiver. Anything that does not bind becomes
//! [`OperationData::Invalid`] holding whatever children did bind, so a
//! broken subexpression never hides a well-formed one next to it.

use std::collections::HashMap;

use tuglint_core::patch::Span;
use tuglint_core::semantic::{
    CompilationId, NodeId, Operation, OperationData, PropertyReference, SymbolId, SymbolKind,
    SymbolRef,
};

use crate::scope::{Lookup, NamespaceOrType, Resolver, ScopeId, ScopeKind, Scopes};
use crate::symbols::SymbolTable;
use crate::syntax::*;

/// An expression bound in a context where it may also name a type or
/// namespace, such as the receiver of a member access.
#[derive(Debug, Clone)]
enum Bound {
    Value(Operation),
    Type(SymbolId),
    Namespace(SymbolId),
    /// `Color Color`: a value whose type has the same name as the value.
    /// Static members bind through the type, instance members through the
    /// value.
    ColorColor {
        value: Operation,
        ty: SymbolId,
    },
    Methods {
        methods: Vec<SymbolId>,
        instance: Option<Operation>,
    },
    Error(Vec<Operation>),
}

pub(crate) struct Binder<'a> {
    pub table: &'a mut SymbolTable,
    pub tree: &'a SyntaxTree,
    pub scopes: &'a mut Scopes,
    pub node_scopes: &'a mut HashMap<NodeId, ScopeId>,
    pub compilation: CompilationId,
    /// Receiver node and type of each enclosing `?.`.
    conditional_receivers: Vec<(NodeId, Option<SymbolId>)>,
}

impl<'a> Binder<'a> {
    pub fn new(
        table: &'a mut SymbolTable,
        tree: &'a SyntaxTree,
        scopes: &'a mut Scopes,
        node_scopes: &'a mut HashMap<NodeId, ScopeId>,
        compilation: CompilationId,
    ) -> Self {
        Binder {
            table,
            tree,
            scopes,
            node_scopes,
            compilation,
            conditional_receivers: Vec::new(),
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&*self.table, &*self.scopes)
    }

    fn to_ref(&self, id: SymbolId) -> SymbolRef {
        SymbolRef::new(self.compilation, id)
    }

    fn known(&self, metadata_name: &str) -> Option<SymbolId> {
        self.table.type_by_metadata_name(metadata_name)
    }

    fn op(&self, node: NodeId, ty: Option<SymbolId>, data: OperationData) -> Operation {
        Operation {
            syntax: node,
            span: self.tree.node_span(node).unwrap_or(Span::new(0, 0)),
            ty: ty.map(|t| self.to_ref(t)),
            data,
        }
    }

    fn invalid(&self, node: NodeId, children: Vec<Operation>) -> Operation {
        self.op(node, None, OperationData::Invalid { children })
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    /// Bind the bodies and initializers of the members of one type
    /// declaration. Nested types are bound separately.
    pub fn bind_type_members(&mut self, decl: &TypeDecl, scope: ScopeId, out: &mut Vec<Operation>) {
        for member in &decl.members {
            match member {
                MemberDecl::Field(field) => {
                    for declarator in &field.declarators {
                        if let Some(init) = &declarator.init {
                            out.push(self.bind_expr(init, scope));
                        }
                    }
                }
                MemberDecl::EnumMember(member) => {
                    if let Some(value) = &member.value {
                        out.push(self.bind_expr(value, scope));
                    }
                }
                MemberDecl::Property(prop) => self.bind_property(prop, scope, out),
                MemberDecl::Method(method) => {
                    let inner = self.declare_parameters(&method.params, scope, out);
                    self.bind_body(method.body.as_ref(), inner, out);
                }
                MemberDecl::Constructor(ctor) => {
                    let inner = self.declare_parameters(&ctor.params, scope, out);
                    if let Some(init) = &ctor.initializer {
                        for arg in &init.args {
                            out.push(self.bind_expr(&arg.expr, inner));
                        }
                    }
                    self.bind_body(ctor.body.as_ref(), inner, out);
                }
                MemberDecl::Type(_) | MemberDecl::Namespace(_) => {}
            }
        }
    }

    fn bind_property(&mut self, prop: &PropertyDecl, scope: ScopeId, out: &mut Vec<Operation>) {
        let scope = self.declare_parameters(&prop.params, scope, out);
        match &prop.body {
            PropertyBody::Expression(expr) => out.push(self.bind_expr(expr, scope)),
            PropertyBody::Accessors(accessors) => {
                for accessor in accessors {
                    let accessor_scope = if matches!(accessor.keyword.as_str(), "set" | "init") {
                        let ty = self.resolver().resolve_type(scope, &prop.ty);
                        let value = self.table.add_variable("value", SymbolKind::Parameter, ty);
                        self.scopes.push(
                            Some(scope),
                            ScopeKind::Parameters(vec![("value".to_string(), value)]),
                        )
                    } else {
                        scope
                    };
                    self.bind_body(accessor.body.as_ref(), accessor_scope, out);
                }
            }
        }
        if let Some(init) = &prop.init {
            out.push(self.bind_expr(init, scope));
        }
    }

    fn declare_parameters(&mut self, params: &[Parameter], scope: ScopeId, out: &mut Vec<Operation>) -> ScopeId {
        if params.is_empty() {
            return scope;
        }
        let mut entries = Vec::with_capacity(params.len());
        for param in params {
            if let Some(default) = &param.default {
                out.push(self.bind_expr(default, scope));
            }
            let ty = param
                .ty
                .as_ref()
                .and_then(|t| self.resolver().resolve_type(scope, t));
            let symbol = self.table.add_variable(&param.name.text, SymbolKind::Parameter, ty);
            entries.push((param.name.text.clone(), symbol));
        }
        self.scopes.push(Some(scope), ScopeKind::Parameters(entries))
    }

    fn bind_body(&mut self, body: Option<&Body>, scope: ScopeId, out: &mut Vec<Operation>) {
        match body {
            Some(Body::Block(block)) => self.bind_block(block, scope, out),
            Some(Body::Expression(expr)) => out.push(self.bind_expr(expr, scope)),
            None => {}
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Bind top-level statements as the body of the entry point, with its
    /// implicit `args` parameter in scope.
    pub fn bind_top_level(&mut self, statements: &[Stmt], scope: ScopeId, out: &mut Vec<Operation>) {
        if statements.is_empty() {
            return;
        }
        let args = self.table.add_variable("args", SymbolKind::Parameter, None);
        let scope = self
            .scopes
            .push(Some(scope), ScopeKind::Parameters(vec![("args".to_string(), args)]));
        self.bind_statements(statements, scope, out);
    }

    fn bind_block(&mut self, block: &Block, scope: ScopeId, out: &mut Vec<Operation>) {
        self.bind_statements(&block.statements, scope, out);
    }

    fn bind_statements(&mut self, statements: &[Stmt], scope: ScopeId, out: &mut Vec<Operation>) {
        // Local functions are in scope for the whole block.
        let mut scope = scope;
        for stmt in statements {
            if let Stmt::LocalFunction { method, .. } = stmt {
                let ty = self.resolver().resolve_type(scope, &method.return_type);
                let symbol = self.table.add_variable(&method.name.text, SymbolKind::Method, ty);
                scope = self.scopes.push(
                    Some(scope),
                    ScopeKind::Local {
                        name: method.name.text.clone(),
                        symbol,
                    },
                );
            }
        }
        for stmt in statements {
            scope = self.bind_statement(stmt, scope, out);
        }
    }

    /// Bind one statement; returns the scope for the statements after it.
    fn bind_statement(&mut self, stmt: &Stmt, scope: ScopeId, out: &mut Vec<Operation>) -> ScopeId {
        match stmt {
            Stmt::Block(block) => {
                self.bind_block(block, scope, out);
                scope
            }
            Stmt::LocalDeclaration { decl, .. } => self.bind_local_declaration(decl, scope, out),
            Stmt::Expression { expr, .. } => {
                out.push(self.bind_expr(expr, scope));
                scope
            }
            Stmt::Return { expr, .. } | Stmt::Throw { expr, .. } => {
                if let Some(expr) = expr {
                    out.push(self.bind_expr(expr, scope));
                }
                scope
            }
            Stmt::If {
                condition,
                then,
                otherwise,
                ..
            } => {
                out.push(self.bind_expr(condition, scope));
                self.bind_statement(then, scope, out);
                if let Some(otherwise) = otherwise {
                    self.bind_statement(otherwise, scope, out);
                }
                scope
            }
            Stmt::While { condition, body, .. } => {
                out.push(self.bind_expr(condition, scope));
                self.bind_statement(body, scope, out);
                scope
            }
            Stmt::DoWhile { body, condition, .. } => {
                self.bind_statement(body, scope, out);
                out.push(self.bind_expr(condition, scope));
                scope
            }
            Stmt::For {
                init,
                condition,
                increments,
                body,
                ..
            } => {
                let inner = match init {
                    Some(init) => self.bind_for_init(init, scope, out),
                    None => scope,
                };
                if let Some(condition) = condition {
                    out.push(self.bind_expr(condition, inner));
                }
                for increment in increments {
                    out.push(self.bind_expr(increment, inner));
                }
                self.bind_statement(body, inner, out);
                scope
            }
            Stmt::Foreach {
                ty,
                name,
                collection,
                body,
                ..
            } => {
                out.push(self.bind_expr(collection, scope));
                let ty = if ty.is_var() {
                    None
                } else {
                    self.resolver().resolve_type(scope, ty)
                };
                let inner = self.declare_local(&name.text, ty, scope);
                self.bind_statement(body, inner, out);
                scope
            }
            Stmt::Try {
                block,
                catches,
                finally,
                ..
            } => {
                self.bind_block(block, scope, out);
                for catch in catches {
                    let inner = match (&catch.ty, &catch.name) {
                        (Some(ty), Some(name)) => {
                            let ty = self.resolver().resolve_type(scope, ty);
                            self.declare_local(&name.text, ty, scope)
                        }
                        _ => scope,
                    };
                    if let Some(filter) = &catch.filter {
                        out.push(self.bind_expr(filter, inner));
                    }
                    self.bind_block(&catch.block, inner, out);
                }
                if let Some(finally) = finally {
                    self.bind_block(finally, scope, out);
                }
                scope
            }
            Stmt::Lock { expr, body, .. } => {
                out.push(self.bind_expr(expr, scope));
                self.bind_statement(body, scope, out);
                scope
            }
            Stmt::Using { resource, body, .. } => {
                let inner = self.bind_for_init(resource, scope, out);
                match body {
                    Some(body) => {
                        self.bind_statement(body, inner, out);
                        scope
                    }
                    // `using var x = ...;` stays in scope to the end of the block.
                    None => inner,
                }
            }
            Stmt::Switch { expr, sections, .. } => {
                out.push(self.bind_expr(expr, scope));
                for section in sections {
                    for label in &section.labels {
                        out.push(self.bind_expr(label, scope));
                    }
                    let mut inner = scope;
                    for stmt in &section.statements {
                        inner = self.bind_statement(stmt, inner, out);
                    }
                }
                scope
            }
            Stmt::LocalFunction { method, .. } => {
                let inner = self.declare_parameters(&method.params, scope, out);
                self.bind_body(method.body.as_ref(), inner, out);
                scope
            }
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty { .. } => scope,
        }
    }

    fn bind_for_init(&mut self, init: &ForInit, scope: ScopeId, out: &mut Vec<Operation>) -> ScopeId {
        match init {
            ForInit::Declaration(decl) => self.bind_local_declaration(decl, scope, out),
            ForInit::Expressions(exprs) => {
                for expr in exprs {
                    out.push(self.bind_expr(expr, scope));
                }
                scope
            }
        }
    }

    fn bind_local_declaration(&mut self, decl: &LocalDecl, scope: ScopeId, out: &mut Vec<Operation>) -> ScopeId {
        let declared = if decl.ty.is_var() {
            None
        } else {
            self.resolver().resolve_type(scope, &decl.ty)
        };
        let mut scope = scope;
        for declarator in &decl.declarators {
            let mut ty = declared;
            if let Some(init) = &declarator.init {
                let bound = self.bind_expr(init, scope);
                if decl.ty.is_var() {
                    ty = bound.ty.map(|t| t.id);
                }
                out.push(bound);
            }
            scope = self.declare_local(&declarator.name.text, ty, scope);
        }
        scope
    }

    fn declare_local(&mut self, name: &str, ty: Option<SymbolId>, scope: ScopeId) -> ScopeId {
        let symbol = self.table.add_variable(name, SymbolKind::Local, ty);
        self.scopes.push(
            Some(scope),
            ScopeKind::Local {
                name: name.to_string(),
                symbol,
            },
        )
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    pub fn bind_expr(&mut self, expr: &Expr, scope: ScopeId) -> Operation {
        self.node_scopes.insert(expr.id(), scope);
        let id = expr.id();
        match expr {
            Expr::Name { .. }
            | Expr::AliasQualified { .. }
            | Expr::PredefinedType { .. }
            | Expr::MemberAccess { .. }
            | Expr::MemberBinding { .. } => {
                let bound = self.bind_receiver(expr, scope);
                self.to_value(id, bound)
            }
            Expr::ConditionalAccess {
                receiver,
                when_not_null,
                ..
            } => {
                let operation = self.bind_expr(receiver, scope);
                self.conditional_receivers
                    .push((receiver.id(), operation.ty.map(|t| t.id)));
                let when_not_null = self.bind_expr(when_not_null, scope);
                self.conditional_receivers.pop();
                let ty = when_not_null.ty.map(|t| t.id);
                self.op(
                    id,
                    ty,
                    OperationData::ConditionalAccess {
                        operation: Box::new(operation),
                        when_not_null: Box::new(when_not_null),
                    },
                )
            }
            Expr::Invocation { callee, args, .. } => self.bind_invocation(id, callee, args, scope),
            Expr::ElementAccess { receiver, args, .. } => {
                let receiver_bound = self.bind_receiver(receiver, scope);
                let receiver = self.to_value(receiver.id(), receiver_bound);
                let arguments = self.bind_arguments(args, scope);
                let ty = receiver
                    .ty
                    .and_then(|t| self.table.lookup_members(t.id, "this[]").first().copied())
                    .and_then(|indexer| self.table.get(indexer).and_then(|s| s.ty));
                self.op(
                    id,
                    ty,
                    OperationData::ElementAccess {
                        receiver: Box::new(receiver),
                        arguments,
                    },
                )
            }
            Expr::Literal { kind, .. } => {
                let ty = self.literal_type(id, *kind);
                self.op(id, ty, OperationData::Literal)
            }
            Expr::InterpolatedString { holes, .. } => {
                let parts = holes.iter().map(|e| self.bind_expr(e, scope)).collect();
                let ty = self.known("System.String");
                self.op(id, ty, OperationData::InterpolatedString { parts })
            }
            Expr::This { .. } => {
                let ty = self.resolver().enclosing_type(scope);
                self.op(id, ty, OperationData::InstanceReference)
            }
            Expr::Base { .. } => {
                let ty = self
                    .resolver()
                    .enclosing_type(scope)
                    .and_then(|t| self.table.get(t).and_then(|s| s.base));
                self.op(id, ty, OperationData::InstanceReference)
            }
            Expr::ObjectCreation {
                ty,
                args,
                initializer,
                ..
            } => self.bind_object_creation(id, ty.as_ref(), args, initializer, scope),
            Expr::ArrayCreation {
                sizes, initializer, ..
            } => {
                let elements = sizes
                    .iter()
                    .chain(initializer.iter())
                    .map(|e| self.bind_expr(e, scope))
                    .collect();
                self.op(id, None, OperationData::ArrayCreation { elements })
            }
            Expr::InitializerList { elements, .. } => {
                let elements = elements.iter().map(|e| self.bind_expr(e, scope)).collect();
                self.op(id, None, OperationData::ArrayCreation { elements })
            }
            Expr::Parenthesized { inner, .. } => self.bind_expr(inner, scope),
            Expr::Tuple { elements, .. } => {
                let elements = self.bind_arguments(elements, scope);
                self.op(id, None, OperationData::Tuple { elements })
            }
            Expr::Assignment { target, value, .. } => {
                let target = self.bind_expr(target, scope);
                let value = self.bind_expr(value, scope);
                let ty = target.ty.map(|t| t.id);
                self.op(
                    id,
                    ty,
                    OperationData::Assignment {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                )
            }
            Expr::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } => {
                let condition = self.bind_expr(condition, scope);
                let when_true = self.bind_expr(when_true, scope);
                let when_false = self.bind_expr(when_false, scope);
                let ty = when_true.ty.or(when_false.ty).map(|t| t.id);
                self.op(
                    id,
                    ty,
                    OperationData::Conditional {
                        condition: Box::new(condition),
                        when_true: Box::new(when_true),
                        when_false: Box::new(when_false),
                    },
                )
            }
            Expr::Binary { op, left, right, .. } => {
                let left = self.bind_expr(left, scope);
                let right = self.bind_expr(right, scope);
                let ty = self.binary_type(op, &left, &right);
                self.op(
                    id,
                    ty,
                    OperationData::Binary {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                )
            }
            Expr::Unary { op, operand, .. } | Expr::Postfix { op, operand, .. } => {
                let operand = self.bind_expr(operand, scope);
                let ty = if op == "!" {
                    self.known("System.Boolean")
                } else {
                    operand.ty.map(|t| t.id)
                };
                self.op(
                    id,
                    ty,
                    OperationData::Unary {
                        operand: Box::new(operand),
                    },
                )
            }
            Expr::Cast { ty, operand, .. } => {
                let target = self.resolver().resolve_type(scope, ty);
                let operand = self.bind_expr(operand, scope);
                self.op(
                    id,
                    target,
                    OperationData::Conversion {
                        operand: Box::new(operand),
                    },
                )
            }
            Expr::TypeTest { op, operand, ty, .. } => {
                let operand = Box::new(self.bind_expr(operand, scope));
                if op == "as" {
                    let target = self.resolver().resolve_type(scope, ty);
                    self.op(id, target, OperationData::Conversion { operand })
                } else {
                    let ty = self.known("System.Boolean");
                    self.op(id, ty, OperationData::IsType { operand })
                }
            }
            Expr::TypeOf { .. } => {
                let ty = self.known("System.Type");
                self.op(id, ty, OperationData::Literal)
            }
            Expr::DefaultOf { ty, .. } => {
                let ty = self.resolver().resolve_type(scope, ty);
                self.op(id, ty, OperationData::Literal)
            }
            Expr::Lambda { params, body, .. } => {
                let mut ops = Vec::new();
                let inner = self.declare_parameters(params, scope, &mut ops);
                match body {
                    LambdaBody::Expression(expr) => ops.push(self.bind_expr(expr, inner)),
                    LambdaBody::Block(block) => self.bind_block(block, inner, &mut ops),
                }
                self.op(id, None, OperationData::AnonymousFunction { body: ops })
            }
            Expr::Await { operand, .. } => {
                let operand = self.bind_expr(operand, scope);
                self.op(
                    id,
                    None,
                    OperationData::Await {
                        operand: Box::new(operand),
                    },
                )
            }
            Expr::Throw { operand, .. } => {
                let operand = self.bind_expr(operand, scope);
                self.op(
                    id,
                    None,
                    OperationData::Throw {
                        operand: Box::new(operand),
                    },
                )
            }
        }
    }

    fn bind_arguments(&mut self, args: &[Argument], scope: ScopeId) -> Vec<Operation> {
        args.iter().map(|a| self.bind_expr(&a.expr, scope)).collect()
    }

    fn literal_type(&self, node: NodeId, kind: LiteralKind) -> Option<SymbolId> {
        let name = match kind {
            LiteralKind::String | LiteralKind::InterpolatedString => "System.String",
            LiteralKind::Char => "System.Char",
            LiteralKind::True | LiteralKind::False => "System.Boolean",
            LiteralKind::Null | LiteralKind::Default => return None,
            LiteralKind::Numeric => {
                let text = self
                    .tree
                    .node(node)
                    .map(|n| self.tree.token_text(n.first_token))
                    .unwrap_or("")
                    .to_ascii_lowercase();
                let hex = text.starts_with("0x") || text.starts_with("0b");
                if !hex && text.ends_with('f') {
                    "System.Single"
                } else if text.ends_with('m') {
                    "System.Decimal"
                } else if !hex && (text.ends_with('d') || text.contains('.') || text.contains('e')) {
                    "System.Double"
                } else if text.ends_with('l') {
                    "System.Int64"
                } else {
                    "System.Int32"
                }
            }
        };
        self.known(name)
    }

    fn binary_type(&self, op: &str, left: &Operation, right: &Operation) -> Option<SymbolId> {
        match op {
            "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "is" => self.known("System.Boolean"),
            "??" => left.ty.or(right.ty).map(|t| t.id),
            "+" => {
                let string = self.known("System.String");
                let is_string = |o: &Operation| string.is_some() && o.ty.map(|t| t.id) == string;
                if is_string(left) || is_string(right) {
                    string
                } else {
                    left.ty.map(|t| t.id)
                }
            }
            _ => left.ty.map(|t| t.id),
        }
    }

    // ------------------------------------------------------------------------
    // Names and Member Access
    // ------------------------------------------------------------------------

    /// Bind an expression that may name a type or namespace.
    fn bind_receiver(&mut self, expr: &Expr, scope: ScopeId) -> Bound {
        self.node_scopes.insert(expr.id(), scope);
        let id = expr.id();
        match expr {
            Expr::Name {
                ident, type_args, ..
            } => self.bind_simple_name(id, &ident.text, type_args.len(), scope),
            Expr::AliasQualified { alias, ident, .. } => {
                let start = self.resolver().resolve_alias(Some(scope), &alias.text);
                match start.and_then(|s| self.resolver().member_of(s, &ident.text, 0)) {
                    Some(NamespaceOrType::Namespace(ns)) => Bound::Namespace(ns),
                    Some(NamespaceOrType::Type(t)) => Bound::Type(t),
                    None => Bound::Error(Vec::new()),
                }
            }
            Expr::PredefinedType { keyword, .. } => {
                match crate::scope::predefined_metadata_name(keyword).and_then(|n| self.known(n)) {
                    Some(t) => Bound::Type(t),
                    None => Bound::Error(Vec::new()),
                }
            }
            Expr::MemberAccess {
                receiver,
                name,
                type_args,
                ..
            } => {
                let receiver = self.bind_receiver(receiver, scope);
                self.access_member(id, receiver, &name.text, type_args.len())
            }
            Expr::MemberBinding { name, .. } => {
                let Some(&(receiver_node, receiver_ty)) = self.conditional_receivers.last() else {
                    return Bound::Error(Vec::new());
                };
                let instance = self.op(receiver_node, receiver_ty, OperationData::ConditionalAccessInstance);
                self.access_member(id, Bound::Value(instance), &name.text, 0)
            }
            _ => Bound::Value(self.bind_expr(expr, scope)),
        }
    }

    fn bind_simple_name(&mut self, node: NodeId, name: &str, arity: usize, scope: ScopeId) -> Bound {
        let lookup = self.resolver().lookup(scope, name, arity);
        let bound = match lookup {
            Lookup::Local(symbol) => {
                let ty = self.table.get(symbol).and_then(|s| s.ty);
                if self.table.kind(symbol) == Some(SymbolKind::Method) {
                    Bound::Methods {
                        methods: vec![symbol],
                        instance: None,
                    }
                } else {
                    Bound::Value(self.op(node, ty, OperationData::LocalReference { local: self.to_ref(symbol) }))
                }
            }
            Lookup::Parameter(symbol) => {
                let ty = self.table.get(symbol).and_then(|s| s.ty);
                Bound::Value(self.op(
                    node,
                    ty,
                    OperationData::ParameterReference {
                        parameter: self.to_ref(symbol),
                    },
                ))
            }
            Lookup::Members {
                symbols,
                container,
                implicit_this,
            } => {
                let instance = implicit_this.then(|| {
                    let ty = self.resolver().enclosing_type(scope).or(Some(container));
                    self.op(node, ty, OperationData::InstanceReference)
                });
                self.member_group(node, &symbols, instance)
            }
            Lookup::Type(t) => return Bound::Type(t),
            Lookup::Namespace(ns) => return Bound::Namespace(ns),
            Lookup::Ambiguous | Lookup::NotFound => return Bound::Error(Vec::new()),
        };

        // A value whose type is named like the value also names the type.
        if let Bound::Value(value) = &bound {
            if let Some(ty) = value.ty.map(|t| t.id) {
                if self.table.name(ty) == name
                    && self.resolver().lookup_namespace_or_type(scope, name, 0) == Lookup::Type(ty)
                {
                    return Bound::ColorColor {
                        value: value.clone(),
                        ty,
                    };
                }
            }
        }
        bound
    }

    /// Bind `receiver.name`.
    fn access_member(&mut self, node: NodeId, receiver: Bound, name: &str, arity: usize) -> Bound {
        match receiver {
            Bound::Namespace(ns) => {
                match self.resolver().member_of(NamespaceOrType::Namespace(ns), name, arity) {
                    Some(NamespaceOrType::Namespace(child)) => Bound::Namespace(child),
                    Some(NamespaceOrType::Type(t)) => Bound::Type(t),
                    None => Bound::Error(Vec::new()),
                }
            }
            Bound::Type(ty) => self.access_static(node, ty, name, arity),
            Bound::ColorColor { value, ty } => {
                let members = self.table.lookup_members(ty, name);
                let is_static = members
                    .first()
                    .map_or(true, |&m| self.resolver().is_static(m));
                if is_static {
                    self.access_static(node, ty, name, arity)
                } else {
                    self.access_instance(node, value, name)
                }
            }
            Bound::Value(value) => self.access_instance(node, value, name),
            Bound::Methods { instance, .. } => Bound::Error(instance.into_iter().collect()),
            Bound::Error(children) => Bound::Error(children),
        }
    }

    fn access_static(&mut self, node: NodeId, ty: SymbolId, name: &str, arity: usize) -> Bound {
        if let Some(nested) = self
            .table
            .pick_type(&self.table.lookup_nested_types(ty, name, Some(arity)))
            .found()
        {
            return Bound::Type(nested);
        }
        let members = self.table.lookup_members(ty, name);
        match members.first() {
            Some(&first) if self.resolver().is_static(first) => self.member_group(node, &members, None),
            _ => Bound::Error(Vec::new()),
        }
    }

    fn access_instance(&mut self, node: NodeId, value: Operation, name: &str) -> Bound {
        let Some(ty) = value.ty.map(|t| t.id) else {
            return Bound::Error(vec![value]);
        };
        let members = self.table.lookup_members(ty, name);
        match members.first() {
            Some(&first) if !self.resolver().is_static(first) => {
                self.member_group(node, &members, Some(value))
            }
            _ => Bound::Error(vec![value]),
        }
    }

    /// A reference to the first of `members`, or a method group.
    fn member_group(&mut self, node: NodeId, members: &[SymbolId], instance: Option<Operation>) -> Bound {
        let Some(&first) = members.first() else {
            return Bound::Error(instance.into_iter().collect());
        };
        let is_static = self.resolver().is_static(first);
        let instance = if is_static { None } else { instance.map(Box::new) };
        let ty = self.table.get(first).and_then(|s| s.ty);
        match self.table.kind(first) {
            Some(SymbolKind::Method) | Some(SymbolKind::Constructor) => Bound::Methods {
                methods: members.to_vec(),
                instance: instance.map(|b| *b),
            },
            Some(SymbolKind::Property) => Bound::Value(self.op(
                node,
                ty,
                OperationData::PropertyReference(PropertyReference {
                    property: self.to_ref(first),
                    instance,
                }),
            )),
            Some(SymbolKind::Field) => Bound::Value(self.op(
                node,
                ty,
                OperationData::FieldReference {
                    field: self.to_ref(first),
                    instance,
                },
            )),
            _ => Bound::Error(instance.map(|b| vec![*b]).unwrap_or_default()),
        }
    }

    fn to_value(&self, node: NodeId, bound: Bound) -> Operation {
        match bound {
            Bound::Value(op) | Bound::ColorColor { value: op, .. } => op,
            Bound::Methods { instance, .. } => self.invalid(node, instance.into_iter().collect()),
            Bound::Type(_) | Bound::Namespace(_) => self.invalid(node, Vec::new()),
            Bound::Error(children) => self.invalid(node, children),
        }
    }

    // ------------------------------------------------------------------------
    // Invocation and Creation
    // ------------------------------------------------------------------------

    fn bind_invocation(&mut self, node: NodeId, callee: &Expr, args: &[Argument], scope: ScopeId) -> Operation {
        if let Expr::Name { ident, .. } = callee {
            if ident.text == "nameof"
                && matches!(self.resolver().lookup(scope, "nameof", 0), Lookup::NotFound)
            {
                self.node_scopes.insert(callee.id(), scope);
                let ty = self.known("System.String");
                return self.op(node, ty, OperationData::Literal);
            }
        }

        let bound = self.bind_receiver(callee, scope);
        let arguments = self.bind_arguments(args, scope);
        match bound {
            Bound::Methods { methods, instance } => {
                let method = methods
                    .iter()
                    .copied()
                    .find(|&m| self.table.get(m).is_some_and(|s| s.arity == args.len()))
                    .or_else(|| methods.first().copied());
                let ty = method.and_then(|m| self.table.get(m).and_then(|s| s.ty));
                self.op(
                    node,
                    ty,
                    OperationData::Invocation {
                        method: method.map(|m| self.to_ref(m)),
                        instance: instance.map(Box::new),
                        arguments,
                    },
                )
            }
            Bound::Value(value) | Bound::ColorColor { value, .. } => self.op(
                node,
                None,
                OperationData::Invocation {
                    method: None,
                    instance: Some(Box::new(value)),
                    arguments,
                },
            ),
            Bound::Error(mut children) => {
                children.extend(arguments);
                self.invalid(node, children)
            }
            Bound::Type(_) | Bound::Namespace(_) => self.invalid(node, arguments),
        }
    }

    fn bind_object_creation(
        &mut self,
        node: NodeId,
        ty: Option<&TypeSyntax>,
        args: &[Argument],
        initializer: &[Expr],
        scope: ScopeId,
    ) -> Operation {
        let created = ty.and_then(|t| self.resolver().resolve_type(scope, t));
        let constructor = created.and_then(|t| {
            let ctors: Vec<SymbolId> = self
                .table
                .children(t)
                .iter()
                .copied()
                .filter(|&c| self.table.kind(c) == Some(SymbolKind::Constructor))
                .collect();
            ctors
                .iter()
                .copied()
                .find(|&c| self.table.get(c).is_some_and(|s| s.arity == args.len()))
                .or_else(|| ctors.first().copied())
        });
        let arguments = self.bind_arguments(args, scope);

        let mut initializers = Vec::with_capacity(initializer.len());
        for element in initializer {
            match (element, created) {
                (
                    Expr::Assignment {
                        id, target, value, ..
                    },
                    Some(created),
                ) if matches!(target.as_ref(), Expr::Name { .. }) => {
                    self.node_scopes.insert(*id, scope);
                    self.node_scopes.insert(target.id(), scope);
                    let Expr::Name { ident, .. } = target.as_ref() else {
                        continue;
                    };
                    let instance = self.op(target.id(), Some(created), OperationData::InstanceReference);
                    let members = self.table.lookup_members(created, &ident.text);
                    let target_bound = self.member_group(target.id(), &members, Some(instance));
                    let target_op = self.to_value(target.id(), target_bound);
                    let value = self.bind_expr(value, scope);
                    let ty = target_op.ty.map(|t| t.id);
                    initializers.push(self.op(
                        *id,
                        ty,
                        OperationData::Assignment {
                            target: Box::new(target_op),
                            value: Box::new(value),
                        },
                    ));
                }
                // Anonymous object members: only the value binds.
                (Expr::Assignment { id, value, .. }, None) => {
                    self.node_scopes.insert(*id, scope);
                    initializers.push(self.bind_expr(value, scope));
                }
                _ => initializers.push(self.bind_expr(element, scope)),
            }
        }

        self.op(
            node,
            created,
            OperationData::ObjectCreation {
                constructor: constructor.map(|c| self.to_ref(c)),
                arguments,
                initializers,
            },
        )
    }
}

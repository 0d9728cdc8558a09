// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree for the supported C# subset.
//!
//! Nodes are plain structs and enums. Each node that can be located carries a
//! [`NodeId`] into the tree's node table, which records the node's kind, its
//! first and last token, and its parent. Spans are derived from tokens, so a
//! node's span never includes trivia and its full span includes exactly the
//! leading trivia of its first token and the trailing trivia of its last.

use tuglint_core::patch::Span;
use tuglint_core::semantic::NodeId;

use crate::tokenizer::Token;

// ============================================================================
// Node Table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    UsingDirective,
    NamespaceDeclaration,
    TypeDeclaration,
    EnumMember,
    FieldDeclaration,
    VariableDeclarator,
    PropertyDeclaration,
    Accessor,
    MethodDeclaration,
    ConstructorDeclaration,
    Parameter,
    Type,
    Statement,
    Block,
    CatchClause,
    SwitchSection,
    Argument,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub first_token: u32,
    pub last_token: u32,
    pub parent: Option<NodeId>,
}

/// A parsed file: tokens, node table, and the root.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub text: String,
    pub tokens: Vec<Token>,
    pub nodes: Vec<NodeInfo>,
    pub root: CompilationUnit,
}

impl SyntaxTree {
    pub fn node(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_span(&self, id: NodeId) -> Option<Span> {
        let info = self.node(id)?;
        let first = self.tokens.get(info.first_token as usize)?;
        let last = self.tokens.get(info.last_token as usize)?;
        Some(Span::new(first.span.start, last.span.end))
    }

    pub fn node_full_span(&self, id: NodeId) -> Option<Span> {
        let info = self.node(id)?;
        let first = self.tokens.get(info.first_token as usize)?;
        let last = self.tokens.get(info.last_token as usize)?;
        Some(Span::new(first.leading.start, last.trailing.end))
    }

    pub fn token_text(&self, index: u32) -> &str {
        self.tokens
            .get(index as usize)
            .and_then(|t| self.text.get(t.span.start..t.span.end))
            .unwrap_or("")
    }

    /// Smallest node whose span contains `span`.
    ///
    /// Nodes are numbered in completion order, so among nodes sharing the
    /// same span the lowest id is the innermost one.
    pub fn find_node(&self, span: Span) -> Option<NodeId> {
        if span.end > self.text.len() {
            return None;
        }
        let mut best: Option<(usize, NodeId)> = None;
        for index in 0..self.nodes.len() {
            let id = NodeId(index as u32);
            let Some(node_span) = self.node_span(id) else {
                continue;
            };
            if !node_span.contains(&span) {
                continue;
            }
            let len = node_span.len();
            if best.map_or(true, |(best_len, _)| len < best_len) {
                best = Some((len, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Ancestors of `id`, innermost first, `id` excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).and_then(|n| n.parent), move |p| {
            self.node(*p).and_then(|n| n.parent)
        })
    }
}

// ============================================================================
// Names and Types
// ============================================================================

/// An identifier token, `@` prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub token: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamePart {
    pub ident: Ident,
    pub type_args: Vec<TypeSyntax>,
}

/// `A.B<C>.D` or `global::A.B`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub id: NodeId,
    /// Alias before `::` (`global`, or a using alias).
    pub alias: Option<Ident>,
    pub parts: Vec<NamePart>,
}

impl QualifiedName {
    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.ident.text.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSyntax {
    /// `int`, `string`, `object`, `void`, ...
    Predefined { id: NodeId, keyword: String },
    Named(QualifiedName),
    Array {
        id: NodeId,
        element: Box<TypeSyntax>,
        rank: usize,
    },
    Nullable { id: NodeId, inner: Box<TypeSyntax> },
    Tuple {
        id: NodeId,
        elements: Vec<TypeSyntax>,
    },
}

impl TypeSyntax {
    pub fn id(&self) -> NodeId {
        match self {
            TypeSyntax::Predefined { id, .. }
            | TypeSyntax::Array { id, .. }
            | TypeSyntax::Nullable { id, .. }
            | TypeSyntax::Tuple { id, .. } => *id,
            TypeSyntax::Named(name) => name.id,
        }
    }

    /// Whether this is the contextual `var`.
    pub fn is_var(&self) -> bool {
        matches!(self, TypeSyntax::Named(n)
            if n.alias.is_none() && n.parts.len() == 1
                && n.parts[0].ident.text == "var" && n.parts[0].type_args.is_empty())
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub id: NodeId,
    pub usings: Vec<UsingDirective>,
    /// Top-level statements, which form the program's entry point.
    pub statements: Vec<Stmt>,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsingKind {
    Namespace,
    Static,
    Alias(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsingDirective {
    pub id: NodeId,
    pub global: bool,
    pub kind: UsingKind,
    pub target: TypeSyntax,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub id: NodeId,
    pub name: QualifiedName,
    pub file_scoped: bool,
    pub usings: Vec<UsingDirective>,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub words: Vec<String>,
}

impl Modifiers {
    pub fn has(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn is_static(&self) -> bool {
        self.has("static") || self.has("const")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub bases: Vec<TypeSyntax>,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub id: NodeId,
    pub name: Ident,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub id: NodeId,
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub ty: TypeSyntax,
    pub declarators: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Block(Block),
    Expression(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub id: NodeId,
    /// `get`, `set`, `init`, `add`, `remove`.
    pub keyword: String,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyBody {
    Expression(Expr),
    Accessors(Vec<Accessor>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub ty: TypeSyntax,
    pub name: Ident,
    /// Indexer parameters; empty for ordinary properties.
    pub params: Vec<Parameter>,
    pub body: PropertyBody,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: NodeId,
    pub modifiers: Modifiers,
    /// `None` for untyped lambda parameters.
    pub ty: Option<TypeSyntax>,
    pub name: Ident,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub return_type: TypeSyntax,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub params: Vec<Parameter>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorInitializer {
    /// `base` or `this`.
    pub keyword: String,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub params: Vec<Parameter>,
    pub initializer: Option<ConstructorInitializer>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberDecl {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
    EnumMember(EnumMemberDecl),
    Field(FieldDecl),
    Property(PropertyDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub ty: TypeSyntax,
    pub declarators: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub id: NodeId,
    pub ty: Option<TypeSyntax>,
    pub name: Option<Ident>,
    pub filter: Option<Expr>,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    pub id: NodeId,
    /// `case` label values; `default:` contributes no label.
    pub labels: Vec<Expr>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration(LocalDecl),
    Expressions(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    LocalDeclaration {
        id: NodeId,
        decl: LocalDecl,
    },
    Expression {
        id: NodeId,
        expr: Expr,
    },
    Return {
        id: NodeId,
        expr: Option<Expr>,
    },
    If {
        id: NodeId,
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        id: NodeId,
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        id: NodeId,
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        id: NodeId,
        init: Option<ForInit>,
        condition: Option<Expr>,
        increments: Vec<Expr>,
        body: Box<Stmt>,
    },
    Foreach {
        id: NodeId,
        ty: TypeSyntax,
        name: Ident,
        collection: Expr,
        body: Box<Stmt>,
    },
    Throw {
        id: NodeId,
        expr: Option<Expr>,
    },
    Try {
        id: NodeId,
        block: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Lock {
        id: NodeId,
        expr: Expr,
        body: Box<Stmt>,
    },
    Using {
        id: NodeId,
        resource: Box<ForInit>,
        /// `None` for `using var x = ...;`.
        body: Option<Box<Stmt>>,
    },
    Switch {
        id: NodeId,
        expr: Expr,
        sections: Vec<SwitchSection>,
    },
    LocalFunction {
        id: NodeId,
        method: Box<MethodDecl>,
    },
    Break {
        id: NodeId,
    },
    Continue {
        id: NodeId,
    },
    Empty {
        id: NodeId,
    },
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Numeric,
    String,
    /// Raw interpolated string (`$"""..."""`), lexed as one token.
    InterpolatedString,
    Char,
    True,
    False,
    Null,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub id: NodeId,
    /// `ref`, `out`, or `in`.
    pub modifier: Option<String>,
    pub name: Option<Ident>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Block(Block),
    Expression(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Simple name, optionally generic: `x`, `List<int>`.
    Name {
        id: NodeId,
        ident: Ident,
        type_args: Vec<TypeSyntax>,
    },
    /// `global::System`.
    AliasQualified {
        id: NodeId,
        alias: Ident,
        ident: Ident,
    },
    /// Predefined type keyword used as an expression receiver: `int.MaxValue`.
    PredefinedType { id: NodeId, keyword: String },
    MemberAccess {
        id: NodeId,
        receiver: Box<Expr>,
        name: Ident,
        type_args: Vec<TypeSyntax>,
    },
    /// `receiver?.rest`, where `rest` starts with a member binding.
    ConditionalAccess {
        id: NodeId,
        receiver: Box<Expr>,
        when_not_null: Box<Expr>,
    },
    /// `.Name` inside the `when_not_null` part of a conditional access.
    MemberBinding {
        id: NodeId,
        name: Ident,
    },
    Invocation {
        id: NodeId,
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    ElementAccess {
        id: NodeId,
        receiver: Box<Expr>,
        args: Vec<Argument>,
    },
    Literal {
        id: NodeId,
        kind: LiteralKind,
    },
    /// `$"..."`; `holes` holds each hole's value and alignment in order.
    InterpolatedString {
        id: NodeId,
        holes: Vec<Expr>,
    },
    This {
        id: NodeId,
    },
    Base {
        id: NodeId,
    },
    ObjectCreation {
        id: NodeId,
        /// `None` for target-typed `new()`.
        ty: Option<TypeSyntax>,
        args: Vec<Argument>,
        initializer: Vec<Expr>,
    },
    ArrayCreation {
        id: NodeId,
        ty: Option<TypeSyntax>,
        sizes: Vec<Expr>,
        initializer: Vec<Expr>,
    },
    /// `{ a, b }` as an array or collection initializer.
    InitializerList {
        id: NodeId,
        elements: Vec<Expr>,
    },
    Parenthesized {
        id: NodeId,
        inner: Box<Expr>,
    },
    Tuple {
        id: NodeId,
        elements: Vec<Argument>,
    },
    Assignment {
        id: NodeId,
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        id: NodeId,
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Binary {
        id: NodeId,
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        id: NodeId,
        op: String,
        operand: Box<Expr>,
    },
    Postfix {
        id: NodeId,
        op: String,
        operand: Box<Expr>,
    },
    Cast {
        id: NodeId,
        ty: TypeSyntax,
        operand: Box<Expr>,
    },
    /// `x is T` / `x as T`.
    TypeTest {
        id: NodeId,
        op: String,
        operand: Box<Expr>,
        ty: TypeSyntax,
    },
    TypeOf {
        id: NodeId,
        ty: TypeSyntax,
    },
    DefaultOf {
        id: NodeId,
        ty: TypeSyntax,
    },
    Lambda {
        id: NodeId,
        params: Vec<Parameter>,
        body: LambdaBody,
    },
    Await {
        id: NodeId,
        operand: Box<Expr>,
    },
    Throw {
        id: NodeId,
        operand: Box<Expr>,
    },
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Name { id, .. }
            | Expr::AliasQualified { id, .. }
            | Expr::PredefinedType { id, .. }
            | Expr::MemberAccess { id, .. }
            | Expr::ConditionalAccess { id, .. }
            | Expr::MemberBinding { id, .. }
            | Expr::Invocation { id, .. }
            | Expr::ElementAccess { id, .. }
            | Expr::Literal { id, .. }
            | Expr::InterpolatedString { id, .. }
            | Expr::This { id }
            | Expr::Base { id }
            | Expr::ObjectCreation { id, .. }
            | Expr::ArrayCreation { id, .. }
            | Expr::InitializerList { id, .. }
            | Expr::Parenthesized { id, .. }
            | Expr::Tuple { id, .. }
            | Expr::Assignment { id, .. }
            | Expr::Conditional { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Postfix { id, .. }
            | Expr::Cast { id, .. }
            | Expr::TypeTest { id, .. }
            | Expr::TypeOf { id, .. }
            | Expr::DefaultOf { id, .. }
            | Expr::Lambda { id, .. }
            | Expr::Await { id, .. }
            | Expr::Throw { id, .. } => *id,
        }
    }
}

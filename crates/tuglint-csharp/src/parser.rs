// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recursive-descent parser for the supported C# subset.
//!
//! Ambiguities are resolved the way the C# grammar resolves them:
//!
//! - A statement is a local declaration when `Type Identifier` followed by
//!   `=`, `;` or `,` parses; otherwise it is an expression statement.
//! - `Name<...>` in an expression is a generic name only when the type
//!   argument list parses and is followed by one of `( ) ] } : ; , . ?. == !=`.
//! - `(Type)x` is a cast when `Type` is predefined or the token after `)`
//!   can start an operand; otherwise the parentheses group an expression.
//!
//! Speculative parses roll back both the token position and any nodes they
//! created.

use tuglint_core::patch::Span;
use tuglint_core::semantic::NodeId;

use crate::error::ParseError;
use crate::syntax::*;
use crate::tokenizer::{tokenize, Token, TokenKind};

// ============================================================================
// Entry Point
// ============================================================================

/// Parse one C# file.
pub fn parse(path: &str, text: &str) -> Result<SyntaxTree, ParseError> {
    let tokens = tokenize(text).map_err(|e| ParseError::new(path, text, e.message, e.span))?;
    let mut parser = Parser {
        text,
        tokens: &tokens,
        pos: 0,
        nodes: Vec::new(),
        pending: Vec::new(),
    };
    let root = parser
        .compilation_unit()
        .map_err(|e| ParseError::new(path, text, e.message, e.span))?;
    let nodes = parser.nodes;
    Ok(SyntaxTree {
        text: text.to_string(),
        tokens,
        nodes,
        root,
    })
}

// ============================================================================
// Parser State
// ============================================================================

#[derive(Debug)]
struct SyntaxError {
    message: String,
    span: Span,
}

type PResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, Copy)]
struct Marker {
    token: u32,
    pending: usize,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    pos: usize,
    nodes: usize,
    pending: usize,
}

const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "long",
    "ulong", "short", "ushort", "object", "string", "void",
];

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "const", "virtual",
    "override", "abstract", "sealed", "extern", "unsafe", "volatile", "new", "event",
];

const CONTEXTUAL_MODIFIERS: &[&str] = &["async", "partial", "required", "file"];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "??=",
];

/// Tokens after which `Name<...>` is taken as a generic name.
const TYPE_ARG_FOLLOWERS: &[&str] = &["(", ")", "]", "}", ":", ";", ",", ".", "?.", "==", "!="];

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" | "is" | "as" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
    nodes: Vec<NodeInfo>,
    /// Finished nodes whose parent is not finished yet.
    pending: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------------

    fn start(&self) -> Marker {
        Marker {
            token: self.pos as u32,
            pending: self.pending.len(),
        }
    }

    fn finish(&mut self, kind: NodeKind, marker: Marker) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let last = (self.pos.max(marker.token as usize + 1) - 1) as u32;
        self.nodes.push(NodeInfo {
            kind,
            first_token: marker.token,
            last_token: last,
            parent: None,
        });
        for child in self.pending.drain(marker.pending..) {
            if let Some(node) = self.nodes.get_mut(child.0 as usize) {
                node.parent = Some(id);
            }
        }
        self.pending.push(id);
        id
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            nodes: self.nodes.len(),
            pending: self.pending.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.nodes.truncate(snapshot.nodes);
        self.pending.truncate(snapshot.pending);
    }

    /// Run `f`; on failure rewind as if it never ran.
    fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let snapshot = self.snapshot();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.restore(snapshot);
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    fn token(&self, index: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn text_of(&self, index: usize) -> &'a str {
        let token = self.token(index);
        &self.text[token.span.start..token.span.end]
    }

    fn kind_at(&self, offset: usize) -> TokenKind {
        self.token(self.pos + offset).kind
    }

    fn peek(&self) -> &'a str {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &'a str {
        match self.kind_at(offset) {
            TokenKind::StringLiteral
            | TokenKind::CharLiteral
            | TokenKind::InterpolatedStringStart
            | TokenKind::InterpolatedStringText
            | TokenKind::InterpolatedStringEnd
            | TokenKind::EndOfFile => "",
            _ => self.text_of(self.pos + offset),
        }
    }

    fn at(&self, text: &str) -> bool {
        self.peek() == text
    }

    fn at_eof(&self) -> bool {
        self.kind_at(0) == TokenKind::EndOfFile
    }

    fn is_ident_at(&self, offset: usize) -> bool {
        self.kind_at(offset) == TokenKind::Identifier
    }

    /// Whether tokens `pos+offset` and `pos+offset+1` touch with no trivia.
    fn adjacent(&self, offset: usize) -> bool {
        let a = self.token(self.pos + offset);
        let b = self.token(self.pos + offset + 1);
        a.span.end == b.span.start && b.kind != TokenKind::EndOfFile
    }

    fn bump(&mut self) -> u32 {
        let index = self.pos as u32;
        if !self.at_eof() {
            self.pos += 1;
        }
        index
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> PResult<T> {
        let token = self.token(self.pos);
        Err(SyntaxError {
            message: message.into(),
            span: token.span,
        })
    }

    fn expect(&mut self, text: &str) -> PResult<u32> {
        if self.at(text) {
            Ok(self.bump())
        } else if self.at_eof() {
            self.error(format!("expected '{}', found end of file", text))
        } else {
            self.error(format!("expected '{}', found '{}'", text, self.text_of(self.pos)))
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        if self.is_ident_at(0) {
            let token = self.bump();
            let raw = self.text_of(token as usize);
            Ok(Ident {
                token,
                text: raw.strip_prefix('@').unwrap_or(raw).to_string(),
            })
        } else if self.at_eof() {
            self.error("expected identifier, found end of file")
        } else {
            self.error(format!("expected identifier, found '{}'", self.text_of(self.pos)))
        }
    }

    /// Peek a possibly composite operator: `>` tokens are joined with
    /// adjacent `>` and `=` into `>>`, `>=` and `>>=`.
    fn peek_operator(&self) -> Option<(String, usize)> {
        if !matches!(self.kind_at(0), TokenKind::Punctuation | TokenKind::Keyword) {
            return None;
        }
        let text = self.peek();
        if text != ">" {
            return Some((text.to_string(), 1));
        }
        if self.adjacent(0) && self.peek_at(1) == ">" {
            if self.adjacent(1) && self.peek_at(2) == "=" {
                return Some((">>=".to_string(), 3));
            }
            return Some((">>".to_string(), 2));
        }
        if self.adjacent(0) && self.peek_at(1) == "=" {
            return Some((">=".to_string(), 2));
        }
        Some((">".to_string(), 1))
    }

    fn skip_balanced(&mut self, open: &str, close: &str) -> PResult<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_eof() {
                return self.error(format!("expected '{}', found end of file", close));
            }
            if self.at(open) {
                depth += 1;
            } else if self.at(close) {
                depth -= 1;
            }
            self.bump();
        }
        Ok(())
    }

    fn skip_attributes(&mut self) -> PResult<()> {
        while self.at("[") {
            self.skip_balanced("[", "]")?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Compilation Unit and Declarations
    // ------------------------------------------------------------------------

    fn compilation_unit(&mut self) -> PResult<CompilationUnit> {
        let marker = self.start();
        while self.at("extern") && self.peek_at(1) == "alias" {
            while !self.at(";") && !self.at_eof() {
                self.bump();
            }
            self.expect(";")?;
        }
        let usings = self.using_directives()?;
        let mut statements = Vec::new();
        while self.at_global_statement() {
            statements.push(self.statement()?);
        }
        let members = self.namespace_members(true)?;
        if !self.at_eof() {
            return self.error(format!("unexpected '{}'", self.text_of(self.pos)));
        }
        // The unit spans through end of file so trailing trivia belongs to it.
        self.pos = self.tokens.len();
        let id = self.finish(NodeKind::CompilationUnit, marker);
        self.pos = self.tokens.len() - 1;
        Ok(CompilationUnit {
            id,
            usings,
            statements,
            members,
        })
    }

    /// Whether the next tokens start a top-level statement rather than a
    /// namespace member or attribute list.
    fn at_global_statement(&mut self) -> bool {
        if self.at_eof() || self.at("[") || self.at("}") {
            return false;
        }
        let pos = self.pos;
        self.modifiers();
        let member = self.at("namespace")
            || self.at("class")
            || self.at("struct")
            || self.at("interface")
            || self.at("enum")
            || self.at("delegate")
            || self.is_record_start();
        self.pos = pos;
        !member
    }

    fn using_directives(&mut self) -> PResult<Vec<UsingDirective>> {
        let mut usings = Vec::new();
        loop {
            let is_global = self.at("global") && self.peek_at(1) == "using";
            let offset = usize::from(is_global);
            if self.peek_at(offset) != "using" || self.peek_at(offset + 1) == "(" {
                return Ok(usings);
            }
            // `using var x = ...` cannot appear here; `using static` and aliases can.
            let marker = self.start();
            if is_global {
                self.bump();
            }
            self.expect("using")?;
            let kind = if self.eat("static") {
                UsingKind::Static
            } else if self.is_ident_at(0) && self.peek_at(1) == "=" {
                let alias = self.expect_ident()?;
                self.expect("=")?;
                UsingKind::Alias(alias)
            } else {
                UsingKind::Namespace
            };
            let target = self.parse_type()?;
            self.expect(";")?;
            let id = self.finish(NodeKind::UsingDirective, marker);
            usings.push(UsingDirective {
                id,
                global: is_global,
                kind,
                target,
            });
        }
    }

    fn namespace_members(&mut self, top_level: bool) -> PResult<Vec<MemberDecl>> {
        let mut members = Vec::new();
        loop {
            if self.at_eof() || self.at("}") {
                return Ok(members);
            }
            if top_level && self.at("[") {
                self.skip_attributes()?;
                continue;
            }
            if let Some(member) = self.member_declaration(None)? {
                members.push(member);
            }
        }
    }

    fn namespace_declaration(&mut self, marker: Marker) -> PResult<NamespaceDecl> {
        self.expect("namespace")?;
        let name = self.qualified_name(false)?;
        if self.eat(";") {
            let usings = self.using_directives()?;
            let members = self.namespace_members(true)?;
            let id = self.finish(NodeKind::NamespaceDeclaration, marker);
            return Ok(NamespaceDecl {
                id,
                name,
                file_scoped: true,
                usings,
                members,
            });
        }
        self.expect("{")?;
        let usings = self.using_directives()?;
        let members = self.namespace_members(false)?;
        self.expect("}")?;
        self.eat(";");
        let id = self.finish(NodeKind::NamespaceDeclaration, marker);
        Ok(NamespaceDecl {
            id,
            name,
            file_scoped: false,
            usings,
            members,
        })
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut words = Vec::new();
        loop {
            let text = self.peek();
            let is_modifier = (self.kind_at(0) == TokenKind::Keyword
                && MEMBER_MODIFIERS.contains(&text))
                || (self.is_ident_at(0)
                    && CONTEXTUAL_MODIFIERS.contains(&text)
                    && matches!(self.kind_at(1), TokenKind::Identifier | TokenKind::Keyword));
            if !is_modifier {
                return Modifiers { words };
            }
            words.push(text.to_string());
            self.bump();
        }
    }

    fn is_record_start(&self) -> bool {
        self.at("record")
            && (self.is_ident_at(1) || self.peek_at(1) == "class" || self.peek_at(1) == "struct")
    }

    /// Parse one member. `container` is the enclosing type's name, used to
    /// recognise constructors. Returns `None` for skipped declarations
    /// (delegates, destructors of interfaces, fixed buffers).
    fn member_declaration(&mut self, container: Option<&str>) -> PResult<Option<MemberDecl>> {
        self.skip_attributes()?;
        let marker = self.start();
        let modifiers = self.modifiers();

        if self.at("namespace") {
            return Ok(Some(MemberDecl::Namespace(
                self.namespace_declaration(marker)?,
            )));
        }
        if self.at("class")
            || self.at("struct")
            || self.at("interface")
            || self.at("enum")
            || self.is_record_start()
        {
            return Ok(Some(MemberDecl::Type(self.type_declaration(marker, modifiers)?)));
        }
        if self.at("delegate") {
            while !self.at(";") && !self.at_eof() {
                self.bump();
            }
            self.expect(";")?;
            return Ok(None);
        }
        if self.at("~") {
            self.bump();
            let name = self.expect_ident()?;
            let params = self.parameter_list("(", ")")?;
            let body = self.method_body()?;
            let id = self.finish(NodeKind::ConstructorDeclaration, marker);
            return Ok(Some(MemberDecl::Constructor(ConstructorDecl {
                id,
                modifiers,
                name,
                params,
                initializer: None,
                body,
            })));
        }
        if let Some(container) = container {
            if self.is_ident_at(0) && self.peek() == container && self.peek_at(1) == "(" {
                return Ok(Some(MemberDecl::Constructor(
                    self.constructor_declaration(marker, modifiers)?,
                )));
            }
        }
        if self.at("implicit") || self.at("explicit") {
            let name = Ident {
                token: self.bump(),
                text: "op_Conversion".to_string(),
            };
            self.expect("operator")?;
            let return_type = self.parse_type()?;
            return Ok(Some(MemberDecl::Method(
                self.method_rest(marker, modifiers, return_type, name)?,
            )));
        }

        let ty = self.parse_type()?;

        if self.at("operator") {
            let token = self.bump();
            let mut symbol = String::new();
            while !self.at("(") && !self.at_eof() {
                symbol.push_str(self.text_of(self.pos));
                self.bump();
            }
            let name = Ident {
                token,
                text: format!("op_{}", symbol),
            };
            return Ok(Some(MemberDecl::Method(
                self.method_rest(marker, modifiers, ty, name)?,
            )));
        }

        if self.at("this") && self.peek_at(1) == "[" {
            let token = self.bump();
            let params = self.parameter_list("[", "]")?;
            let body = self.property_body()?;
            let id = self.finish(NodeKind::PropertyDeclaration, marker);
            return Ok(Some(MemberDecl::Property(PropertyDecl {
                id,
                modifiers,
                ty,
                name: Ident {
                    token,
                    text: "this[]".to_string(),
                },
                params,
                body,
                init: None,
            })));
        }

        let name = self.member_name()?;

        if self.at("(") || self.at("<") {
            return Ok(Some(MemberDecl::Method(
                self.method_rest(marker, modifiers, ty, name)?,
            )));
        }
        if self.at("{") || self.at("=>") {
            let body = self.property_body()?;
            let init = if self.eat("=") {
                let value = self.variable_initializer()?;
                self.expect(";")?;
                Some(value)
            } else {
                None
            };
            let id = self.finish(NodeKind::PropertyDeclaration, marker);
            return Ok(Some(MemberDecl::Property(PropertyDecl {
                id,
                modifiers,
                ty,
                name,
                params: Vec::new(),
                body,
                init,
            })));
        }

        // Field (or field-like event): `T a = 1, b;`
        let declarators = self.declarators_after_first(name)?;
        self.expect(";")?;
        let id = self.finish(NodeKind::FieldDeclaration, marker);
        Ok(Some(MemberDecl::Field(FieldDecl {
            id,
            modifiers,
            ty,
            declarators,
        })))
    }

    /// Member name, possibly an explicit interface implementation `I<T>.M`.
    fn member_name(&mut self) -> PResult<Ident> {
        let mut name = self.expect_ident()?;
        loop {
            let snapshot = self.snapshot();
            if self.at("<") && self.type_argument_list().is_err() {
                self.restore(snapshot);
                return Ok(name);
            }
            if self.at(".") && self.is_ident_at(1) {
                self.bump();
                name = self.expect_ident()?;
            } else {
                self.restore(snapshot);
                return Ok(name);
            }
        }
    }

    fn type_parameter_list(&mut self) -> PResult<Vec<Ident>> {
        let mut params = Vec::new();
        if !self.eat("<") {
            return Ok(params);
        }
        loop {
            self.skip_attributes()?;
            if self.at("in") || self.at("out") {
                self.bump();
            }
            params.push(self.expect_ident()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(params)
    }

    fn at_constraint(&self) -> bool {
        self.at("where") && self.is_ident_at(1) && self.peek_at(2) == ":"
    }

    fn skip_constraints(&mut self) {
        while self.at_constraint() {
            self.bump();
            while !matches!(self.peek(), "{" | ";" | "=>") && !self.at_eof() && !self.at_constraint()
            {
                self.bump();
            }
        }
    }

    fn type_declaration(&mut self, marker: Marker, modifiers: Modifiers) -> PResult<TypeDecl> {
        let kind = match self.peek() {
            "class" => TypeKind::Class,
            "struct" => TypeKind::Struct,
            "interface" => TypeKind::Interface,
            "enum" => TypeKind::Enum,
            _ => TypeKind::Record,
        };
        self.bump();
        if kind == TypeKind::Record && (self.at("class") || self.at("struct")) {
            self.bump();
        }
        let name = self.expect_ident()?;
        let type_params = self.type_parameter_list()?;
        if self.at("(") {
            // Primary constructor parameters are parsed but not bound.
            self.parameter_list("(", ")")?;
        }
        let mut bases = Vec::new();
        if self.eat(":") {
            loop {
                bases.push(self.parse_type()?);
                if self.at("(") {
                    self.skip_balanced("(", ")")?;
                }
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.skip_constraints();

        let mut members = Vec::new();
        if self.eat(";") {
            let id = self.finish(NodeKind::TypeDeclaration, marker);
            return Ok(TypeDecl {
                id,
                kind,
                modifiers,
                name,
                type_params,
                bases,
                members,
            });
        }
        self.expect("{")?;
        if kind == TypeKind::Enum {
            while !self.at("}") {
                self.skip_attributes()?;
                let member_marker = self.start();
                let member_name = self.expect_ident()?;
                let value = if self.eat("=") {
                    Some(self.expression()?)
                } else {
                    None
                };
                let id = self.finish(NodeKind::EnumMember, member_marker);
                members.push(MemberDecl::EnumMember(EnumMemberDecl {
                    id,
                    name: member_name,
                    value,
                }));
                if !self.eat(",") {
                    break;
                }
            }
        } else {
            while !self.at("}") && !self.at_eof() {
                if let Some(member) = self.member_declaration(Some(&name.text))? {
                    members.push(member);
                }
            }
        }
        self.expect("}")?;
        self.eat(";");
        let id = self.finish(NodeKind::TypeDeclaration, marker);
        Ok(TypeDecl {
            id,
            kind,
            modifiers,
            name,
            type_params,
            bases,
            members,
        })
    }

    fn constructor_declaration(
        &mut self,
        marker: Marker,
        modifiers: Modifiers,
    ) -> PResult<ConstructorDecl> {
        let name = self.expect_ident()?;
        let params = self.parameter_list("(", ")")?;
        let initializer = if self.eat(":") {
            let keyword = if self.at("base") || self.at("this") {
                self.peek().to_string()
            } else {
                return self.error("expected 'base' or 'this'");
            };
            self.bump();
            let args = self.argument_list("(", ")")?;
            Some(ConstructorInitializer { keyword, args })
        } else {
            None
        };
        let body = self.method_body()?;
        let id = self.finish(NodeKind::ConstructorDeclaration, marker);
        Ok(ConstructorDecl {
            id,
            modifiers,
            name,
            params,
            initializer,
            body,
        })
    }

    fn method_rest(
        &mut self,
        marker: Marker,
        modifiers: Modifiers,
        return_type: TypeSyntax,
        name: Ident,
    ) -> PResult<MethodDecl> {
        let type_params = self.type_parameter_list()?;
        let params = self.parameter_list("(", ")")?;
        self.skip_constraints();
        let body = self.method_body()?;
        let id = self.finish(NodeKind::MethodDeclaration, marker);
        Ok(MethodDecl {
            id,
            modifiers,
            return_type,
            name,
            type_params,
            params,
            body,
        })
    }

    fn method_body(&mut self) -> PResult<Option<Body>> {
        if self.eat(";") {
            return Ok(None);
        }
        if self.eat("=>") {
            let expr = self.expression()?;
            self.expect(";")?;
            return Ok(Some(Body::Expression(expr)));
        }
        Ok(Some(Body::Block(self.block()?)))
    }

    fn parameter_list(&mut self, open: &str, close: &str) -> PResult<Vec<Parameter>> {
        self.expect(open)?;
        let mut params = Vec::new();
        while !self.at(close) {
            self.skip_attributes()?;
            let marker = self.start();
            let mut words = Vec::new();
            while matches!(self.peek(), "ref" | "out" | "in" | "params" | "this" | "readonly" | "scoped") {
                words.push(self.peek().to_string());
                self.bump();
            }
            if self.at("__arglist") {
                self.bump();
                break;
            }
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            let default = if self.eat("=") {
                Some(self.expression()?)
            } else {
                None
            };
            let id = self.finish(NodeKind::Parameter, marker);
            params.push(Parameter {
                id,
                modifiers: Modifiers { words },
                ty: Some(ty),
                name,
                default,
            });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(close)?;
        Ok(params)
    }

    fn property_body(&mut self) -> PResult<PropertyBody> {
        if self.eat("=>") {
            let expr = self.expression()?;
            self.expect(";")?;
            return Ok(PropertyBody::Expression(expr));
        }
        self.expect("{")?;
        let mut accessors = Vec::new();
        while !self.at("}") {
            self.skip_attributes()?;
            let marker = self.start();
            self.modifiers();
            let keyword = match self.peek() {
                word @ ("get" | "set" | "init" | "add" | "remove") => word.to_string(),
                _ => return self.error("expected accessor"),
            };
            self.bump();
            let body = self.method_body()?;
            let id = self.finish(NodeKind::Accessor, marker);
            accessors.push(Accessor { id, keyword, body });
        }
        self.expect("}")?;
        Ok(PropertyBody::Accessors(accessors))
    }

    fn declarators_after_first(&mut self, first: Ident) -> PResult<Vec<VariableDeclarator>> {
        let marker = Marker {
            token: first.token,
            pending: self.pending.len(),
        };
        let mut declarators = vec![self.declarator_rest(marker, first)?];
        while self.eat(",") {
            let marker = self.start();
            let name = self.expect_ident()?;
            declarators.push(self.declarator_rest(marker, name)?);
        }
        Ok(declarators)
    }

    fn declarator_rest(&mut self, marker: Marker, name: Ident) -> PResult<VariableDeclarator> {
        if self.at("[") {
            // Fixed-size buffer.
            self.skip_balanced("[", "]")?;
        }
        let init = if self.eat("=") {
            Some(self.variable_initializer()?)
        } else {
            None
        };
        let id = self.finish(NodeKind::VariableDeclarator, marker);
        Ok(VariableDeclarator { id, name, init })
    }

    fn variable_initializer(&mut self) -> PResult<Expr> {
        if self.at("{") {
            self.initializer_list()
        } else {
            self.expression()
        }
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn qualified_name(&mut self, generic: bool) -> PResult<QualifiedName> {
        let marker = self.start();
        let alias = if self.is_ident_at(0) && self.peek_at(1) == "::" {
            let alias = self.expect_ident()?;
            self.bump();
            Some(alias)
        } else {
            None
        };
        let mut parts = Vec::new();
        loop {
            let ident = self.expect_ident()?;
            let type_args = if generic && self.at("<") {
                self.type_argument_list()?
            } else {
                Vec::new()
            };
            parts.push(NamePart { ident, type_args });
            if self.at(".") && self.is_ident_at(1) {
                self.bump();
                continue;
            }
            break;
        }
        let id = self.finish(NodeKind::Type, marker);
        Ok(QualifiedName { id, alias, parts })
    }

    fn type_argument_list(&mut self) -> PResult<Vec<TypeSyntax>> {
        self.expect("<")?;
        let mut args = Vec::new();
        if self.at(",") || self.at(">") {
            // Unbound generic: `Dictionary<,>`.
            while self.eat(",") {}
            self.expect(">")?;
            return Ok(args);
        }
        loop {
            args.push(self.parse_type()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(args)
    }

    fn parse_type(&mut self) -> PResult<TypeSyntax> {
        let marker = self.start();
        let mut ty = self.non_array_type()?;
        loop {
            if self.at("?") && !self.nullable_is_conditional() {
                self.bump();
                let id = self.finish(NodeKind::Type, marker);
                ty = TypeSyntax::Nullable {
                    id,
                    inner: Box::new(ty),
                };
            } else if self.at("[") && (self.peek_at(1) == "]" || self.peek_at(1) == ",") {
                self.bump();
                let mut rank = 1;
                while self.eat(",") {
                    rank += 1;
                }
                self.expect("]")?;
                let id = self.finish(NodeKind::Type, marker);
                ty = TypeSyntax::Array {
                    id,
                    element: Box::new(ty),
                    rank,
                };
            } else if self.at("*") && matches!(self.peek_at(1), ")" | ">" | "," | "*" | "[") {
                self.bump();
            } else {
                return Ok(ty);
            }
        }
    }

    /// `T ? x : y` inside an expression; `?` here is not a nullable suffix.
    fn nullable_is_conditional(&self) -> bool {
        let next = self.peek_at(1);
        !(self.is_ident_at(1)
            || matches!(next, ")" | ">" | "," | "[" | "]" | ";" | "=" | "{" | "}" | "?"))
            || (self.is_ident_at(1) && self.peek_at(2) == ":" && self.peek_at(3) != ":")
    }

    fn non_array_type(&mut self) -> PResult<TypeSyntax> {
        let marker = self.start();
        if self.kind_at(0) == TokenKind::Keyword && PREDEFINED_TYPES.contains(&self.peek()) {
            let keyword = self.peek().to_string();
            self.bump();
            let id = self.finish(NodeKind::Type, marker);
            return Ok(TypeSyntax::Predefined { id, keyword });
        }
        if self.at("(") {
            self.bump();
            let mut elements = Vec::new();
            loop {
                elements.push(self.parse_type()?);
                if self.is_ident_at(0) {
                    self.bump();
                }
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(")")?;
            if elements.len() < 2 {
                return self.error("tuple types need at least two elements");
            }
            let id = self.finish(NodeKind::Type, marker);
            return Ok(TypeSyntax::Tuple { id, elements });
        }
        Ok(TypeSyntax::Named(self.qualified_name(true)?))
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn block(&mut self) -> PResult<Block> {
        let marker = self.start();
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return self.error("expected '}', found end of file");
            }
            statements.push(self.statement()?);
        }
        self.expect("}")?;
        let id = self.finish(NodeKind::Block, marker);
        Ok(Block { id, statements })
    }

    fn embedded_statement(&mut self) -> PResult<Box<Stmt>> {
        Ok(Box::new(self.statement()?))
    }

    fn parenthesized_condition(&mut self) -> PResult<Expr> {
        self.expect("(")?;
        let expr = self.expression()?;
        self.expect(")")?;
        Ok(expr)
    }

    fn statement(&mut self) -> PResult<Stmt> {
        let marker = self.start();
        match self.peek() {
            "{" => return Ok(Stmt::Block(self.block()?)),
            ";" => {
                self.bump();
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Empty { id });
            }
            "checked" | "unchecked" | "unsafe" if self.peek_at(1) == "{" => {
                self.bump();
                return Ok(Stmt::Block(self.block()?));
            }
            "if" => {
                self.bump();
                let condition = self.parenthesized_condition()?;
                let then = self.embedded_statement()?;
                let otherwise = if self.eat("else") {
                    Some(self.embedded_statement()?)
                } else {
                    None
                };
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::If {
                    id,
                    condition,
                    then,
                    otherwise,
                });
            }
            "while" => {
                self.bump();
                let condition = self.parenthesized_condition()?;
                let body = self.embedded_statement()?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::While {
                    id,
                    condition,
                    body,
                });
            }
            "do" => {
                self.bump();
                let body = self.embedded_statement()?;
                self.expect("while")?;
                let condition = self.parenthesized_condition()?;
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::DoWhile {
                    id,
                    body,
                    condition,
                });
            }
            "for" => return self.for_statement(marker),
            "foreach" => return self.foreach_statement(marker),
            "return" => {
                self.bump();
                let expr = if self.at(";") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Return { id, expr });
            }
            "yield" if self.peek_at(1) == "return" || self.peek_at(1) == "break" => {
                self.bump();
                let expr = if self.eat("return") {
                    Some(self.expression()?)
                } else {
                    self.bump();
                    None
                };
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Return { id, expr });
            }
            "throw" => {
                self.bump();
                let expr = if self.at(";") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Throw { id, expr });
            }
            "break" => {
                self.bump();
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Break { id });
            }
            "continue" => {
                self.bump();
                self.expect(";")?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Continue { id });
            }
            "try" => return self.try_statement(marker),
            "lock" => {
                self.bump();
                let expr = self.parenthesized_condition()?;
                let body = self.embedded_statement()?;
                let id = self.finish(NodeKind::Statement, marker);
                return Ok(Stmt::Lock { id, expr, body });
            }
            "using" => return self.using_statement(marker),
            "await" if self.peek_at(1) == "using" => {
                self.bump();
                return self.using_statement(marker);
            }
            "switch" => return self.switch_statement(marker),
            _ => {}
        }

        if self.at("const") {
            self.bump();
        }
        if let Some(stmt) = self.speculate(|p| p.local_function(marker)) {
            return Ok(stmt);
        }
        if let Some(decl) = self.speculate(|p| {
            let decl = p.local_declaration()?;
            if p.at(";") {
                Ok(decl)
            } else {
                p.error("expected ';'")
            }
        }) {
            self.expect(";")?;
            let id = self.finish(NodeKind::Statement, marker);
            return Ok(Stmt::LocalDeclaration { id, decl });
        }

        let expr = self.expression()?;
        self.expect(";")?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::Expression { id, expr })
    }

    fn local_function(&mut self, marker: Marker) -> PResult<Stmt> {
        let modifiers = self.modifiers();
        let return_type = self.parse_type()?;
        let name = self.expect_ident()?;
        if !self.at("(") && !self.at("<") {
            return self.error("not a local function");
        }
        let method_marker = marker;
        let method = self.method_rest(method_marker, modifiers, return_type, name)?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::LocalFunction {
            id,
            method: Box::new(method),
        })
    }

    /// `Type a = 1, b` without the terminator.
    fn local_declaration(&mut self) -> PResult<LocalDecl> {
        let ty = self.parse_type()?;
        if !self.is_ident_at(0) {
            return self.error("expected identifier");
        }
        match self.peek_at(1) {
            "=" | ";" | "," | "in" | ")" => {}
            _ => return self.error("not a declaration"),
        }
        let first = self.expect_ident()?;
        let declarators = self.declarators_after_first(first)?;
        Ok(LocalDecl { ty, declarators })
    }

    fn for_statement(&mut self, marker: Marker) -> PResult<Stmt> {
        self.expect("for")?;
        self.expect("(")?;
        let init = if self.at(";") {
            None
        } else if let Some(decl) = self.speculate(|p| {
            let decl = p.local_declaration()?;
            if p.at(";") {
                Ok(decl)
            } else {
                p.error("expected ';'")
            }
        }) {
            Some(ForInit::Declaration(decl))
        } else {
            Some(ForInit::Expressions(self.expression_list(";")?))
        };
        self.expect(";")?;
        let condition = if self.at(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let increments = if self.at(")") {
            Vec::new()
        } else {
            self.expression_list(")")?
        };
        self.expect(")")?;
        let body = self.embedded_statement()?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::For {
            id,
            init,
            condition,
            increments,
            body,
        })
    }

    fn expression_list(&mut self, terminator: &str) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expression()?];
        while !self.at(terminator) && self.eat(",") {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    fn foreach_statement(&mut self, marker: Marker) -> PResult<Stmt> {
        self.expect("foreach")?;
        self.expect("(")?;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect("in")?;
        let collection = self.expression()?;
        self.expect(")")?;
        let body = self.embedded_statement()?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::Foreach {
            id,
            ty,
            name,
            collection,
            body,
        })
    }

    fn try_statement(&mut self, marker: Marker) -> PResult<Stmt> {
        self.expect("try")?;
        let block = self.block()?;
        let mut catches = Vec::new();
        while self.at("catch") {
            let catch_marker = self.start();
            self.bump();
            let (ty, name) = if self.eat("(") {
                let ty = self.parse_type()?;
                let name = if self.is_ident_at(0) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                self.expect(")")?;
                (Some(ty), name)
            } else {
                (None, None)
            };
            let filter = if self.at("when") {
                self.bump();
                Some(self.parenthesized_condition()?)
            } else {
                None
            };
            let block = self.block()?;
            let id = self.finish(NodeKind::CatchClause, catch_marker);
            catches.push(CatchClause {
                id,
                ty,
                name,
                filter,
                block,
            });
        }
        let finally = if self.eat("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return self.error("expected 'catch' or 'finally'");
        }
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::Try {
            id,
            block,
            catches,
            finally,
        })
    }

    fn using_statement(&mut self, marker: Marker) -> PResult<Stmt> {
        self.expect("using")?;
        if self.eat("(") {
            let resource = match self.speculate(|p| {
                let decl = p.local_declaration()?;
                if p.at(")") {
                    Ok(decl)
                } else {
                    p.error("expected ')'")
                }
            }) {
                Some(decl) => ForInit::Declaration(decl),
                None => ForInit::Expressions(vec![self.expression()?]),
            };
            self.expect(")")?;
            let body = self.embedded_statement()?;
            let id = self.finish(NodeKind::Statement, marker);
            return Ok(Stmt::Using {
                id,
                resource: Box::new(resource),
                body: Some(body),
            });
        }
        let decl = self.local_declaration()?;
        self.expect(";")?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::Using {
            id,
            resource: Box::new(ForInit::Declaration(decl)),
            body: None,
        })
    }

    fn switch_statement(&mut self, marker: Marker) -> PResult<Stmt> {
        self.expect("switch")?;
        let expr = self.parenthesized_condition()?;
        self.expect("{")?;
        let mut sections = Vec::new();
        while !self.at("}") {
            let section_marker = self.start();
            let mut labels = Vec::new();
            loop {
                if self.eat("default") {
                    self.expect(":")?;
                } else if self.eat("case") {
                    // Declaration patterns (`case Foo f:`) bind no label value.
                    let pattern = self.speculate(|p| {
                        p.parse_type()?;
                        p.expect_ident()?;
                        Ok(())
                    });
                    if pattern.is_none() {
                        labels.push(self.expression()?);
                    }
                    if self.at("when") {
                        self.bump();
                        labels.push(self.expression()?);
                    }
                    self.expect(":")?;
                } else {
                    break;
                }
            }
            if labels.is_empty() && self.pos == section_marker.token as usize {
                return self.error("expected 'case' or 'default'");
            }
            let mut statements = Vec::new();
            while !self.at("case") && !self.at("default") && !self.at("}") {
                if self.at_eof() {
                    return self.error("expected '}', found end of file");
                }
                statements.push(self.statement()?);
            }
            let id = self.finish(NodeKind::SwitchSection, section_marker);
            sections.push(SwitchSection {
                id,
                labels,
                statements,
            });
        }
        self.expect("}")?;
        let id = self.finish(NodeKind::Statement, marker);
        Ok(Stmt::Switch { id, expr, sections })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        if let Some(lambda) = self.try_lambda()? {
            return Ok(lambda);
        }
        let marker = self.start();
        if self.at("throw") {
            self.bump();
            let operand = self.expression()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::Throw {
                id,
                operand: Box::new(operand),
            });
        }
        let target = self.conditional()?;
        if let Some((op, count)) = self.peek_operator() {
            if ASSIGNMENT_OPERATORS.contains(&op.as_str()) {
                for _ in 0..count {
                    self.bump();
                }
                let value = if op == "=" && self.at("{") {
                    self.initializer_list()?
                } else {
                    self.expression()?
                };
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Assignment {
                    id,
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                });
            }
        }
        Ok(target)
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let marker = self.start();
        let condition = self.coalesce()?;
        if !self.at("?") {
            return Ok(condition);
        }
        self.bump();
        let when_true = self.expression()?;
        self.expect(":")?;
        let when_false = self.expression()?;
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::Conditional {
            id,
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        })
    }

    fn coalesce(&mut self) -> PResult<Expr> {
        let marker = self.start();
        let left = self.binary(1)?;
        if !self.at("??") {
            return Ok(left);
        }
        self.bump();
        let right = if self.at("throw") {
            self.expression()?
        } else {
            self.coalesce()?
        };
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::Binary {
            id,
            op: "??".to_string(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn binary(&mut self, min_precedence: u8) -> PResult<Expr> {
        let marker = self.start();
        let mut left = self.unary()?;
        loop {
            let Some((op, count)) = self.peek_operator() else {
                break;
            };
            let Some(precedence) = binary_precedence(&op) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            for _ in 0..count {
                self.bump();
            }
            if op == "is" || op == "as" {
                left = self.type_test(marker, op, left)?;
                continue;
            }
            let right = self.binary(precedence + 1)?;
            let id = self.finish(NodeKind::Expression, marker);
            left = Expr::Binary {
                id,
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn type_test(&mut self, marker: Marker, op: String, operand: Expr) -> PResult<Expr> {
        if op == "is" {
            if self.at("not") && !matches!(self.peek_at(1), ")" | ";" | "," | "&&" | "||") {
                self.bump();
            }
            let constant = matches!(
                self.kind_at(0),
                TokenKind::NumericLiteral | TokenKind::StringLiteral | TokenKind::CharLiteral
            ) || matches!(self.peek(), "null" | "true" | "false" | "-");
            if constant {
                let right = self.unary()?;
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Binary {
                    id,
                    op,
                    left: Box::new(operand),
                    right: Box::new(right),
                });
            }
        }
        let ty = self.parse_type()?;
        if op == "is" && self.is_ident_at(0) && !matches!(self.peek(), "and" | "or" | "when") {
            // Declaration pattern designation; the variable is not bound.
            self.bump();
        }
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::TypeTest {
            id,
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    fn unary(&mut self) -> PResult<Expr> {
        let marker = self.start();
        let op = self.peek();
        if matches!(self.kind_at(0), TokenKind::Punctuation)
            && matches!(op, "+" | "-" | "!" | "~" | "++" | "--" | "^" | "&" | "*")
        {
            self.bump();
            let operand = self.unary()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::Unary {
                id,
                op: op.to_string(),
                operand: Box::new(operand),
            });
        }
        if self.at("await") && self.starts_operand(1) {
            self.bump();
            let operand = self.unary()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::Await {
                id,
                operand: Box::new(operand),
            });
        }
        if self.at("(") {
            if let Some(ty) = self.speculate(|p| p.cast_prefix()) {
                let operand = self.unary()?;
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Cast {
                    id,
                    ty,
                    operand: Box::new(operand),
                });
            }
        }
        self.postfix()
    }

    /// `(Type)` when it introduces a cast.
    fn cast_prefix(&mut self) -> PResult<TypeSyntax> {
        self.expect("(")?;
        let ty = self.parse_type()?;
        self.expect(")")?;
        let predefined = match &ty {
            TypeSyntax::Predefined { .. } => true,
            TypeSyntax::Nullable { inner, .. } => {
                matches!(inner.as_ref(), TypeSyntax::Predefined { .. })
            }
            _ => false,
        };
        let signed_operand = predefined && matches!(self.peek(), "-" | "+" | "++" | "--");
        if self.starts_operand(0) || signed_operand {
            return Ok(ty);
        }
        self.error("not a cast")
    }

    /// Whether the token at `offset` can begin an operand after a cast or `await`.
    fn starts_operand(&self, offset: usize) -> bool {
        match self.kind_at(offset) {
            TokenKind::Identifier
            | TokenKind::NumericLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral
            | TokenKind::InterpolatedStringStart => {
                !matches!(self.peek_at(offset), "is" | "as" | "when" | "and" | "or" | "with")
            }
            TokenKind::Keyword => matches!(
                self.peek_at(offset),
                "this" | "base" | "new" | "typeof" | "default" | "true" | "false" | "null"
                    | "checked" | "unchecked" | "sizeof" | "delegate"
            ) || PREDEFINED_TYPES.contains(&self.peek_at(offset)),
            TokenKind::Punctuation => matches!(self.peek_at(offset), "(" | "!" | "~" | "@"),
            TokenKind::InterpolatedStringText
            | TokenKind::InterpolatedStringEnd
            | TokenKind::EndOfFile => false,
        }
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let marker = self.start();
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                "." => {
                    self.bump();
                    let (name, type_args) = self.simple_name_parts()?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::MemberAccess {
                        id,
                        receiver: Box::new(expr),
                        name,
                        type_args,
                    };
                }
                "?." => {
                    self.bump();
                    let when_not_null = self.member_binding_chain()?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::ConditionalAccess {
                        id,
                        receiver: Box::new(expr),
                        when_not_null: Box::new(when_not_null),
                    };
                }
                "->" => {
                    self.bump();
                    let (name, type_args) = self.simple_name_parts()?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::MemberAccess {
                        id,
                        receiver: Box::new(expr),
                        name,
                        type_args,
                    };
                }
                "(" => {
                    let args = self.argument_list("(", ")")?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::Invocation {
                        id,
                        callee: Box::new(expr),
                        args,
                    };
                }
                "[" => {
                    let args = self.argument_list("[", "]")?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::ElementAccess {
                        id,
                        receiver: Box::new(expr),
                        args,
                    };
                }
                "++" | "--" => {
                    let op = self.peek().to_string();
                    self.bump();
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::Postfix {
                        id,
                        op,
                        operand: Box::new(expr),
                    };
                }
                // Null-forgiving operator; `!` never follows an operand otherwise.
                "!" => {
                    self.bump();
                }
                _ => return Ok(expr),
            }
        }
    }

    /// The part after `?.`: a member binding followed by further accesses.
    fn member_binding_chain(&mut self) -> PResult<Expr> {
        let marker = self.start();
        let name = self.expect_ident()?;
        let id = self.finish(NodeKind::Expression, marker);
        let mut expr = Expr::MemberBinding { id, name };
        loop {
            match self.peek() {
                "." => {
                    self.bump();
                    let (name, type_args) = self.simple_name_parts()?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::MemberAccess {
                        id,
                        receiver: Box::new(expr),
                        name,
                        type_args,
                    };
                }
                "(" => {
                    let args = self.argument_list("(", ")")?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::Invocation {
                        id,
                        callee: Box::new(expr),
                        args,
                    };
                }
                "[" => {
                    let args = self.argument_list("[", "]")?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::ElementAccess {
                        id,
                        receiver: Box::new(expr),
                        args,
                    };
                }
                "?." => {
                    self.bump();
                    let rest = self.member_binding_chain()?;
                    let id = self.finish(NodeKind::Expression, marker);
                    expr = Expr::ConditionalAccess {
                        id,
                        receiver: Box::new(expr),
                        when_not_null: Box::new(rest),
                    };
                }
                "!" => {
                    self.bump();
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Identifier with optional type arguments, as found after `.`.
    fn simple_name_parts(&mut self) -> PResult<(Ident, Vec<TypeSyntax>)> {
        let name = self.expect_ident()?;
        let type_args = self.generic_args_in_expression();
        Ok((name, type_args))
    }

    fn generic_args_in_expression(&mut self) -> Vec<TypeSyntax> {
        if !self.at("<") {
            return Vec::new();
        }
        self.speculate(|p| {
            let args = p.type_argument_list()?;
            if TYPE_ARG_FOLLOWERS.contains(&p.peek()) || p.at_eof() {
                Ok(args)
            } else {
                p.error("not a type argument list")
            }
        })
        .unwrap_or_default()
    }

    fn argument_list(&mut self, open: &str, close: &str) -> PResult<Vec<Argument>> {
        self.expect(open)?;
        let mut args = Vec::new();
        while !self.at(close) {
            args.push(self.argument()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(close)?;
        Ok(args)
    }

    fn argument(&mut self) -> PResult<Argument> {
        let marker = self.start();
        let name = if self.is_ident_at(0) && self.peek_at(1) == ":" && self.peek_at(2) != ":" {
            let name = self.expect_ident()?;
            self.bump();
            Some(name)
        } else {
            None
        };
        let modifier = if matches!(self.peek(), "ref" | "out" | "in") {
            let word = self.peek().to_string();
            self.bump();
            Some(word)
        } else {
            None
        };
        let expr = if modifier.as_deref() == Some("out") {
            // `out var x` / `out int x` declare a variable; bind the name only.
            match self.speculate(|p| {
                let ty = p.parse_type()?;
                if p.is_ident_at(0) {
                    Ok(ty)
                } else {
                    p.error("not a declaration")
                }
            }) {
                Some(_) => {
                    let name_marker = self.start();
                    let ident = self.expect_ident()?;
                    let id = self.finish(NodeKind::Expression, name_marker);
                    Expr::Name {
                        id,
                        ident,
                        type_args: Vec::new(),
                    }
                }
                None => self.expression()?,
            }
        } else {
            self.expression()?
        };
        let id = self.finish(NodeKind::Argument, marker);
        Ok(Argument {
            id,
            modifier,
            name,
            expr,
        })
    }

    fn initializer_list(&mut self) -> PResult<Expr> {
        let marker = self.start();
        self.expect("{")?;
        let mut elements = Vec::new();
        while !self.at("}") {
            let element = if self.at("{") {
                self.initializer_list()?
            } else if self.at("[") {
                // Indexer initializer: `[key] = value`.
                let element_marker = self.start();
                let target_marker = self.start();
                let args = self.argument_list("[", "]")?;
                let target_id = self.finish(NodeKind::Expression, target_marker);
                self.expect("=")?;
                let value = self.variable_initializer()?;
                let id = self.finish(NodeKind::Expression, element_marker);
                Expr::Assignment {
                    id,
                    op: "=".to_string(),
                    target: Box::new(Expr::InitializerList {
                        id: target_id,
                        elements: args.into_iter().map(|a| a.expr).collect(),
                    }),
                    value: Box::new(value),
                }
            } else {
                self.expression()?
            };
            elements.push(element);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::InitializerList { id, elements })
    }

    // ------------------------------------------------------------------------
    // Lambdas
    // ------------------------------------------------------------------------

    fn try_lambda(&mut self) -> PResult<Option<Expr>> {
        let async_offset = usize::from(
            self.at("async")
                && (self.is_ident_at(1) || self.peek_at(1) == "(" || self.peek_at(1) == "delegate"),
        );
        let marker = self.start();
        if self.is_ident_at(async_offset) && self.peek_at(async_offset + 1) == "=>" {
            for _ in 0..async_offset {
                self.bump();
            }
            let param_marker = self.start();
            let name = self.expect_ident()?;
            let id = self.finish(NodeKind::Parameter, param_marker);
            let param = Parameter {
                id,
                modifiers: Modifiers::default(),
                ty: None,
                name,
                default: None,
            };
            self.expect("=>")?;
            return Ok(Some(self.lambda_body(marker, vec![param])?));
        }
        if self.peek_at(async_offset) == "delegate" {
            for _ in 0..async_offset {
                self.bump();
            }
            self.bump();
            let params = if self.at("(") {
                self.lambda_parameters()?
            } else {
                Vec::new()
            };
            let block = self.block()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Some(Expr::Lambda {
                id,
                params,
                body: LambdaBody::Block(block),
            }));
        }
        if self.peek_at(async_offset) == "(" && self.paren_followed_by_arrow(async_offset) {
            for _ in 0..async_offset {
                self.bump();
            }
            let params = self.lambda_parameters()?;
            self.expect("=>")?;
            return Ok(Some(self.lambda_body(marker, params)?));
        }
        Ok(None)
    }

    /// `$"text {value,alignment:format} text"`. Hole values and alignments
    /// are kept in source order; literal text and format specifiers are not.
    fn interpolated_string(&mut self, marker: Marker) -> PResult<Expr> {
        self.bump();
        let mut holes = Vec::new();
        loop {
            match self.kind_at(0) {
                TokenKind::InterpolatedStringEnd => {
                    self.bump();
                    break;
                }
                TokenKind::InterpolatedStringText => {
                    self.bump();
                }
                _ => {
                    self.expect("{")?;
                    holes.push(self.expression()?);
                    if self.eat(",") {
                        holes.push(self.expression()?);
                    }
                    if self.eat(":") && self.kind_at(0) == TokenKind::InterpolatedStringText {
                        self.bump();
                    }
                    self.expect("}")?;
                }
            }
        }
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::InterpolatedString { id, holes })
    }

    fn paren_followed_by_arrow(&self, offset: usize) -> bool {
        let mut depth = 0usize;
        let mut index = self.pos + offset;
        loop {
            let token = self.token(index);
            if token.kind == TokenKind::EndOfFile {
                return false;
            }
            if token.kind != TokenKind::Punctuation {
                index += 1;
                continue;
            }
            match self.text_of(index) {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        return self.text_of(index + 1) == "=>"
                            && self.token(index + 1).kind == TokenKind::Punctuation;
                    }
                }
                _ => {}
            }
            index += 1;
        }
    }

    fn lambda_parameters(&mut self) -> PResult<Vec<Parameter>> {
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.at(")") {
            self.skip_attributes()?;
            let marker = self.start();
            let mut words = Vec::new();
            while matches!(self.peek(), "ref" | "out" | "in" | "params" | "scoped") {
                words.push(self.peek().to_string());
                self.bump();
            }
            let ty = if self.is_ident_at(0) && matches!(self.peek_at(1), "," | ")") {
                None
            } else {
                Some(self.parse_type()?)
            };
            let name = self.expect_ident()?;
            let default = if self.eat("=") {
                Some(self.expression()?)
            } else {
                None
            };
            let id = self.finish(NodeKind::Parameter, marker);
            params.push(Parameter {
                id,
                modifiers: Modifiers { words },
                ty,
                name,
                default,
            });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    fn lambda_body(&mut self, marker: Marker, params: Vec<Parameter>) -> PResult<Expr> {
        let body = if self.at("{") {
            LambdaBody::Block(self.block()?)
        } else {
            LambdaBody::Expression(Box::new(self.expression()?))
        };
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::Lambda { id, params, body })
    }

    // ------------------------------------------------------------------------
    // Primary Expressions
    // ------------------------------------------------------------------------

    fn primary(&mut self) -> PResult<Expr> {
        let marker = self.start();
        match self.kind_at(0) {
            TokenKind::NumericLiteral => {
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Literal {
                    id,
                    kind: LiteralKind::Numeric,
                });
            }
            TokenKind::StringLiteral => {
                let text = self.text_of(self.pos);
                let kind = if text.starts_with('$') || text.starts_with("@$") {
                    LiteralKind::InterpolatedString
                } else {
                    LiteralKind::String
                };
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Literal { id, kind });
            }
            TokenKind::CharLiteral => {
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                return Ok(Expr::Literal {
                    id,
                    kind: LiteralKind::Char,
                });
            }
            TokenKind::InterpolatedStringStart => return self.interpolated_string(marker),
            TokenKind::Identifier => return self.name_expression(marker),
            TokenKind::EndOfFile => return self.error("expected expression, found end of file"),
            TokenKind::InterpolatedStringText | TokenKind::InterpolatedStringEnd => {
                return self.error("expected expression")
            }
            TokenKind::Keyword | TokenKind::Punctuation => {}
        }

        let word = self.peek();
        match word {
            "true" | "false" | "null" => {
                self.bump();
                let kind = match word {
                    "true" => LiteralKind::True,
                    "false" => LiteralKind::False,
                    _ => LiteralKind::Null,
                };
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::Literal { id, kind })
            }
            "this" => {
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::This { id })
            }
            "base" => {
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::Base { id })
            }
            "default" => {
                self.bump();
                if self.at("(") {
                    self.bump();
                    let ty = self.parse_type()?;
                    self.expect(")")?;
                    let id = self.finish(NodeKind::Expression, marker);
                    return Ok(Expr::DefaultOf { id, ty });
                }
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::Literal {
                    id,
                    kind: LiteralKind::Default,
                })
            }
            "typeof" | "sizeof" => {
                self.bump();
                self.expect("(")?;
                let ty = self.parse_type()?;
                self.expect(")")?;
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::TypeOf { id, ty })
            }
            "checked" | "unchecked" => {
                self.bump();
                self.expect("(")?;
                let inner = self.expression()?;
                self.expect(")")?;
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::Parenthesized {
                    id,
                    inner: Box::new(inner),
                })
            }
            "new" => self.creation_expression(marker),
            "(" => self.parenthesized_or_tuple(marker),
            _ if self.kind_at(0) == TokenKind::Keyword && PREDEFINED_TYPES.contains(&word) => {
                self.bump();
                let id = self.finish(NodeKind::Expression, marker);
                Ok(Expr::PredefinedType {
                    id,
                    keyword: word.to_string(),
                })
            }
            _ => self.error(format!("expected expression, found '{}'", word)),
        }
    }

    fn name_expression(&mut self, marker: Marker) -> PResult<Expr> {
        if self.peek_at(1) == "::" {
            let alias = self.expect_ident()?;
            self.bump();
            let ident = self.expect_ident()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::AliasQualified { id, alias, ident });
        }
        let ident = self.expect_ident()?;
        let type_args = self.generic_args_in_expression();
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::Name {
            id,
            ident,
            type_args,
        })
    }

    fn creation_expression(&mut self, marker: Marker) -> PResult<Expr> {
        self.expect("new")?;
        if self.at("(") {
            let args = self.argument_list("(", ")")?;
            let initializer = self.optional_object_initializer()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::ObjectCreation {
                id,
                ty: None,
                args,
                initializer,
            });
        }
        if self.at("{") {
            let initializer = self.optional_object_initializer()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::ObjectCreation {
                id,
                ty: None,
                args: Vec::new(),
                initializer,
            });
        }
        if self.at("[") {
            self.bump();
            while self.eat(",") {}
            self.expect("]")?;
            let initializer = self.optional_object_initializer()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::ArrayCreation {
                id,
                ty: None,
                sizes: Vec::new(),
                initializer,
            });
        }

        let ty = self.non_array_type()?;
        let ty = if self.at("?") {
            let type_marker = Marker {
                token: marker.token + 1,
                pending: self.pending.len() - 1,
            };
            self.bump();
            let id = self.finish(NodeKind::Type, type_marker);
            TypeSyntax::Nullable {
                id,
                inner: Box::new(ty),
            }
        } else {
            ty
        };
        if self.at("[") {
            let mut sizes = Vec::new();
            self.bump();
            while !self.at("]") {
                if !self.at(",") {
                    sizes.push(self.expression()?);
                }
                if !self.eat(",") {
                    break;
                }
            }
            self.expect("]")?;
            while self.at("[") && matches!(self.peek_at(1), "]" | ",") {
                self.bump();
                while self.eat(",") {}
                self.expect("]")?;
            }
            let initializer = self.optional_object_initializer()?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::ArrayCreation {
                id,
                ty: Some(ty),
                sizes,
                initializer,
            });
        }
        let args = if self.at("(") {
            self.argument_list("(", ")")?
        } else if self.at("{") {
            Vec::new()
        } else {
            return self.error("expected '(' or '{' after type in object creation");
        };
        let initializer = self.optional_object_initializer()?;
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::ObjectCreation {
            id,
            ty: Some(ty),
            args,
            initializer,
        })
    }

    fn optional_object_initializer(&mut self) -> PResult<Vec<Expr>> {
        if !self.at("{") {
            return Ok(Vec::new());
        }
        match self.initializer_list()? {
            Expr::InitializerList { elements, .. } => Ok(elements),
            other => Ok(vec![other]),
        }
    }

    fn parenthesized_or_tuple(&mut self, marker: Marker) -> PResult<Expr> {
        self.expect("(")?;
        let first = self.argument()?;
        if self.at(",") {
            let mut elements = vec![first];
            while self.eat(",") {
                elements.push(self.argument()?);
            }
            self.expect(")")?;
            let id = self.finish(NodeKind::Expression, marker);
            return Ok(Expr::Tuple { id, elements });
        }
        self.expect(")")?;
        let id = self.finish(NodeKind::Expression, marker);
        Ok(Expr::Parenthesized {
            id,
            inner: Box::new(first.expr),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> SyntaxTree {
        match parse("test.cs", src) {
            Ok(tree) => tree,
            Err(err) => panic!("parse failed: {}", err),
        }
    }

    fn span_text(tree: &SyntaxTree, id: NodeId) -> &str {
        let span = tree.node_span(id).unwrap_or(Span::new(0, 0));
        &tree.text[span.start..span.end]
    }

    fn method_statements(tree: &SyntaxTree) -> &[Stmt] {
        fn find(members: &[MemberDecl]) -> Option<&[Stmt]> {
            for member in members {
                match member {
                    MemberDecl::Method(MethodDecl {
                        body: Some(Body::Block(block)),
                        ..
                    }) => return Some(&block.statements),
                    MemberDecl::Type(t) => {
                        if let Some(found) = find(&t.members) {
                            return Some(found);
                        }
                    }
                    MemberDecl::Namespace(ns) => {
                        if let Some(found) = find(&ns.members) {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        find(&tree.root.members).unwrap_or(&[])
    }

    fn in_method(body: &str) -> String {
        format!("class C\n{{\n    void M()\n    {{\n{}\n    }}\n}}\n", body)
    }

    mod declaration_tests {
        use super::*;

        #[test]
        fn usings_and_namespaces() {
            let tree = parse_ok(
                "using System;\nusing static System.Math;\nusing T = System.Threading.Thread;\n\
                 namespace A.B { class C {} }\nnamespace D;\nclass E {}\n",
            );
            assert_eq!(tree.root.usings.len(), 3);
            assert!(matches!(tree.root.usings[1].kind, UsingKind::Static));
            assert!(matches!(&tree.root.usings[2].kind, UsingKind::Alias(a) if a.text == "T"));
            assert_eq!(tree.root.members.len(), 2);
            match &tree.root.members[1] {
                MemberDecl::Namespace(ns) => {
                    assert!(ns.file_scoped);
                    assert_eq!(ns.name.dotted(), "D");
                    assert_eq!(ns.members.len(), 1);
                }
                other => panic!("expected namespace, got {:?}", other),
            }
        }

        #[test]
        fn top_level_statements_precede_members() {
            let tree = parse_ok(
                "using System.Threading;\n\
                 int id = Thread.CurrentThread.ManagedThreadId;\n\
                 System.Console.WriteLine(id);\n\
                 static int Twice(int v) => v * 2;\n\
                 namespace App;\n\
                 class C {}\n",
            );
            assert_eq!(tree.root.statements.len(), 3);
            assert!(matches!(tree.root.statements[0], Stmt::LocalDeclaration { .. }));
            assert!(matches!(tree.root.statements[1], Stmt::Expression { .. }));
            assert!(matches!(tree.root.statements[2], Stmt::LocalFunction { .. }));
            assert_eq!(tree.root.members.len(), 1);
        }

        #[test]
        fn statement_after_a_type_is_an_error() {
            assert!(parse("bad.cs", "class C {}\nSystem.Console.WriteLine(1);\n").is_err());
        }

        #[test]
        fn members_of_a_class() {
            let tree = parse_ok(
                "[Serializable]\npublic partial class C : Base, IFoo<int> where T : new()\n{\n\
                     private static readonly int a = 1, b;\n\
                     public int P { get; private set; } = 5;\n\
                     public int Q => a;\n\
                     public C(int x) : base(x) { }\n\
                     public static T Make<T>(T value = default) where T : class => value;\n\
                     public int this[int i] { get => i; }\n\
                     public event EventHandler Changed;\n\
                     public static implicit operator int(C c) => 0;\n\
                     enum E { X, Y = 2 }\n\
                 }\n",
            );
            let MemberDecl::Type(ty) = &tree.root.members[0] else {
                panic!("expected type");
            };
            assert_eq!(ty.name.text, "C");
            assert!(ty.modifiers.has("partial"));
            assert_eq!(ty.bases.len(), 2);
            let kinds: Vec<&str> = ty
                .members
                .iter()
                .map(|m| match m {
                    MemberDecl::Field(_) => "field",
                    MemberDecl::Property(_) => "property",
                    MemberDecl::Method(_) => "method",
                    MemberDecl::Constructor(_) => "ctor",
                    MemberDecl::Type(_) => "type",
                    MemberDecl::EnumMember(_) => "enum-member",
                    MemberDecl::Namespace(_) => "namespace",
                })
                .collect();
            assert_eq!(
                kinds,
                vec!["field", "property", "property", "ctor", "method", "property", "field", "method", "type"]
            );
        }

        #[test]
        fn interface_and_record() {
            let tree = parse_ok(
                "interface I { int M(); int P { get; } }\nrecord R;\nrecord struct S(int X);\n",
            );
            assert_eq!(tree.root.members.len(), 3);
        }
    }

    mod statement_tests {
        use super::*;

        #[test]
        fn local_declaration_vs_expression() {
            let tree = parse_ok(&in_method(
                "int id = Thread.CurrentThread.ManagedThreadId;\nid = 5;\nvar x = a < b;\nFoo(x);\nList<int> xs = null;\nint? n = null;",
            ));
            let stmts = method_statements(&tree);
            assert!(matches!(stmts[0], Stmt::LocalDeclaration { .. }));
            assert!(matches!(stmts[1], Stmt::Expression { .. }));
            assert!(matches!(stmts[2], Stmt::LocalDeclaration { .. }));
            assert!(matches!(stmts[3], Stmt::Expression { .. }));
            assert!(matches!(stmts[4], Stmt::LocalDeclaration { .. }));
            assert!(matches!(stmts[5], Stmt::LocalDeclaration { .. }));
        }

        #[test]
        fn control_flow() {
            let tree = parse_ok(&in_method(
                "if (a) { return; } else b();\nwhile (x) x--;\ndo { } while (y);\n\
                 for (int i = 0; i < 10; i++) { continue; }\nforeach (var item in items) break;\n\
                 try { } catch (Exception e) when (e != null) { throw; } finally { }\n\
                 lock (gate) { }\nusing (var s = Open()) { }\nusing var t = Open();\n\
                 switch (k) { case 1: case Foo f: break; default: return; }\n\
                 int Local(int v) => v;\n;",
            ));
            assert_eq!(method_statements(&tree).len(), 12);
        }
    }

    mod expression_tests {
        use super::*;

        fn first_initializer(tree: &SyntaxTree) -> &Expr {
            match &method_statements(tree)[0] {
                Stmt::LocalDeclaration { decl, .. } => match &decl.declarators[0].init {
                    Some(e) => e,
                    None => panic!("no initializer"),
                },
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn member_chain_span_excludes_trivia() {
            let tree = parse_ok(&in_method(
                "        int pid = Thread.CurrentThread/*c*/.ManagedThreadId /* t */;",
            ));
            let init = first_initializer(&tree);
            assert_eq!(span_text(&tree, init.id()), "Thread.CurrentThread/*c*/.ManagedThreadId");
            let Expr::MemberAccess { receiver, name, .. } = init else {
                panic!("expected member access");
            };
            assert_eq!(name.text, "ManagedThreadId");
            assert_eq!(span_text(&tree, receiver.id()), "Thread.CurrentThread");
            let full = tree.node_full_span(init.id()).unwrap_or(Span::new(0, 0));
            assert_eq!(&tree.text[full.start..full.end], "Thread.CurrentThread/*c*/.ManagedThreadId /* t */");
        }

        #[test]
        fn precedence_and_generics() {
            let tree = parse_ok(&in_method("var r = a + b * c >> 2 >= d ?? e;"));
            let Expr::Binary { op, .. } = first_initializer(&tree) else {
                panic!("expected binary");
            };
            assert_eq!(op, "??");

            let tree = parse_ok(&in_method("var r = M<int>(x) + Cache<string>.Count;"));
            let Expr::Binary { left, right, .. } = first_initializer(&tree) else {
                panic!("expected binary");
            };
            assert!(matches!(left.as_ref(), Expr::Invocation { .. }));
            assert!(matches!(right.as_ref(), Expr::MemberAccess { .. }));
        }

        #[test]
        fn casts_lambdas_and_creation() {
            let tree = parse_ok(&in_method("var r = (long)Thread.CurrentThread.ManagedThreadId;"));
            assert!(matches!(first_initializer(&tree), Expr::Cast { .. }));

            let tree = parse_ok(&in_method("var r = (a) + b;"));
            assert!(matches!(first_initializer(&tree), Expr::Binary { .. }));

            let tree = parse_ok(&in_method("var r = Task.Run(() => { return x; });"));
            let Expr::Invocation { args, .. } = first_initializer(&tree) else {
                panic!("expected invocation");
            };
            assert!(matches!(args[0].expr, Expr::Lambda { .. }));

            let tree = parse_ok(&in_method("var r = new List<int>(4) { 1, 2 };"));
            assert!(matches!(first_initializer(&tree), Expr::ObjectCreation { initializer, .. } if initializer.len() == 2));

            let tree = parse_ok(&in_method("var r = new int[] { 1, 2 };"));
            assert!(matches!(first_initializer(&tree), Expr::ArrayCreation { .. }));
        }

        #[test]
        fn conditional_access_and_interpolation() {
            let tree = parse_ok(&in_method(
                "var r = Thread.CurrentThread?.ManagedThreadId;\nvar s = $\"id {Thread.CurrentThread.ManagedThreadId,4:D} {{x}} {(a ? b : c)}\";",
            ));
            assert!(matches!(first_initializer(&tree), Expr::ConditionalAccess { .. }));
            let Stmt::LocalDeclaration { decl, .. } = &method_statements(&tree)[1] else {
                panic!("expected declaration");
            };
            let Some(Expr::InterpolatedString { holes, .. }) = &decl.declarators[0].init else {
                panic!("expected interpolated string");
            };
            assert_eq!(holes.len(), 3);
            assert_eq!(span_text(&tree, holes[0].id()), "Thread.CurrentThread.ManagedThreadId");
            assert!(matches!(holes[1], Expr::Literal { kind: LiteralKind::Numeric, .. }));
            assert!(matches!(holes[2], Expr::Parenthesized { .. }));
        }

        #[test]
        fn interpolation_hole_nodes_have_parents() {
            let tree = parse_ok(&in_method("var s = $@\"{ Thread.CurrentThread.ManagedThreadId }\";"));
            let Some(Expr::InterpolatedString { id, holes }) =
                method_statements(&tree).first().and_then(|stmt| match stmt {
                    Stmt::LocalDeclaration { decl, .. } => decl.declarators[0].init.as_ref(),
                    _ => None,
                })
            else {
                panic!("expected interpolated string");
            };
            assert_eq!(tree.node(holes[0].id()).and_then(|n| n.parent), Some(*id));
            assert_eq!(span_text(&tree, *id), "$@\"{ Thread.CurrentThread.ManagedThreadId }\"");
        }

        #[test]
        fn ternary_with_member_access() {
            let tree = parse_ok(&in_method("var r = flag ? Thread.CurrentThread.ManagedThreadId : 0;"));
            assert!(matches!(first_initializer(&tree), Expr::Conditional { .. }));
        }
    }

    mod node_table_tests {
        use super::*;

        #[test]
        fn find_node_prefers_innermost_on_tie() {
            let tree = parse_ok(&in_method("Use(Thread.CurrentThread.ManagedThreadId);"));
            let start = tree.text.find("Thread").unwrap_or(0);
            let end = tree.text.find(");").unwrap_or(0);
            let id = tree.find_node(Span::new(start, end));
            let kind = id.and_then(|id| tree.node(id)).map(|n| n.kind);
            assert_eq!(kind, Some(NodeKind::Expression));
            let parent = id
                .and_then(|id| tree.node(id))
                .and_then(|n| n.parent)
                .and_then(|p| tree.node(p))
                .map(|n| n.kind);
            assert_eq!(parent, Some(NodeKind::Argument));
        }

        #[test]
        fn find_node_out_of_range() {
            let tree = parse_ok("class C {}");
            assert_eq!(tree.find_node(Span::new(5, 500)), None);
        }

        #[test]
        fn every_node_has_a_parent_except_the_root() {
            let tree = parse_ok(&in_method("int x = (a + b) * c;"));
            let orphans: Vec<_> = tree
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.parent.is_none())
                .map(|(i, _)| i)
                .collect();
            assert_eq!(orphans, vec![tree.root.id.0 as usize]);
        }

        #[test]
        fn root_full_span_covers_file() {
            let src = "// header\nclass C {}\n// trailer\n";
            let tree = parse_ok(src);
            assert_eq!(tree.node_full_span(tree.root.id), Some(Span::new(0, src.len())));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn missing_semicolon_reports_location() {
            let err = parse("bad.cs", "class C\n{\n    int x = 1\n}\n").err();
            let err = err.map(|e| (e.line, e.message));
            assert_eq!(err, Some((4, "expected ';', found '}'".to_string())));
        }
    }
}

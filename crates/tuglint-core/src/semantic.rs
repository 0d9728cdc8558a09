//! Operation IR and the host semantic seams rules are written against.
//!
//! A host front end parses and binds source into a [`Compilation`] (symbol
//! tables) and one [`SemanticDocument`] per file (syntax spans plus bound
//! [`Operation`] trees). Rules never look at raw syntax: they compare
//! [`SymbolRef`]s, which are equal only for the same declaration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patch::{FileId, Span};
use crate::text::LineIndex;

// ============================================================================
// Identity Types
// ============================================================================

/// Identifies one compilation. Symbol identity never crosses compilations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompilationId(pub u64);

/// Index of a symbol within its compilation's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Identity-stable handle to a declared symbol.
///
/// Two refs are equal exactly when they name the same declaration of the same
/// compilation. A same-named member on a different type is a different ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolRef {
    pub compilation: CompilationId,
    pub id: SymbolId,
}

impl SymbolRef {
    pub fn new(compilation: CompilationId, id: SymbolId) -> Self {
        SymbolRef { compilation, id }
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}@{}", self.id.0, self.compilation.0)
    }
}

/// What a symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Namespace,
    Type,
    Field,
    Property,
    Method,
    Constructor,
    Local,
    Parameter,
}

/// Index of a syntax node within one document's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

// ============================================================================
// Operation IR
// ============================================================================

/// A bound expression.
///
/// `syntax` is the node the operation was bound from and `span` that node's
/// span (trivia excluded). `ty` is the static type when the binder knew it.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub syntax: NodeId,
    pub span: Span,
    pub ty: Option<SymbolRef>,
    pub data: OperationData,
}

/// Reference to a property, static or instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReference {
    pub property: SymbolRef,
    /// Receiver; `None` for static properties.
    pub instance: Option<Box<Operation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationData {
    PropertyReference(PropertyReference),
    FieldReference {
        field: SymbolRef,
        instance: Option<Box<Operation>>,
    },
    LocalReference {
        local: SymbolRef,
    },
    ParameterReference {
        parameter: SymbolRef,
    },
    /// `this`, explicit or implicit.
    InstanceReference,
    Invocation {
        method: Option<SymbolRef>,
        instance: Option<Box<Operation>>,
        arguments: Vec<Operation>,
    },
    ObjectCreation {
        constructor: Option<SymbolRef>,
        arguments: Vec<Operation>,
        /// Object or collection initializer values.
        initializers: Vec<Operation>,
    },
    ArrayCreation {
        /// Dimension sizes followed by initializer elements.
        elements: Vec<Operation>,
    },
    Tuple {
        elements: Vec<Operation>,
    },
    ElementAccess {
        receiver: Box<Operation>,
        arguments: Vec<Operation>,
    },
    Literal,
    /// `$"..."`; `parts` holds each hole's value and alignment.
    InterpolatedString {
        parts: Vec<Operation>,
    },
    Assignment {
        target: Box<Operation>,
        value: Box<Operation>,
    },
    Unary {
        operand: Box<Operation>,
    },
    Binary {
        left: Box<Operation>,
        right: Box<Operation>,
    },
    Conditional {
        condition: Box<Operation>,
        when_true: Box<Operation>,
        when_false: Box<Operation>,
    },
    /// `receiver?.rest`: `when_not_null` refers back to the receiver through
    /// a [`OperationData::ConditionalAccessInstance`].
    ConditionalAccess {
        operation: Box<Operation>,
        when_not_null: Box<Operation>,
    },
    ConditionalAccessInstance,
    /// Explicit cast or `as`.
    Conversion {
        operand: Box<Operation>,
    },
    /// `x is T`.
    IsType {
        operand: Box<Operation>,
    },
    /// Lambda; `body` holds the root operations of its body.
    AnonymousFunction {
        body: Vec<Operation>,
    },
    Await {
        operand: Box<Operation>,
    },
    Throw {
        operand: Box<Operation>,
    },
    /// Could not be bound; children that did bind are kept.
    Invalid {
        children: Vec<Operation>,
    },
}

/// Discriminant of [`OperationData`], used for analyzer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    PropertyReference,
    FieldReference,
    LocalReference,
    ParameterReference,
    InstanceReference,
    Invocation,
    ObjectCreation,
    ArrayCreation,
    Tuple,
    ElementAccess,
    Literal,
    InterpolatedString,
    Assignment,
    Unary,
    Binary,
    Conditional,
    ConditionalAccess,
    ConditionalAccessInstance,
    Conversion,
    IsType,
    AnonymousFunction,
    Await,
    Throw,
    Invalid,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match &self.data {
            OperationData::PropertyReference(_) => OperationKind::PropertyReference,
            OperationData::FieldReference { .. } => OperationKind::FieldReference,
            OperationData::LocalReference { .. } => OperationKind::LocalReference,
            OperationData::ParameterReference { .. } => OperationKind::ParameterReference,
            OperationData::InstanceReference => OperationKind::InstanceReference,
            OperationData::Invocation { .. } => OperationKind::Invocation,
            OperationData::ObjectCreation { .. } => OperationKind::ObjectCreation,
            OperationData::ArrayCreation { .. } => OperationKind::ArrayCreation,
            OperationData::Tuple { .. } => OperationKind::Tuple,
            OperationData::ElementAccess { .. } => OperationKind::ElementAccess,
            OperationData::Literal => OperationKind::Literal,
            OperationData::InterpolatedString { .. } => OperationKind::InterpolatedString,
            OperationData::Assignment { .. } => OperationKind::Assignment,
            OperationData::Unary { .. } => OperationKind::Unary,
            OperationData::Binary { .. } => OperationKind::Binary,
            OperationData::Conditional { .. } => OperationKind::Conditional,
            OperationData::ConditionalAccess { .. } => OperationKind::ConditionalAccess,
            OperationData::ConditionalAccessInstance => OperationKind::ConditionalAccessInstance,
            OperationData::Conversion { .. } => OperationKind::Conversion,
            OperationData::IsType { .. } => OperationKind::IsType,
            OperationData::AnonymousFunction { .. } => OperationKind::AnonymousFunction,
            OperationData::Await { .. } => OperationKind::Await,
            OperationData::Throw { .. } => OperationKind::Throw,
            OperationData::Invalid { .. } => OperationKind::Invalid,
        }
    }

    /// The property reference payload, if this is one.
    pub fn as_property_reference(&self) -> Option<&PropertyReference> {
        match &self.data {
            OperationData::PropertyReference(prop) => Some(prop),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Operation> {
        match &self.data {
            OperationData::PropertyReference(PropertyReference { instance, .. })
            | OperationData::FieldReference { instance, .. } => {
                instance.as_deref().into_iter().collect()
            }
            OperationData::Invocation {
                instance,
                arguments,
                ..
            } => instance
                .as_deref()
                .into_iter()
                .chain(arguments.iter())
                .collect(),
            OperationData::ObjectCreation {
                arguments,
                initializers,
                ..
            } => arguments.iter().chain(initializers.iter()).collect(),
            OperationData::ArrayCreation { elements }
            | OperationData::Tuple { elements }
            | OperationData::InterpolatedString { parts: elements } => elements.iter().collect(),
            OperationData::ElementAccess {
                receiver,
                arguments,
            } => std::iter::once(receiver.as_ref())
                .chain(arguments.iter())
                .collect(),
            OperationData::Assignment { target, value } => vec![target.as_ref(), value.as_ref()],
            OperationData::Unary { operand }
            | OperationData::Conversion { operand }
            | OperationData::IsType { operand }
            | OperationData::Await { operand }
            | OperationData::Throw { operand } => vec![operand.as_ref()],
            OperationData::Binary { left, right } => vec![left.as_ref(), right.as_ref()],
            OperationData::Conditional {
                condition,
                when_true,
                when_false,
            } => vec![condition.as_ref(), when_true.as_ref(), when_false.as_ref()],
            OperationData::ConditionalAccess {
                operation,
                when_not_null,
            } => vec![operation.as_ref(), when_not_null.as_ref()],
            OperationData::AnonymousFunction { body } => body.iter().collect(),
            OperationData::Invalid { children } => children.iter().collect(),
            OperationData::LocalReference { .. }
            | OperationData::ParameterReference { .. }
            | OperationData::InstanceReference
            | OperationData::ConditionalAccessInstance
            | OperationData::Literal => Vec::new(),
        }
    }
}

// ============================================================================
// Walking
// ============================================================================

/// Traversal control returned by walk callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    /// Descend into children.
    Continue,
    /// Skip this node's children.
    SkipChildren,
    /// Halt the whole traversal.
    Stop,
}

/// Pre-order, source-order walk over an operation tree.
pub fn walk_operation<'a, F>(op: &'a Operation, visit: &mut F) -> VisitResult
where
    F: FnMut(&'a Operation) -> VisitResult,
{
    match visit(op) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => return VisitResult::Continue,
        VisitResult::Continue => {}
    }
    for child in op.children() {
        if walk_operation(child, visit) == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

/// Find the operation bound from `node` among the given roots.
pub fn find_operation(roots: &[Operation], node: NodeId) -> Option<&Operation> {
    let mut found = None;
    for root in roots {
        walk_operation(root, &mut |op| {
            if op.syntax == node {
                found = Some(op);
                VisitResult::Stop
            } else {
                VisitResult::Continue
            }
        });
        if found.is_some() {
            break;
        }
    }
    found
}

// ============================================================================
// Host Seams
// ============================================================================

/// Symbol tables of one program, as seen by rules.
pub trait Compilation: Send + Sync {
    fn id(&self) -> CompilationId;

    /// Look up a type by metadata name (`Ns.Outer+Inner`, generic arity as
    /// `` `N ``). Returns `None` when absent or ambiguous.
    fn type_by_metadata_name(&self, metadata_name: &str) -> Option<SymbolRef>;

    /// Members declared directly on a type, in declaration order.
    fn members(&self, ty: SymbolRef) -> Vec<SymbolRef>;

    fn symbol_name(&self, symbol: SymbolRef) -> Option<&str>;

    fn symbol_kind(&self, symbol: SymbolRef) -> Option<SymbolKind>;

    /// Fully qualified display string, e.g. `System.Threading.Thread.CurrentThread`.
    fn symbol_display(&self, symbol: SymbolRef) -> String;
}

/// Members of `ty` named `name`, in declaration order.
pub fn members_named(compilation: &dyn Compilation, ty: SymbolRef, name: &str) -> Vec<SymbolRef> {
    compilation
        .members(ty)
        .into_iter()
        .filter(|m| compilation.symbol_name(*m) == Some(name))
        .collect()
}

/// One parsed and bound source file.
pub trait SemanticDocument: Send + Sync {
    fn file_id(&self) -> FileId;

    fn path(&self) -> &str;

    fn text(&self) -> &str;

    fn line_index(&self) -> &LineIndex;

    fn compilation(&self) -> &dyn Compilation;

    /// Root operations of the document (initializers, statement expressions,
    /// expression bodies) in source order.
    fn operations(&self) -> &[Operation];

    /// Smallest node whose span contains `span`; the innermost one when
    /// several nodes share that span. `None` when `span` is out of range.
    fn find_node(&self, span: Span) -> Option<NodeId>;

    fn node_span(&self, node: NodeId) -> Option<Span>;

    /// Span including the leading trivia of the first token and the
    /// trailing trivia of the last token.
    fn node_full_span(&self, node: NodeId) -> Option<Span>;

    /// Bind `node` as an operation, if it is a bound expression.
    fn operation(&self, node: NodeId) -> Option<Operation> {
        find_operation(self.operations(), node).cloned()
    }

    /// Shortest source text naming `ty` that binds back to `ty` at `position`.
    fn minimal_type_name(&self, ty: SymbolRef, position: usize) -> Option<String>;

    /// Whether the file is generated code.
    fn is_generated(&self) -> bool;
}

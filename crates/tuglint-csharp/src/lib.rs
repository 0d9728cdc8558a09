// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! C# front end for tuglint.
//!
//! Turns C# source text into the semantic model the rules run against:
//!
//! - [`tokenizer`]: tokens with leading and trailing trivia
//! - [`parser`]: a recursive-descent parser producing a [`syntax::SyntaxTree`]
//! - [`symbols`] and [`scope`]: declarations and name lookup
//! - [`compilation`]: declaration passes and binding into operations
//! - [`document`]: the [`tuglint_core::semantic::SemanticDocument`] implementation
//! - [`reference`]: declaration-only metadata references, including the
//!   bundled core library
//!
//! Not modelled: arrays and tuples as types, pattern variables, and
//! interpolated string holes.

mod binder;
pub mod compilation;
pub mod document;
pub mod error;
pub mod parser;
pub mod reference;
pub mod scope;
pub mod symbols;
pub mod syntax;
pub mod tokenizer;

pub use compilation::{CompilationBuilder, Project};
pub use document::CSharpDocument;
pub use error::ParseError;
pub use parser::parse;
pub use reference::{MetadataReference, ReferenceError};
pub use symbols::CSharpCompilation;

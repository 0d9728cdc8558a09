//! tuglint: semantic analysis rules with verified, formatting-preserving fixes.
//!
//! The first rule shipped is CA1839, which rewrites
//! `Thread.CurrentThread.ManagedThreadId` to
//! `Environment.CurrentManagedThreadId` in C# sources.

// Core infrastructure - re-exported from tuglint-core
pub use tuglint_core::cancel;
pub use tuglint_core::diagnostic;
pub use tuglint_core::diff;
pub use tuglint_core::driver;
pub use tuglint_core::error;
pub use tuglint_core::fix;
pub use tuglint_core::output;
pub use tuglint_core::patch;
pub use tuglint_core::semantic;
pub use tuglint_core::text;
pub use tuglint_core::types;

// C# front end
pub use tuglint_csharp as csharp;

// Front door
pub mod cli;
pub mod config;

// Rules
pub mod rules;

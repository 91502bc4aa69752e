//! Shared data model for the Micro-C compiler.
//!
//! This crate holds the pieces every phase agrees on:
//!
//! - [`Span`] / [`Position`]: source locations carried by tokens and nodes
//! - [`NodeId`]: the stable key the semantic tables are built on
//! - [`Type`]: the closed set of semantic types
//! - [`error`]: one error type per phase plus the [`CompileError`] wrapper
//! - [`Diagnostic`]: the `<line>:<column>: <message>` rendering

pub mod diagnostic;
pub mod error;
pub mod ids;
pub mod span;
pub mod types;

pub use diagnostic::Diagnostic;
pub use error::{
    CodegenError, CodegenErrorKind, CompileError, LexError, LexErrors, ParseError,
    ParseErrorKind, SemanticError, SemanticErrorKind,
};
pub use ids::{NodeId, NodeIdGenerator};
pub use span::{Position, Span};
pub use types::{ScalarType, Type};

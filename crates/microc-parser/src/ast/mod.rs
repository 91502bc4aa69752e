//! Abstract Syntax Tree (AST) for Micro-C.
//!
//! This module provides:
//! - AST node definitions for the 18 node kinds
//! - The recursive-descent [`Parser`] that builds them
//!
//! All nodes live in a [`bumpalo::Bump`] arena and are `Copy`; children are
//! arena references or slices. Every node carries the [`NodeId`] later
//! phases key their tables on.
//!
//! # Example
//!
//! ```
//! use microc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     int square(int x) {
//!         return x * x;
//!     }
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(program) => println!("Parsed {} functions", program.functions.len()),
//!     Err(error) => eprintln!("{error}"),
//! }
//! ```

pub mod node;
pub mod ops;

mod parser;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub mod decl;
mod decl_parser;

pub mod printer;

pub use decl::*;
pub use expr::*;
pub use node::*;
pub use ops::*;
pub use parser::Parser;
pub use printer::{AstPrinter, TreeStyle};
pub use stmt::*;

pub use microc_core::{NodeId, ParseError, ParseErrorKind};

use microc_core::Span;

/// The root of a parsed translation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program<'ast> {
    pub id: NodeId,
    pub functions: &'ast [FuncDecl<'ast>],
    pub span: Span,
}

impl<'ast> Program<'ast> {
    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&FuncDecl<'ast>> {
        self.functions.iter().find(|f| f.name.name == name)
    }
}

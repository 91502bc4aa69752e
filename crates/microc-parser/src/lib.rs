//! Micro-C parser crate.
//!
//! This crate provides the front end of the compiler:
//! - Lexical analysis ([`scan`], [`Lexer`])
//! - Abstract Syntax Tree (AST) definitions ([`ast`])
//! - The recursive-descent [`Parser`], which also lowers `for` loops
//!
//! # Example
//!
//! ```
//! use microc_parser::{parse, scan};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let scanned = scan("int main() { return 0; }", &arena);
//! assert!(!scanned.had_error());
//!
//! let program = parse(scanned.tokens, &arena).unwrap();
//! assert_eq!(program.functions.len(), 1);
//! ```

pub mod ast;
pub mod lexer;

use bumpalo::Bump;
use microc_core::ParseError;

pub use ast::{Parser, Program};
pub use lexer::{Lexer, ScanResult, Token, TokenKind, scan};

/// Parse scanned tokens into a [`Program`], stopping at the first error.
pub fn parse<'ast>(tokens: Vec<Token<'ast>>, arena: &'ast Bump) -> Result<Program<'ast>, ParseError> {
    Parser::new(tokens, arena).parse_program()
}

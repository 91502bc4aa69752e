//! Lexical analysis for Micro-C.

mod cursor;
#[allow(clippy::module_inception)]
mod lexer;
mod token;

pub use lexer::{Lexer, ScanResult, scan};
pub use token::{Token, TokenKind, lookup_keyword};

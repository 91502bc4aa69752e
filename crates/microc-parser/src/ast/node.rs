//! Pieces shared by every AST node.

use microc_core::Span;
use std::fmt;

/// A name as written in source, with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    #[inline]
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The closed set of node kinds.
///
/// `for` loops have no kind of their own: the parser lowers them to
/// compound and while statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    FuncDecl,
    EmptyStmt,
    IfStmt,
    WhileStmt,
    ReturnStmt,
    ExprStmt,
    VarDecl,
    ArrayDecl,
    CompoundStmt,
    BinaryOpExpr,
    UnaryOpExpr,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    VarRefExpr,
    ArrayRefExpr,
    FuncCallExpr,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

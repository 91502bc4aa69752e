//! Declaration AST nodes.
//!
//! `VarDecl` and `ArrayDecl` serve both as statements (they introduce a
//! binding) and as declarations (they carry a type). Function parameters are
//! `VarDecl`s without an initializer.

use crate::ast::expr::{Expr, IntLiteral};
use crate::ast::node::Ident;
use crate::ast::stmt::CompoundStmt;
use microc_core::{NodeId, Span};

/// `int name(int a, int b) { ... }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuncDecl<'ast> {
    pub id: NodeId,
    pub return_type: Ident<'ast>,
    pub name: Ident<'ast>,
    pub params: &'ast [VarDecl<'ast>],
    pub body: CompoundStmt<'ast>,
    pub span: Span,
}

/// `int x;` or `int x = expr;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDecl<'ast> {
    pub id: NodeId,
    pub ty: Ident<'ast>,
    pub name: Ident<'ast>,
    pub init: Option<Expr<'ast>>,
    pub span: Span,
}

/// `int xs[10];`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayDecl<'ast> {
    pub id: NodeId,
    pub ty: Ident<'ast>,
    pub name: Ident<'ast>,
    pub size: IntLiteral,
    pub span: Span,
}

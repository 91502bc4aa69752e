//! Expression AST nodes.

use crate::ast::node::{Ident, NodeKind};
use crate::ast::ops::{BinaryOp, UnaryOp};
use microc_core::{NodeId, Span};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// `lhs op rhs`, including assignment
    Binary(&'ast BinaryOpExpr<'ast>),
    /// `-x`, `+x`
    Unary(&'ast UnaryOpExpr<'ast>),
    IntLiteral(IntLiteral),
    FloatLiteral(FloatLiteral),
    StringLiteral(StringLiteral<'ast>),
    /// `x`
    VarRef(VarRefExpr<'ast>),
    /// `a[i]`
    ArrayRef(&'ast ArrayRefExpr<'ast>),
    /// `f(a, b)`
    FuncCall(&'ast FuncCallExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Binary(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::IntLiteral(e) => e.id,
            Expr::FloatLiteral(e) => e.id,
            Expr::StringLiteral(e) => e.id,
            Expr::VarRef(e) => e.id,
            Expr::ArrayRef(e) => e.id,
            Expr::FuncCall(e) => e.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::IntLiteral(e) => e.span,
            Expr::FloatLiteral(e) => e.span,
            Expr::StringLiteral(e) => e.span,
            Expr::VarRef(e) => e.span,
            Expr::ArrayRef(e) => e.span,
            Expr::FuncCall(e) => e.span,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Binary(_) => NodeKind::BinaryOpExpr,
            Expr::Unary(_) => NodeKind::UnaryOpExpr,
            Expr::IntLiteral(_) => NodeKind::IntLiteral,
            Expr::FloatLiteral(_) => NodeKind::FloatLiteral,
            Expr::StringLiteral(_) => NodeKind::StringLiteral,
            Expr::VarRef(_) => NodeKind::VarRefExpr,
            Expr::ArrayRef(_) => NodeKind::ArrayRefExpr,
            Expr::FuncCall(_) => NodeKind::FuncCallExpr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryOpExpr<'ast> {
    pub id: NodeId,
    pub lhs: Expr<'ast>,
    pub op: BinaryOp,
    /// Location of the operator token, used by diagnostics.
    pub op_span: Span,
    pub rhs: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryOpExpr<'ast> {
    pub id: NodeId,
    pub op: UnaryOp,
    pub op_span: Span,
    pub operand: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLiteral {
    pub id: NodeId,
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLiteral {
    pub id: NodeId,
    pub value: f64,
    pub span: Span,
}

/// A string literal. `value` excludes the surrounding quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringLiteral<'ast> {
    pub id: NodeId,
    pub value: &'ast str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarRefExpr<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayRefExpr<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub index: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuncCallExpr<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

//! Statement AST nodes.
//!
//! Variable and array declarations are statements too; their node types
//! live in [`decl`](crate::ast::decl).

use crate::ast::decl::{ArrayDecl, VarDecl};
use crate::ast::expr::Expr;
use crate::ast::node::NodeKind;
use microc_core::{NodeId, Span};

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// `;`
    Empty(EmptyStmt),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    Return(ReturnStmt<'ast>),
    /// `expr;`
    Expr(ExprStmt<'ast>),
    VarDecl(VarDecl<'ast>),
    ArrayDecl(ArrayDecl<'ast>),
    /// `{ ... }`
    Compound(CompoundStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Empty(s) => s.id,
            Stmt::If(s) => s.id,
            Stmt::While(s) => s.id,
            Stmt::Return(s) => s.id,
            Stmt::Expr(s) => s.id,
            Stmt::VarDecl(s) => s.id,
            Stmt::ArrayDecl(s) => s.id,
            Stmt::Compound(s) => s.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Empty(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::VarDecl(s) => s.span,
            Stmt::ArrayDecl(s) => s.span,
            Stmt::Compound(s) => s.span,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Stmt::Empty(_) => NodeKind::EmptyStmt,
            Stmt::If(_) => NodeKind::IfStmt,
            Stmt::While(_) => NodeKind::WhileStmt,
            Stmt::Return(_) => NodeKind::ReturnStmt,
            Stmt::Expr(_) => NodeKind::ExprStmt,
            Stmt::VarDecl(_) => NodeKind::VarDecl,
            Stmt::ArrayDecl(_) => NodeKind::ArrayDecl,
            Stmt::Compound(_) => NodeKind::CompoundStmt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmptyStmt {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub id: NodeId,
    pub condition: Expr<'ast>,
    pub then_branch: Stmt<'ast>,
    pub else_branch: Option<Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub id: NodeId,
    pub condition: Expr<'ast>,
    pub body: Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub id: NodeId,
    pub value: Option<Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub id: NodeId,
    pub expr: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundStmt<'ast> {
    pub id: NodeId,
    pub body: &'ast [Stmt<'ast>],
    pub span: Span,
}

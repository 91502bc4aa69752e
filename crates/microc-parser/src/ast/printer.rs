//! Tree rendering of a parsed program, one node per line.
//!
//! ```text
//! Program #6 <1:1>
//! └── FuncDecl int main #5 <1:5>
//!     └── ReturnStmt #3 <1:14>
//!         └── BinaryOpExpr '+' #2 <1:21>
//!             ├── IntLiteral 1 #0 <1:21>
//!             └── IntLiteral 2 #1 <1:25>
//! ```
//!
//! A function's body statements hang directly off the function.

use std::fmt::Write as _;

use crate::ast::{Expr, FuncDecl, Program, Stmt, VarDecl};

/// Connector characters for the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    #[default]
    Unicode,
    Ascii,
}

impl TreeStyle {
    fn branch(self, last: bool) -> &'static str {
        match (self, last) {
            (Self::Unicode, false) => "├── ",
            (Self::Unicode, true) => "└── ",
            (Self::Ascii, false) => "|-- ",
            (Self::Ascii, true) => "`-- ",
        }
    }

    fn indent(self, last: bool) -> &'static str {
        match (self, last) {
            (Self::Unicode, false) => "│   ",
            (Self::Ascii, false) => "|   ",
            (_, true) => "    ",
        }
    }
}

/// Any node the printer visits.
#[derive(Clone, Copy)]
enum Node<'p, 'ast> {
    Function(&'p FuncDecl<'ast>),
    Param(&'p VarDecl<'ast>),
    Stmt(&'p Stmt<'ast>),
    Expr(&'p Expr<'ast>),
}

impl<'p, 'ast> Node<'p, 'ast> {
    fn label(self) -> String {
        match self {
            Node::Function(func) => format!(
                "FuncDecl {} {} {} <{}>",
                func.return_type, func.name, func.id, func.name.span
            ),
            Node::Param(param) => {
                format!("VarDecl {} {} {} <{}>", param.ty, param.name, param.id, param.name.span)
            }
            Node::Stmt(stmt) => stmt_label(stmt),
            Node::Expr(expr) => expr_label(expr),
        }
    }

    fn children(self) -> Vec<Node<'p, 'ast>> {
        match self {
            Node::Function(func) => {
                let mut children: Vec<_> = func.params.iter().map(Node::Param).collect();
                children.extend(func.body.body.iter().map(Node::Stmt));
                children
            }
            Node::Param(_) => Vec::new(),
            Node::Stmt(stmt) => match stmt {
                Stmt::Empty(_) | Stmt::ArrayDecl(_) => Vec::new(),
                Stmt::If(if_stmt) => {
                    let mut children = vec![
                        Node::Expr(&if_stmt.condition),
                        Node::Stmt(&if_stmt.then_branch),
                    ];
                    children.extend(if_stmt.else_branch.as_ref().map(Node::Stmt));
                    children
                }
                Stmt::While(while_stmt) => {
                    vec![Node::Expr(&while_stmt.condition), Node::Stmt(&while_stmt.body)]
                }
                Stmt::Return(ret) => ret.value.as_ref().map(Node::Expr).into_iter().collect(),
                Stmt::Expr(expr_stmt) => vec![Node::Expr(&expr_stmt.expr)],
                Stmt::VarDecl(decl) => decl.init.as_ref().map(Node::Expr).into_iter().collect(),
                Stmt::Compound(block) => block.body.iter().map(Node::Stmt).collect(),
            },
            Node::Expr(expr) => match expr {
                Expr::Binary(binary) => vec![Node::Expr(&binary.lhs), Node::Expr(&binary.rhs)],
                Expr::Unary(unary) => vec![Node::Expr(&unary.operand)],
                Expr::ArrayRef(array) => vec![Node::Expr(&array.index)],
                Expr::FuncCall(call) => call.args.iter().map(Node::Expr).collect(),
                Expr::IntLiteral(_)
                | Expr::FloatLiteral(_)
                | Expr::StringLiteral(_)
                | Expr::VarRef(_) => Vec::new(),
            },
        }
    }
}

fn stmt_label(stmt: &Stmt<'_>) -> String {
    let detail = match stmt {
        Stmt::VarDecl(decl) => format!(" {} {}", decl.ty, decl.name),
        Stmt::ArrayDecl(decl) => format!(" {} {}[{}]", decl.ty, decl.name, decl.size.value),
        _ => String::new(),
    };
    format!("{}{detail} {} <{}>", stmt.kind(), stmt.id(), stmt.span())
}

fn expr_label(expr: &Expr<'_>) -> String {
    let detail = match expr {
        Expr::Binary(binary) => format!(" '{}'", binary.op),
        Expr::Unary(unary) => format!(" '{}'", unary.op),
        Expr::IntLiteral(lit) => format!(" {}", lit.value),
        Expr::FloatLiteral(lit) => format!(" {:?}", lit.value),
        Expr::StringLiteral(lit) => format!(" \"{}\"", lit.value),
        Expr::VarRef(var) => format!(" {}", var.name),
        Expr::ArrayRef(array) => format!(" {}", array.name),
        Expr::FuncCall(call) => format!(" {}", call.name),
    };
    format!("{}{detail} {} <{}>", expr.kind(), expr.id(), expr.span())
}

/// Renders a [`Program`] as an indented tree.
#[derive(Debug, Default)]
pub struct AstPrinter {
    style: TreeStyle,
    out: String,
}

impl AstPrinter {
    pub fn new(style: TreeStyle) -> Self {
        Self {
            style,
            out: String::new(),
        }
    }

    pub fn print(mut self, program: &Program<'_>) -> String {
        let _ = writeln!(self.out, "Program {} <{}>", program.id, program.span);
        let count = program.functions.len();
        for (index, func) in program.functions.iter().enumerate() {
            self.visit(Node::Function(func), "", index + 1 == count);
        }
        self.out
    }

    fn visit(&mut self, node: Node<'_, '_>, prefix: &str, last: bool) {
        let _ = writeln!(
            self.out,
            "{prefix}{}{}",
            self.style.branch(last),
            node.label()
        );

        let prefix = format!("{prefix}{}", self.style.indent(last));
        let children = node.children();
        let count = children.len();
        for (index, child) in children.into_iter().enumerate() {
            self.visit(child, &prefix, index + 1 == count);
        }
    }
}

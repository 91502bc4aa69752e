//! Pass B: lexical scope resolution.
//!
//! Walks every function body with a stack of scopes, each mapping a name to
//! the node that declared it. A scope is opened for the program, for each
//! function (holding its parameters), for each `if` branch and `while` body,
//! and for every compound statement.
//!
//! Declarations resolve their initializer before binding their own name, so
//! `int x = x;` refers to an enclosing `x`.

use microc_core::{NodeId, SemanticError, SemanticErrorKind};
use microc_parser::ast::{CompoundStmt, Expr, FuncDecl, Ident, Program, Stmt};
use rustc_hash::FxHashMap;

use crate::sema::tables::SymbolTable;

/// Pass B over a [`Program`].
pub struct ScopePass<'ast, 't> {
    scopes: Vec<FxHashMap<&'ast str, NodeId>>,
    symbols: &'t mut SymbolTable,
}

impl<'ast, 't> ScopePass<'ast, 't> {
    pub fn new(symbols: &'t mut SymbolTable) -> Self {
        Self {
            scopes: Vec::new(),
            symbols,
        }
    }

    /// Resolve every variable reference of `program`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'ast>) -> Result<(), SemanticError> {
        self.push_scope();
        for func in program.functions {
            self.visit_function(func)?;
        }
        self.pop_scope();
        Ok(())
    }

    // ==========================================================================
    // Scope stack
    // ==========================================================================

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Run `f` inside a fresh scope. The scope is closed even when `f` fails.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SemanticError>,
    ) -> Result<T, SemanticError> {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Bind `name` in the innermost scope.
    fn define(&mut self, name: &Ident<'ast>, decl: NodeId) -> Result<(), SemanticError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(undefined(name));
        };
        if scope.contains_key(name.name) {
            return Err(SemanticError::at(
                SemanticErrorKind::VariableRedefinition {
                    name: name.name.to_string(),
                },
                name.span,
            ));
        }
        scope.insert(name.name, decl);
        Ok(())
    }

    /// Find the declaration of `name`, innermost scope first, and record it
    /// for the use node.
    fn resolve(&mut self, use_site: NodeId, name: &Ident<'ast>) -> Result<(), SemanticError> {
        let decl = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name.name).copied())
            .ok_or_else(|| undefined(name))?;
        self.symbols.insert(use_site, decl);
        Ok(())
    }

    // ==========================================================================
    // Declarations and statements
    // ==========================================================================

    fn visit_function(&mut self, func: &FuncDecl<'ast>) -> Result<(), SemanticError> {
        self.scoped(|pass| {
            for param in func.params {
                pass.define(&param.name, param.id)?;
            }
            pass.visit_compound(&func.body)
        })
    }

    fn visit_compound(&mut self, block: &CompoundStmt<'ast>) -> Result<(), SemanticError> {
        self.scoped(|pass| {
            for stmt in block.body {
                pass.visit_stmt(stmt)?;
            }
            Ok(())
        })
    }

    /// A branch or loop body gets its own scope even when it is a single
    /// statement.
    fn visit_branch(&mut self, stmt: &Stmt<'ast>) -> Result<(), SemanticError> {
        self.scoped(|pass| pass.visit_stmt(stmt))
    }

    fn visit_stmt(&mut self, stmt: &Stmt<'ast>) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Empty(_) => Ok(()),
            Stmt::If(if_stmt) => {
                self.visit_expr(&if_stmt.condition)?;
                self.visit_branch(&if_stmt.then_branch)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.visit_branch(else_branch)?;
                }
                Ok(())
            }
            Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.condition)?;
                self.visit_branch(&while_stmt.body)
            }
            Stmt::Return(ret) => match &ret.value {
                Some(value) => self.visit_expr(value),
                None => Ok(()),
            },
            Stmt::Expr(expr_stmt) => self.visit_expr(&expr_stmt.expr),
            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    self.visit_expr(init)?;
                }
                self.define(&decl.name, decl.id)
            }
            // The size is an integer literal, nothing to resolve.
            Stmt::ArrayDecl(decl) => self.define(&decl.name, decl.id),
            Stmt::Compound(block) => self.visit_compound(block),
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn visit_expr(&mut self, expr: &Expr<'ast>) -> Result<(), SemanticError> {
        match expr {
            Expr::Binary(binary) => {
                self.visit_expr(&binary.lhs)?;
                self.visit_expr(&binary.rhs)
            }
            Expr::Unary(unary) => self.visit_expr(&unary.operand),
            Expr::IntLiteral(_) | Expr::FloatLiteral(_) | Expr::StringLiteral(_) => Ok(()),
            Expr::VarRef(var) => self.resolve(var.id, &var.name),
            Expr::ArrayRef(array) => {
                self.visit_expr(&array.index)?;
                self.resolve(array.id, &array.name)
            }
            Expr::FuncCall(call) => {
                for arg in call.args {
                    self.visit_expr(arg)?;
                }
                Ok(())
            }
        }
    }
}

fn undefined(name: &Ident<'_>) -> SemanticError {
    SemanticError::at(
        SemanticErrorKind::UndefinedVariable {
            name: name.name.to_string(),
        },
        name.span,
    )
}

//! Pass C: type checking.
//!
//! Computes the type of every expression and declaration and records it in
//! the [`TypeTable`]. Types must match exactly; there are no implicit
//! conversions.
//!
//! | Construct | Rule |
//! |-----------|------|
//! | literal | its intrinsic type |
//! | declaration | the annotated type; an initializer must have the same type |
//! | `a = b` | both sides identical, result is the left-hand type |
//! | comparison | identical numeric operands, result `int` |
//! | arithmetic | identical numeric operands, result the operand type |
//! | `+a`, `-a` | numeric operand, type preserved |
//! | `a[i]` | `i` is `int`, `a` is an array, result the element type |
//! | `f(args)` | arity and every argument type match the signature |
//!
//! Whether the left side of `=` is assignable is left to code generation.

use microc_core::{ScalarType, SemanticError, SemanticErrorKind, Type};
use microc_parser::ast::{
    ArrayDecl, ArrayRefExpr, BinaryOp, BinaryOpExpr, CompoundStmt, Expr, FuncCallExpr, FuncDecl,
    Ident, Program, Stmt, UnaryOpExpr, VarDecl,
};

use crate::sema::resolve_type;
use crate::sema::tables::{FunctionTable, SymbolTable, TypeTable};

/// Pass C over a [`Program`].
pub struct TypeCheckPass<'t> {
    functions: &'t FunctionTable,
    symbols: &'t SymbolTable,
    types: &'t mut TypeTable,
}

impl<'t> TypeCheckPass<'t> {
    pub fn new(
        functions: &'t FunctionTable,
        symbols: &'t SymbolTable,
        types: &'t mut TypeTable,
    ) -> Self {
        Self {
            functions,
            symbols,
            types,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'_>) -> Result<(), SemanticError> {
        for func in program.functions {
            self.visit_function(func)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Declarations and statements
    // ==========================================================================

    fn visit_function(&mut self, func: &FuncDecl<'_>) -> Result<(), SemanticError> {
        for param in func.params {
            self.visit_var_decl(param)?;
        }
        self.visit_compound(&func.body)
    }

    fn visit_compound(&mut self, block: &CompoundStmt<'_>) -> Result<(), SemanticError> {
        for stmt in block.body {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt<'_>) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Empty(_) => {}
            Stmt::If(if_stmt) => {
                self.visit_expr(&if_stmt.condition)?;
                self.visit_stmt(&if_stmt.then_branch)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.visit_stmt(else_branch)?;
                }
            }
            Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.condition)?;
                self.visit_stmt(&while_stmt.body)?;
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.visit_expr(value)?;
                }
            }
            Stmt::Expr(expr_stmt) => {
                self.visit_expr(&expr_stmt.expr)?;
            }
            Stmt::VarDecl(decl) => self.visit_var_decl(decl)?,
            Stmt::ArrayDecl(decl) => self.visit_array_decl(decl)?,
            Stmt::Compound(block) => self.visit_compound(block)?,
        }
        Ok(())
    }

    fn visit_var_decl(&mut self, decl: &VarDecl<'_>) -> Result<(), SemanticError> {
        let declared = resolve_type(&decl.ty)?;

        if let Some(init) = &decl.init {
            let found = self.visit_expr(init)?;
            if found != declared {
                return Err(SemanticError::at(
                    SemanticErrorKind::InitializerMismatch {
                        name: decl.name.name.to_string(),
                        expected: declared,
                        found,
                    },
                    decl.name.span,
                ));
            }
        }

        self.types.insert(decl.id, declared);
        Ok(())
    }

    fn visit_array_decl(&mut self, decl: &ArrayDecl<'_>) -> Result<(), SemanticError> {
        let element = resolve_scalar(&decl.ty)?;
        self.types.insert(decl.size.id, Type::Int);

        // The parser only produces non-negative size literals.
        let len = decl.size.value.unsigned_abs();
        self.types.insert(decl.id, Type::array(element, len));
        Ok(())
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn visit_expr(&mut self, expr: &Expr<'_>) -> Result<Type, SemanticError> {
        let ty = match expr {
            Expr::Binary(binary) => self.visit_binary(binary)?,
            Expr::Unary(unary) => self.visit_unary(unary)?,
            Expr::IntLiteral(_) => Type::Int,
            Expr::FloatLiteral(_) => Type::Float,
            Expr::StringLiteral(_) => Type::String,
            Expr::VarRef(var) => self.declared_type(var.id, &var.name)?,
            Expr::ArrayRef(array) => self.visit_array_ref(array)?,
            Expr::FuncCall(call) => self.visit_call(call)?,
        };
        Ok(self.types.insert(expr.id(), ty))
    }

    fn visit_binary(&mut self, binary: &BinaryOpExpr<'_>) -> Result<Type, SemanticError> {
        let lhs = self.visit_expr(&binary.lhs)?;
        let rhs = self.visit_expr(&binary.rhs)?;

        let numeric_required = binary.op != BinaryOp::Assign;
        if lhs != rhs || (numeric_required && !lhs.is_numeric()) {
            return Err(SemanticError::at(
                SemanticErrorKind::InvalidBinaryOperands {
                    op: binary.op.to_string(),
                    lhs,
                    rhs,
                },
                binary.op_span,
            ));
        }

        Ok(if binary.op.is_comparison() { Type::Int } else { lhs })
    }

    fn visit_unary(&mut self, unary: &UnaryOpExpr<'_>) -> Result<Type, SemanticError> {
        let operand = self.visit_expr(&unary.operand)?;
        if !operand.is_numeric() {
            return Err(SemanticError::at(
                SemanticErrorKind::InvalidUnaryOperand {
                    op: unary.op.to_string(),
                    operand,
                },
                unary.op_span,
            ));
        }
        Ok(operand)
    }

    fn visit_array_ref(&mut self, array: &ArrayRefExpr<'_>) -> Result<Type, SemanticError> {
        let index = self.visit_expr(&array.index)?;
        if index != Type::Int {
            return Err(SemanticError::at(
                SemanticErrorKind::NonIntegerSubscript { found: index },
                array.name.span,
            ));
        }

        self.declared_type(array.id, &array.name)?
            .element()
            .ok_or_else(|| {
                SemanticError::at(
                    SemanticErrorKind::NotAnArray {
                        name: array.name.name.to_string(),
                    },
                    array.name.span,
                )
            })
    }

    fn visit_call(&mut self, call: &FuncCallExpr<'_>) -> Result<Type, SemanticError> {
        let functions = self.functions;
        let name = call.name.name;
        let signature = functions.get(name).ok_or_else(|| {
            SemanticError::at(
                SemanticErrorKind::UnknownFunction {
                    name: name.to_string(),
                },
                call.name.span,
            )
        })?;

        if call.args.len() != signature.params.len() {
            return Err(SemanticError::at(
                SemanticErrorKind::ArgumentCount {
                    name: name.to_string(),
                    given: call.args.len(),
                    expected: signature.params.len(),
                },
                call.name.span,
            ));
        }

        for (index, (arg, expected)) in call.args.iter().zip(&signature.params).enumerate() {
            let given = self.visit_expr(arg)?;
            if given != *expected {
                return Err(SemanticError::at(
                    SemanticErrorKind::ArgumentType {
                        name: name.to_string(),
                        index,
                        given,
                        expected: *expected,
                    },
                    call.name.span,
                ));
            }
        }

        Ok(signature.return_type)
    }

    /// Type of the declaration a variable use resolves to.
    fn declared_type(
        &self,
        use_site: microc_core::NodeId,
        name: &Ident<'_>,
    ) -> Result<Type, SemanticError> {
        self.symbols
            .get(use_site)
            .and_then(|decl| self.types.get(decl))
            .ok_or_else(|| {
                SemanticError::at(
                    SemanticErrorKind::UndefinedVariable {
                        name: name.name.to_string(),
                    },
                    name.span,
                )
            })
    }
}

/// Resolve an array element type name.
fn resolve_scalar(ident: &Ident<'_>) -> Result<ScalarType, SemanticError> {
    ScalarType::from_name(ident.name).ok_or_else(|| {
        SemanticError::at(
            SemanticErrorKind::UnknownType {
                name: ident.name.to_string(),
            },
            ident.span,
        )
    })
}

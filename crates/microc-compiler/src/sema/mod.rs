//! Semantic analysis.
//!
//! Three ordered passes over the same [`Program`], each building one table:
//!
//! 1. [`SignaturePass`]: function signatures into the [`FunctionTable`]
//! 2. [`ScopePass`]: variable uses to declarations in the [`SymbolTable`]
//! 3. [`TypeCheckPass`]: expression and declaration types in the [`TypeTable`]
//!
//! Every pass stops at its first error. The tables are immutable once
//! [`SemanticAnalyzer::analyze`] returns them.
//!
//! # Example
//!
//! ```
//! use microc_compiler::sema::SemanticAnalyzer;
//! use microc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let program = Parser::parse("int main() { int x = 2; return x * x; }", &arena).unwrap();
//! let analysis = SemanticAnalyzer::new().analyze(&program).unwrap();
//! assert_eq!(analysis.symbols.len(), 2);
//! ```

mod scope;
mod signatures;
pub mod tables;
mod type_check;

pub use scope::ScopePass;
pub use signatures::SignaturePass;
pub use tables::{FunctionSignature, FunctionTable, SymbolTable, TypeTable};
pub use type_check::TypeCheckPass;

use log::debug;
use microc_core::{ScalarType, SemanticError, SemanticErrorKind, Type};
use microc_parser::ast::{Ident, Program};

/// The output of semantic analysis, consumed by code generation.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub functions: FunctionTable,
    pub symbols: SymbolTable,
    pub types: TypeTable,
}

/// Runs the three semantic passes in order.
#[derive(Debug)]
pub struct SemanticAnalyzer {
    functions: FunctionTable,
}

impl SemanticAnalyzer {
    /// An analyzer whose function table starts with the runtime intrinsics.
    pub fn new() -> Self {
        Self::with_functions(FunctionTable::with_runtime())
    }

    /// An analyzer starting from a caller-provided function table.
    pub fn with_functions(functions: FunctionTable) -> Self {
        Self { functions }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn analyze(self, program: &Program<'_>) -> Result<Analysis, SemanticError> {
        let mut functions = self.functions;
        let declared = SignaturePass::new(&mut functions).run(program)?;
        debug!("collected {declared} function signatures ({} total)", functions.len());

        let mut symbols = SymbolTable::new();
        ScopePass::new(&mut symbols).run(program)?;
        debug!("resolved {} variable references", symbols.len());

        let mut types = TypeTable::new();
        TypeCheckPass::new(&functions, &symbols, &mut types).run(program)?;
        debug!("typed {} nodes", types.len());

        Ok(Analysis {
            functions,
            symbols,
            types,
        })
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a type name as written in source: exactly `int`, `float`,
/// `string` or `void`.
pub(crate) fn resolve_type(ident: &Ident<'_>) -> Result<Type, SemanticError> {
    ScalarType::from_name(ident.name)
        .map(Type::from)
        .ok_or_else(|| {
            SemanticError::at(
                SemanticErrorKind::UnknownType {
                    name: ident.name.to_string(),
                },
                ident.span,
            )
        })
}

//! Pass A: collect function signatures.
//!
//! Only top-level function declarations are visited. Parameter and return
//! type names are resolved to semantic types and every function is entered
//! into the [`FunctionTable`]. Bodies are not looked at, so calls may refer
//! to functions declared later in the file.

use log::trace;
use microc_core::SemanticError;
use microc_parser::ast::{FuncDecl, Program};

use crate::sema::resolve_type;
use crate::sema::tables::{FunctionSignature, FunctionTable};

/// Pass A over a [`Program`].
pub struct SignaturePass<'t> {
    functions: &'t mut FunctionTable,
}

impl<'t> SignaturePass<'t> {
    pub fn new(functions: &'t mut FunctionTable) -> Self {
        Self { functions }
    }

    /// Register every function of `program`, returning how many were added.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'_>) -> Result<usize, SemanticError> {
        for func in program.functions {
            self.visit_function(func)?;
        }
        Ok(program.functions.len())
    }

    fn visit_function(&mut self, func: &FuncDecl<'_>) -> Result<(), SemanticError> {
        let params = func
            .params
            .iter()
            .map(|param| resolve_type(&param.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = resolve_type(&func.return_type)?;

        let signature = FunctionSignature::new(func.name.name, params, return_type)
            .with_span(func.name.span);
        trace!("signature {signature}");
        self.functions.insert(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use microc_core::{SemanticErrorKind, Span, Type};
    use microc_parser::Parser;

    fn collect(source: &str) -> Result<FunctionTable, SemanticError> {
        let arena = Bump::new();
        let program = Parser::parse(source, &arena).unwrap();
        let mut table = FunctionTable::with_runtime();
        SignaturePass::new(&mut table).run(&program)?;
        Ok(table)
    }

    #[test]
    fn collects_parameter_and_return_types() {
        let table = collect("float scale(float x, int n) { return x; }\nvoid main() {}").unwrap();
        let scale = table.get("scale").unwrap();
        assert_eq!(scale.params, vec![Type::Float, Type::Int]);
        assert_eq!(scale.return_type, Type::Float);
        assert_eq!(scale.span, Some(Span::new(1, 7, 5)));
        assert!(!scale.is_intrinsic());
        assert_eq!(table.get("main").unwrap().return_type, Type::Void);
    }

    #[test]
    fn unknown_type_names() {
        let err = collect("int f(bool b) { return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'bool'");
        assert_eq!(err.span, Some(Span::new(1, 7, 4)));

        let err = collect("Int main() { return 0; }").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UnknownType { name: "Int".into() });
    }

    #[test]
    fn redefinitions() {
        let err = collect("int f() { return 0; }\nint f() { return 1; }").unwrap_err();
        assert_eq!(err.to_string(), "Cannot redefine function 'f'");
        assert_eq!(err.span, Some(Span::new(2, 5, 1)));

        let err = collect("int read() { return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Cannot redefine function 'read'");
    }
}

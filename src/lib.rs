//! Micro-C batch compiler.
//!
//! Runs the four phases in order, each to completion, and stops at the first
//! phase that reports an error:
//!
//! 1. lexing and parsing ([`microc_parser`])
//! 2. semantic analysis ([`microc_compiler::sema`])
//! 3. x86-64 code generation ([`microc_compiler::x64::codegen`])
//! 4. peephole optimisation ([`microc_compiler::x64::optimiser`])
//!
//! # Example
//!
//! ```
//! use microc::{CompileOptions, compile};
//! use microc_compiler::BufferedRuntime;
//!
//! let source = "int main() { print(2 + 3); return 0; }";
//! let compilation = compile(source, &CompileOptions::default()).unwrap();
//! assert!(compilation.assembly().contains(".global main"));
//!
//! let (_, runtime) = compilation.run(BufferedRuntime::new()).unwrap();
//! assert_eq!(runtime.output(), "5\n");
//! ```

mod error;

pub use error::{Error, Result};

use bumpalo::Bump;
use log::debug;
use microc_compiler::sema::{Analysis, SemanticAnalyzer};
use microc_compiler::x64::{CodeGenerator, Machine, Module, Optimisations, Optimiser, OptimiserStats};
use microc_compiler::{MachineError, Runtime};
use microc_core::CompileError;
use microc_parser::ast::{AstPrinter, TreeStyle};
use microc_parser::{Parser, scan};

/// Function the generated program starts in.
pub const ENTRY_POINT: &str = "main";

/// How [`compile`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the peephole optimiser on the generated module.
    pub optimise: bool,
    /// Rewrites the optimiser may apply.
    pub optimisations: Optimisations,
    /// Render the parsed tree into [`Compilation::ast`].
    pub ast_style: Option<TreeStyle>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimise: true,
            optimisations: Optimisations::all(),
            ast_style: None,
        }
    }
}

impl CompileOptions {
    pub fn unoptimised() -> Self {
        Self {
            optimise: false,
            ..Self::default()
        }
    }

    pub fn with_optimisations(mut self, optimisations: Optimisations) -> Self {
        self.optimisations = optimisations;
        self
    }

    pub fn with_ast(mut self, style: TreeStyle) -> Self {
        self.ast_style = Some(style);
        self
    }
}

/// Everything a successful compilation produced.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Tree dump of the program, when requested.
    pub ast: Option<String>,
    pub analysis: Analysis,
    pub module: Module,
    /// Present when the optimiser ran.
    pub stats: Option<OptimiserStats>,
}

impl Compilation {
    /// The module as AT&T assembly text.
    pub fn assembly(&self) -> String {
        self.module.to_string()
    }

    /// Execute the module from [`ENTRY_POINT`], returning `main`'s result and
    /// the runtime.
    pub fn run<R: Runtime>(&self, runtime: R) -> std::result::Result<(i64, R), MachineError> {
        let mut machine = Machine::new(&self.module, runtime)?;
        let value = machine.run(ENTRY_POINT)?;
        Ok((value, machine.into_runtime()))
    }
}

/// Compile `source` through every phase.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(source: &str, options: &CompileOptions) -> std::result::Result<Compilation, CompileError> {
    let arena = Bump::new();

    let program = Parser::parse(source, &arena)?;
    debug!("parsed {} functions", program.functions.len());
    let ast = options
        .ast_style
        .map(|style| AstPrinter::new(style).print(&program));

    let analysis = SemanticAnalyzer::new().analyze(&program)?;
    let mut module = CodeGenerator::from_analysis(&analysis).generate(&program)?;

    let stats = options
        .optimise
        .then(|| Optimiser::new(options.optimisations).optimise(&mut module));

    Ok(Compilation {
        ast,
        analysis,
        module,
        stats,
    })
}

/// One line per token, including the tokens scanned before and after any
/// lexical error.
pub fn token_dump(source: &str) -> String {
    let arena = Bump::new();
    let scanned = scan(source, &arena);
    let mut dump = String::new();
    for token in &scanned.tokens {
        dump.push_str(&token.to_string());
        dump.push('\n');
    }
    dump
}

#[cfg(test)]
mod tests {
    use super::*;
    use microc_compiler::BufferedRuntime;

    #[test]
    fn optimiser_is_optional() {
        let source = "int main() { int x = 2; return x + 1; }";
        let plain = compile(source, &CompileOptions::unoptimised()).unwrap();
        assert!(plain.stats.is_none());

        let optimised = compile(source, &CompileOptions::default()).unwrap();
        let stats = optimised.stats.unwrap();
        assert!(stats.push_pops_combined > 0);
        assert!(optimised.module.instruction_count() < plain.module.instruction_count());
    }

    #[test]
    fn ast_is_rendered_on_request() {
        let source = "int main() { return 0; }";
        assert!(compile(source, &CompileOptions::default()).unwrap().ast.is_none());

        let options = CompileOptions::default().with_ast(TreeStyle::Ascii);
        let ast = compile(source, &options).unwrap().ast.unwrap();
        assert!(ast.starts_with("Program"));
    }

    #[test]
    fn phase_errors_abort() {
        let err = compile("int main() { return y; }", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.diagnostics()[0].to_string(), "1:21: Undefined variable 'y'");

        let err = compile("int main() { return 1 }", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn token_dump_survives_lex_errors() {
        let dump = token_dump("int @ x");
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines[0].ends_with("IDENTIFIER 'int'"));
        assert!(lines[1].ends_with("IDENTIFIER 'x'"));
    }

    #[test]
    fn run_returns_main_result() {
        let compilation = compile("int main() { return 6 * 7; }", &CompileOptions::default()).unwrap();
        let (value, _) = compilation.run(BufferedRuntime::new()).unwrap();
        assert_eq!(value, 42);
    }
}

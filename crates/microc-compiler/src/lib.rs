//! Micro-C compiler back half.
//!
//! ## Modules
//!
//! - [`sema`]: three-pass semantic analysis producing the function, symbol
//!   and type tables
//! - [`x64`]: x86-64 code generation, peephole optimisation and a module
//!   interpreter

pub mod sema;
pub mod x64;

pub use sema::{
    Analysis, FunctionSignature, FunctionTable, SemanticAnalyzer, SymbolTable, TypeTable,
};
pub use x64::{
    BufferedRuntime, CodeGenerator, Machine, MachineError, Module, Optimisations, Optimiser,
    OptimiserStats, Runtime, StdRuntime,
};

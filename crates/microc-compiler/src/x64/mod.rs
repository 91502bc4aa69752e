//! x86-64 backend.
//!
//! - [`module`]: the [`Module`] data model and its AT&T printer
//! - [`abi`]: System V calling convention constants
//! - [`codegen`]: lowering of a checked program into a [`Module`]
//! - [`optimiser`]: peephole rewrites to a fixed point
//! - [`machine`]: an interpreter that executes a [`Module`]

pub mod abi;
pub mod codegen;
mod frame;
pub mod machine;
pub mod module;
mod operand;
pub mod optimiser;

pub use codegen::CodeGenerator;
pub use machine::{BufferedRuntime, Machine, MachineError, Runtime, StdRuntime};
pub use module::{BasicBlock, Instruction, Module, Opcode};
pub use optimiser::{Optimisations, Optimiser, OptimiserStats};

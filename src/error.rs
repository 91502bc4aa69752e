use std::io;

use microc_compiler::MachineError;
use microc_core::{CompileError, Diagnostic};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of the driver.
#[derive(Debug, Error)]
pub enum Error {
    /// The program was rejected by one of the compiler phases.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The generated module failed while executing.
    #[error("runtime error: {0}")]
    Run(#[from] MachineError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Lines to show the user, one per reported problem.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Compile(error) => error.diagnostics(),
            other => vec![Diagnostic::new(None, other.to_string())],
        }
    }

    /// Every diagnostic followed by the source line it points at.
    pub fn render(&self, source: &str) -> String {
        self.diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.display_with_source(source))
            .collect()
    }
}

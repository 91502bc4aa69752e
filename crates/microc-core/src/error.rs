//! Error types for every compilation phase.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompileError (top-level wrapper)
//! ├── LexErrors       - every lexical error found in one scan
//! ├── ParseError      - first syntax error (with ParseErrorKind)
//! ├── SemanticError   - first violation found by an analysis pass
//! └── CodegenError    - construct the x86-64 backend cannot lower
//! ```
//!
//! Only the lexer batches errors. Every later phase stops at its first error
//! and returns it through `Result`.

use thiserror::Error;

use crate::{Diagnostic, NodeId, Span, Type};

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during lexical analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// A character that cannot start any token.
    #[error("Invalid character '{ch}'")]
    InvalidCharacter { ch: char, span: Span },

    /// A newline or end of input before the closing quote.
    #[error("Unterminated string literal")]
    UnterminatedString { span: Span },

    /// A numeric literal with a second `.`.
    #[error("Float literals must only contain one decimal point")]
    MultipleDecimalPoints { span: Span },

    /// A `!` not followed by `=`.
    #[error("expected '=' after '!'")]
    ExpectedEqualsAfterBang { span: Span },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::InvalidCharacter { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::MultipleDecimalPoints { span } => *span,
            LexError::ExpectedEqualsAfterBang { span } => *span,
        }
    }
}

/// All lexical errors from one scan, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexErrors {
    errors: Vec<LexError>,
}

impl LexErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: LexError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LexError> {
        self.errors.iter()
    }

    pub fn first(&self) -> Option<&LexError> {
        self.errors.first()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), LexErrors> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<Vec<LexError>> for LexErrors {
    fn from(errors: Vec<LexError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for LexErrors {
    type Item = LexError;
    type IntoIter = std::vec::IntoIter<LexError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a LexErrors {
    type Item = &'a LexError;
    type IntoIter = std::slice::Iter<'a, LexError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl std::fmt::Display for LexErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {error}", error.span())?;
        }
        Ok(())
    }
}

impl std::error::Error for LexErrors {}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A specific token was expected but not found.
    ExpectedToken,
    /// A token that cannot start an atom.
    UnexpectedToken,
    /// Input ended in the middle of a construct.
    UnexpectedEof,
    /// A chained equality or comparison operator.
    NonAssociative,
    /// A literal value could not be converted.
    InvalidLiteral,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::NonAssociative => "non-associative operator",
            ParseErrorKind::InvalidLiteral => "invalid literal",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A syntax error at the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// Location of the offending token.
    pub span: Span,
    /// Lexeme of the offending token (empty at end of input).
    pub found: String,
    /// The diagnostic message.
    pub message: String,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        span: Span,
        found: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            span,
            found: found.into(),
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str, lexeme: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            lexeme,
            format!("Expected {expected}, but found {found}"),
        )
    }

    /// Create an error for a token that cannot start an atom.
    pub fn unexpected_token(span: Span, found: &str, lexeme: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            lexeme,
            format!("Unexpected token {found} for atom"),
        )
    }

    /// Create an "unexpected end of file" error.
    pub fn unexpected_eof(span: Span, expected: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedEof,
            span,
            "",
            format!("Expected {expected}, but found end of file"),
        )
    }

    /// Create the error for `a == b == c` and `a < b < c`.
    pub fn non_associative(span: Span, lexeme: &str) -> Self {
        Self::new(
            ParseErrorKind::NonAssociative,
            span,
            lexeme,
            "non-associative operators may not be used multiple times in a row",
        )
    }

    /// Create an error for an integer literal outside the 64-bit range.
    pub fn integer_out_of_range(span: Span, lexeme: &str) -> Self {
        Self::new(
            ParseErrorKind::InvalidLiteral,
            span,
            lexeme,
            format!("Integer literal '{lexeme}' out of range"),
        )
    }

    /// Create an error for a float literal that does not convert.
    pub fn invalid_float(span: Span, lexeme: &str) -> Self {
        Self::new(
            ParseErrorKind::InvalidLiteral,
            span,
            lexeme,
            format!("Invalid float literal '{lexeme}'"),
        )
    }
}

// ============================================================================
// Semantic Errors
// ============================================================================

/// What a semantic pass rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticErrorKind {
    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Cannot redefine function '{name}'")]
    FunctionRedefinition { name: String },

    #[error("Cannot redefine variable '{name}'")]
    VariableRedefinition { name: String },

    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error(
        "Type of initializer does not match type of variable '{name}': expected {expected}, found {found}"
    )]
    InitializerMismatch {
        name: String,
        expected: Type,
        found: Type,
    },

    #[error("Invalid operand types to binary operator '{op}'")]
    InvalidBinaryOperands { op: String, lhs: Type, rhs: Type },

    #[error("Invalid operand type to unary operator '{op}'")]
    InvalidUnaryOperand { op: String, operand: Type },

    #[error("Array subscript must be an integer")]
    NonIntegerSubscript { found: Type },

    #[error("Cannot subscript non-array variable '{name}'")]
    NotAnArray { name: String },

    #[error("Call to unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Invalid number of arguments for call to '{name}': {given} given, but expected {expected}")]
    ArgumentCount {
        name: String,
        given: usize,
        expected: usize,
    },

    #[error(
        "Invalid type for argument {index} of call to '{name}': {given} given, but expected {expected}"
    )]
    ArgumentType {
        name: String,
        index: usize,
        given: Type,
        expected: Type,
    },
}

/// A semantic error with an optional location.
///
/// Declarations seeded by the compiler (runtime intrinsics) have no source
/// position, so the span is optional.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub span: Option<Span>,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, span: Option<Span>) -> Self {
        Self { kind, span }
    }

    /// Create an error located at `span`.
    pub fn at(kind: SemanticErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }
}

// ============================================================================
// Code Generation Errors
// ============================================================================

/// What the code generator could not lower.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenErrorKind {
    /// A construct outside the integer subset.
    #[error("{what} not supported by this code generator")]
    Unsupported { what: String },

    /// Assignment to anything other than a plain variable.
    #[error("Only variable references can be used as lvalues")]
    InvalidAssignmentTarget,

    /// A reference to a declaration that has no frame slot.
    #[error("Variable '{name}' is not allocated in the stack frame")]
    UnallocatedVariable { name: String },

    /// A node the semantic tables should have covered but did not.
    #[error("No {table} entry for node {node}")]
    MissingAnnotation { table: &'static str, node: NodeId },
}

/// A code generation error with an optional location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    pub span: Option<Span>,
}

impl CodegenError {
    pub fn new(kind: CodegenErrorKind, span: Option<Span>) -> Self {
        Self { kind, span }
    }

    /// Create an error located at `span`.
    pub fn at(kind: CodegenErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    /// Shorthand for [`CodegenErrorKind::Unsupported`].
    pub fn unsupported(what: impl Into<String>, span: Span) -> Self {
        Self::at(CodegenErrorKind::Unsupported { what: what.into() }, span)
    }

    /// Shorthand for [`CodegenErrorKind::MissingAnnotation`].
    pub fn missing(table: &'static str, node: NodeId) -> Self {
        Self::new(CodegenErrorKind::MissingAnnotation { table, node }, None)
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// Any error that aborts a compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexErrors),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl CompileError {
    /// Location of the (first) error, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex(errors) => errors.first().map(LexError::span),
            CompileError::Parse(error) => Some(error.span),
            CompileError::Semantic(error) => error.span,
            CompileError::Codegen(error) => error.span,
        }
    }

    /// One diagnostic per reported error.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Lex(errors) => errors
                .iter()
                .map(|e| Diagnostic::new(Some(e.span()), e.to_string()))
                .collect(),
            CompileError::Parse(error) => {
                vec![Diagnostic::new(Some(error.span), error.message.clone())]
            }
            CompileError::Semantic(error) => {
                vec![Diagnostic::new(error.span, error.kind.to_string())]
            }
            CompileError::Codegen(error) => {
                vec![Diagnostic::new(error.span, error.kind.to_string())]
            }
        }
    }
}

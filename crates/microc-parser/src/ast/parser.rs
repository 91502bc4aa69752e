//! Parser infrastructure for Micro-C.
//!
//! Provides the main [`Parser`] struct with token navigation, node id
//! allocation and arena helpers. The grammar itself lives in
//! `decl_parser`, `stmt_parser` and `expr_parser`.

use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;
use microc_core::{CompileError, NodeId, NodeIdGenerator, ParseError, Span};

use crate::ast::{Expr, Program, Stmt};
use crate::lexer::{Token, TokenKind, scan};

/// Recursive-descent parser over a fully scanned token buffer.
///
/// The `'ast` lifetime refers to the arena where AST nodes and token
/// lexemes are allocated.
pub struct Parser<'ast> {
    /// Scanned tokens followed by one synthetic `Eof` token.
    pub(super) buffer: Vec<Token<'ast>>,
    /// Current position in the buffer
    pub(super) position: usize,
    /// Arena allocator for AST nodes
    pub(super) arena: &'ast Bump,
    /// Node ids are instance-local so repeated parses number identically.
    ids: NodeIdGenerator,
}

impl<'ast> Parser<'ast> {
    /// Create a parser over tokens produced by [`scan`].
    pub fn new(mut tokens: Vec<Token<'ast>>, arena: &'ast Bump) -> Self {
        let eof_span = tokens
            .last()
            .map(|last| Span::point(last.span.line, last.span.end().col))
            .unwrap_or_else(|| Span::point(1, 1));
        tokens.push(Token::new(TokenKind::Eof, "", eof_span));

        Self {
            buffer: tokens,
            position: 0,
            arena,
            ids: NodeIdGenerator::new(),
        }
    }

    /// Scan and parse a whole program.
    ///
    /// Lexical errors are reported as a batch and parsing is not attempted.
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<Program<'ast>, CompileError> {
        let tokens = scan(source, arena).into_result()?;
        Ok(Parser::new(tokens, arena).parse_program()?)
    }

    /// Scan and parse a single expression that must span the whole input.
    pub fn expression(source: &str, arena: &'ast Bump) -> Result<Expr<'ast>, CompileError> {
        let tokens = scan(source, arena).into_result()?;
        let mut parser = Parser::new(tokens, arena);
        let expr = parser.parse_expr()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    /// Scan and parse a single statement that must span the whole input.
    pub fn statement(source: &str, arena: &'ast Bump) -> Result<Stmt<'ast>, CompileError> {
        let tokens = scan(source, arena).into_result()?;
        let mut parser = Parser::new(tokens, arena);
        let stmt = parser.parse_statement()?;
        parser.expect(TokenKind::Eof)?;
        Ok(stmt)
    }

    /// Number of node ids handed out so far.
    pub fn node_count(&self) -> u32 {
        self.ids.issued()
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    /// Peek at the current token without consuming it.
    #[inline]
    pub fn peek(&self) -> Token<'ast> {
        self.peek_nth(0)
    }

    /// Peek ahead n tokens without consuming. Past the end this keeps
    /// returning the `Eof` token.
    pub fn peek_nth(&self, n: usize) -> Token<'ast> {
        let last = self.buffer.len() - 1;
        self.buffer[(self.position + n).min(last)]
    }

    /// Get the current token and advance to the next.
    pub fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    /// Check if the current token matches the given kind.
    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// If the current token matches the given kind, consume it and return Some.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Expect the current token to be of the given kind.
    /// If it matches, consume and return it. Otherwise, return an error.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(kind.description()))
        }
    }

    // ========================================================================
    // Error Handling
    // ========================================================================

    /// Build an error for the current token, which is not `expected`.
    pub(super) fn error_expected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::unexpected_eof(token.span, expected)
        } else {
            ParseError::expected_token(token.span, expected, &describe(&token), token.lexeme)
        }
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    /// Allocate the next node id.
    #[inline]
    pub(super) fn next_id(&mut self) -> NodeId {
        self.ids.next_id()
    }

    /// Move a node into the arena.
    #[inline]
    pub(super) fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    /// Start an arena-backed list of child nodes.
    #[inline]
    pub(super) fn list<T>(&self) -> BVec<'ast, T> {
        BVec::new_in(self.arena)
    }
}

/// Describe a token for diagnostics, showing the lexeme of names and
/// literals.
pub(super) fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Identifier
        | TokenKind::IntLiteral
        | TokenKind::FloatLiteral
        | TokenKind::StringLiteral => format!("{} '{}'", token.kind, token.lexeme),
        kind => kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser<'ast>(source: &str, arena: &'ast Bump) -> Parser<'ast> {
        let tokens = scan(source, arena).into_result().unwrap();
        Parser::new(tokens, arena)
    }

    #[test]
    fn navigation_stops_at_eof() {
        let arena = Bump::new();
        let mut p = parser("a b", &arena);
        assert_eq!(p.peek_nth(1).lexeme, "b");
        assert_eq!(p.peek_nth(5).kind, TokenKind::Eof);
        p.advance();
        p.advance();
        assert!(p.is_eof());
        assert_eq!(p.advance().kind, TokenKind::Eof);
        assert!(p.is_eof());
    }

    #[test]
    fn eof_span_follows_last_token() {
        let arena = Bump::new();
        let p = parser("int x", &arena);
        assert_eq!(p.peek_nth(2).span, Span::point(1, 6));
    }

    #[test]
    fn expect_reports_found_token() {
        let arena = Bump::new();
        let mut p = parser("x", &arena);
        let err = p.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.message, "Expected ';', but found identifier 'x'");
        assert_eq!(err.found, "x");
        assert_eq!(err.span, Span::new(1, 1, 1));
    }

    #[test]
    fn expect_at_end_of_input() {
        let arena = Bump::new();
        let mut p = parser("", &arena);
        let err = p.expect(TokenKind::RightBrace).unwrap_err();
        assert_eq!(err.message, "Expected '}', but found end of file");
    }
}

//! Token types for the Micro-C lexer.

use microc_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The lexeme is copied into the parse arena, so tokens (and the AST built
/// from them) do not borrow the source string.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    /// Exact source text, quotes included for string literals.
    pub lexeme: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

impl fmt::Display for Token<'_> {
    /// Token dump line: `<begin> -> <end> <KIND> '<lexeme>'`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} {} '{}'",
            self.span.begin(),
            self.span.end(),
            self.kind.name(),
            self.lexeme
        )
    }
}

/// Every token kind the lexer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Keywords
    // =========================================
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `for`
    For,

    // =========================================
    // Identifiers and literals
    // =========================================
    /// Type names, variables and functions alike
    Identifier,
    /// `42`
    IntLiteral,
    /// `3.14`, `.5`, `1.`
    FloatLiteral,
    /// `"text"`
    StringLiteral,

    // =========================================
    // Operators
    // =========================================
    /// `=`
    Equals,
    /// `==`
    EqualsEquals,
    /// `!=`
    BangEquals,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEquals,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `^`
    Caret,
    /// `%`
    Percent,

    // =========================================
    // Punctuation
    // =========================================
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `,`
    Comma,
    /// `;`
    Semicolon,

    /// End of input. Never produced by [`scan`](super::scan); the parser
    /// appends it to its buffer.
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Return | TokenKind::If | TokenKind::Else | TokenKind::While | TokenKind::For
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral
        )
    }

    /// Upper-case name used by the token dump.
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Return => "RETURN",
            If => "IF",
            Else => "ELSE",
            While => "WHILE",
            For => "FOR",
            Identifier => "IDENTIFIER",
            IntLiteral => "INT_LITERAL",
            FloatLiteral => "FLOAT_LITERAL",
            StringLiteral => "STRING_LITERAL",
            Equals => "EQUALS",
            EqualsEquals => "EQUALS_EQUALS",
            BangEquals => "BANG_EQUALS",
            LessThan => "LESS_THAN",
            LessThanEquals => "LESS_THAN_EQUALS",
            GreaterThan => "GREATER_THAN",
            GreaterThanEquals => "GREATER_THAN_EQUALS",
            Plus => "PLUS",
            Minus => "MINUS",
            Star => "STAR",
            Slash => "SLASH",
            Caret => "CARET",
            Percent => "PERCENT",
            LeftParen => "LEFT_PAREN",
            RightParen => "RIGHT_PAREN",
            LeftBrace => "LEFT_BRACE",
            RightBrace => "RIGHT_BRACE",
            LeftBracket => "LEFT_BRACKET",
            RightBracket => "RIGHT_BRACKET",
            Comma => "COMMA",
            Semicolon => "SEMICOLON",
            Eof => "EOF",
        }
    }

    /// Get the string representation of this token kind for error messages.
    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            Return => "'return'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            For => "'for'",
            Identifier => "identifier",
            IntLiteral => "integer literal",
            FloatLiteral => "float literal",
            StringLiteral => "string literal",
            Equals => "'='",
            EqualsEquals => "'=='",
            BangEquals => "'!='",
            LessThan => "'<'",
            LessThanEquals => "'<='",
            GreaterThan => "'>'",
            GreaterThanEquals => "'>='",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Caret => "'^'",
            Percent => "'%'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Comma => "','",
            Semicolon => "';'",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Map a keyword string to its [`TokenKind`], or `None` if not a keyword.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    match ident {
        "if" => Some(TokenKind::If),
        "for" => Some(TokenKind::For),
        "else" => Some(TokenKind::Else),
        "while" => Some(TokenKind::While),
        "return" => Some(TokenKind::Return),
        _ => None,
    }
}

//! Main lexer implementation for Micro-C.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s using
//! direct dispatch on the first character of each lexeme. Lexical errors do
//! not stop scanning: the offending text is skipped, the error is recorded,
//! and scanning resumes so that later errors also surface.
//!
//! Lexemes are copied into the arena, so the source string may be dropped
//! once scanning completes.

use bumpalo::Bump;
use log::debug;
use microc_core::{LexError, LexErrors, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Lexer for Micro-C source code.
///
/// The `'src` lifetime is the source string being lexed (temporary).
/// The `'ast` lifetime is the arena where token lexemes are allocated.
pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    /// Check if any errors occurred so far.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take accumulated errors, leaving an empty list.
    pub fn take_errors(&mut self) -> LexErrors {
        LexErrors::from(std::mem::take(&mut self.errors))
    }

    /// Scan the next token, skipping whitespace, comments and erroneous
    /// text. Returns `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token<'ast>> {
        loop {
            self.skip_whitespace();

            if self.cursor.is_eof() {
                return None;
            }

            if let Some(token) = self.scan_token() {
                return Some(token);
            }
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    /// Scan one lexeme. `None` means the lexeme produced no token (a
    /// comment or an error).
    fn scan_token(&mut self) -> Option<Token<'ast>> {
        let start_line = self.cursor.line();
        let start_col = self.cursor.column();
        let start_offset = self.cursor.offset();
        let start = (start_line, start_col, start_offset);

        match self.cursor.peek()? {
            '/' => self.scan_slash(start),
            '"' => self.scan_string(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number(start)
            }
            c if is_ident_start(c) => Some(self.scan_identifier(start)),
            _ => self.scan_operator(start),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.cursor.check(|c| matches!(c, ' ' | '\n' | '\r' | '\t')) {
            self.cursor.advance();
        }
    }

    /// Create a token from the start position to the current position.
    fn make_token(&self, kind: TokenKind, (line, col, offset): Start) -> Token<'ast> {
        let len = self.cursor.offset() - offset;
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(offset));
        Token::new(kind, lexeme, Span::new(line, col, len))
    }

    /// Span from the start position to the current position.
    fn span_from(&self, (line, col, offset): Start) -> Span {
        Span::new(line, col, self.cursor.offset() - offset)
    }

    fn error(&mut self, error: LexError) -> Option<Token<'ast>> {
        self.errors.push(error);
        None
    }

    // =========================================
    // Scanning: Comments and slash
    // =========================================

    /// `//` starts a comment running up to (not including) the newline.
    fn scan_slash(&mut self, start: Start) -> Option<Token<'ast>> {
        self.cursor.advance();

        if self.cursor.eat('/') {
            self.cursor.eat_while(|c| c != '\n');
            return None;
        }

        Some(self.make_token(TokenKind::Slash, start))
    }

    // =========================================
    // Scanning: Strings
    // =========================================

    /// Scan a string literal. The lexeme keeps both quotes.
    fn scan_string(&mut self, start: Start) -> Option<Token<'ast>> {
        self.cursor.advance();

        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start);
                    return self.error(LexError::UnterminatedString { span });
                }
                Some('"') => {
                    self.cursor.advance();
                    return Some(self.make_token(TokenKind::StringLiteral, start));
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    // =========================================
    // Scanning: Numbers
    // =========================================

    /// Scan an integer or float literal.
    ///
    /// A literal with a second decimal point is consumed in full (digits and
    /// dots) and reported once.
    fn scan_number(&mut self, start: Start) -> Option<Token<'ast>> {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        if !self.cursor.eat('.') {
            return Some(self.make_token(TokenKind::IntLiteral, start));
        }

        self.cursor.eat_while(|c| c.is_ascii_digit());

        if self.cursor.peek() == Some('.') {
            self.cursor.eat_while(|c| c == '.' || c.is_ascii_digit());
            let span = self.span_from(start);
            return self.error(LexError::MultipleDecimalPoints { span });
        }

        Some(self.make_token(TokenKind::FloatLiteral, start))
    }

    // =========================================
    // Scanning: Identifiers and keywords
    // =========================================

    /// Scan an identifier or keyword.
    ///
    /// The whole identifier run is consumed first, so a keyword prefix
    /// followed by more identifier characters (`ifx`) stays an identifier.
    fn scan_identifier(&mut self, start: Start) -> Token<'ast> {
        let lexeme = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    // =========================================
    // Scanning: Operators and punctuation
    // =========================================

    fn scan_operator(&mut self, start: Start) -> Option<Token<'ast>> {
        let c = self.cursor.advance()?;

        let kind = match (c, self.cursor.peek()) {
            ('=', Some('=')) => self.two_char(TokenKind::EqualsEquals),
            ('=', _) => TokenKind::Equals,
            ('!', Some('=')) => self.two_char(TokenKind::BangEquals),
            ('!', _) => {
                let span = self.span_from(start);
                return self.error(LexError::ExpectedEqualsAfterBang { span });
            }
            ('<', Some('=')) => self.two_char(TokenKind::LessThanEquals),
            ('<', _) => TokenKind::LessThan,
            ('>', Some('=')) => self.two_char(TokenKind::GreaterThanEquals),
            ('>', _) => TokenKind::GreaterThan,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('^', _) => TokenKind::Caret,
            ('%', _) => TokenKind::Percent,
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            (ch, _) => {
                let span = self.span_from(start);
                return self.error(LexError::InvalidCharacter { ch, span });
            }
        };

        Some(self.make_token(kind, start))
    }

    /// Consume the second character of a two-character operator.
    fn two_char(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }
}

/// Line, column and byte offset where the current lexeme starts.
type Start = (u32, u32, u32);

impl<'src, 'ast> Iterator for Lexer<'src, 'ast> {
    type Item = Token<'ast>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// The outcome of scanning a whole source text.
#[derive(Debug)]
pub struct ScanResult<'ast> {
    /// Every successfully scanned token, in source order.
    pub tokens: Vec<Token<'ast>>,
    /// Every lexical error, in source order.
    pub errors: LexErrors,
}

impl<'ast> ScanResult<'ast> {
    /// Whether the sticky error flag was raised during the scan.
    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The tokens, or all lexical errors if there were any.
    pub fn into_result(self) -> Result<Vec<Token<'ast>>, LexErrors> {
        self.errors.into_result()?;
        Ok(self.tokens)
    }
}

/// Scan `source` to completion.
///
/// Scanning never stops early; callers must not parse the tokens when
/// [`ScanResult::had_error`] is set.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn scan<'ast>(source: &str, arena: &'ast Bump) -> ScanResult<'ast> {
    let mut lexer = Lexer::new(source, arena);
    let tokens: Vec<Token<'ast>> = lexer.by_ref().collect();
    let errors = lexer.take_errors();
    debug!(
        "scanned {} tokens from {} bytes ({} lexical errors)",
        tokens.len(),
        source.len(),
        errors.len()
    );
    ScanResult { tokens, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> (Vec<(TokenKind, String)>, Vec<LexError>) {
        let arena = Bump::new();
        let result = scan(source, &arena);
        let tokens = result
            .tokens
            .iter()
            .map(|t| (t.kind, t.lexeme.to_string()))
            .collect();
        (tokens, result.errors.into_iter().collect())
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn every_kind_round_trips_alone() {
        use TokenKind::*;
        let cases = [
            ("return", Return),
            ("if", If),
            ("else", Else),
            ("while", While),
            ("for", For),
            ("counter_2", Identifier),
            ("42", IntLiteral),
            ("3.25", FloatLiteral),
            (".5", FloatLiteral),
            ("7.", FloatLiteral),
            ("\"hi there\"", StringLiteral),
            ("=", Equals),
            ("==", EqualsEquals),
            ("!=", BangEquals),
            ("<", LessThan),
            ("<=", LessThanEquals),
            (">", GreaterThan),
            (">=", GreaterThanEquals),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("/", Slash),
            ("^", Caret),
            ("%", Percent),
            ("(", LeftParen),
            (")", RightParen),
            ("{", LeftBrace),
            ("}", RightBrace),
            ("[", LeftBracket),
            ("]", RightBracket),
            (",", Comma),
            (";", Semicolon),
        ];

        for (source, kind) in cases {
            let (tokens, errors) = tokenize(source);
            assert!(errors.is_empty(), "{source}: {errors:?}");
            assert_eq!(tokens, vec![(kind, source.to_string())], "{source}");
        }
    }

    #[test]
    fn keyword_prefix_stays_identifier() {
        assert_eq!(kinds("ifx"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("returned while_"), vec![TokenKind::Identifier, TokenKind::Identifier]);
        assert_eq!(kinds("if("), vec![TokenKind::If, TokenKind::LeftParen]);
    }

    #[test]
    fn maximal_munch_operators() {
        use TokenKind::*;
        assert_eq!(kinds("a<=b"), vec![Identifier, LessThanEquals, Identifier]);
        assert_eq!(kinds("a===b"), vec![Identifier, EqualsEquals, Equals, Identifier]);
        assert_eq!(kinds("x>=-1"), vec![Identifier, GreaterThanEquals, Minus, IntLiteral]);
    }

    #[test]
    fn line_comment_runs_to_newline() {
        use TokenKind::*;
        assert_eq!(kinds("a / b // comment ; ;\nc"), vec![Identifier, Slash, Identifier, Identifier]);
        assert_eq!(kinds("// only a comment"), vec![]);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let arena = Bump::new();
        let result = scan("int x;\n  x = 10;", &arena);
        let spans: Vec<Span> = result.tokens.iter().map(|t| t.span).collect();
        assert_eq!(spans[0], Span::new(1, 1, 3));
        assert_eq!(spans[1], Span::new(1, 5, 1));
        assert_eq!(spans[3], Span::new(2, 3, 1));
        assert_eq!(spans[5], Span::new(2, 7, 2));
        assert_eq!(result.tokens[5].span.end().col, 9);
    }

    #[test]
    fn bang_without_equals_is_an_error() {
        let (tokens, errors) = tokenize("a ! b");
        assert_eq!(tokens.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "expected '=' after '!'");
        assert_eq!(errors[0].span(), Span::new(1, 3, 1));
    }

    #[test]
    fn second_decimal_point_is_an_error() {
        let (tokens, errors) = tokenize("1.2.3 ;");
        assert_eq!(tokens, vec![(TokenKind::Semicolon, ";".to_string())]);
        assert_eq!(
            errors[0].to_string(),
            "Float literals must only contain one decimal point"
        );
        assert_eq!(errors[0].span(), Span::new(1, 1, 5));
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let (tokens, errors) = tokenize("\"abc\nx");
        assert_eq!(tokens, vec![(TokenKind::Identifier, "x".to_string())]);
        assert_eq!(errors[0], LexError::UnterminatedString { span: Span::new(1, 1, 4) });
    }

    #[test]
    fn invalid_characters_are_all_reported() {
        let (tokens, errors) = tokenize("a @ b $ _c .");
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            [
                "Invalid character '@'",
                "Invalid character '$'",
                "Invalid character '_'",
                "Invalid character '.'",
            ]
        );
        let kinds: Vec<TokenKind> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier; 3]);
    }

    #[test]
    fn scan_result_flags_errors() {
        let arena = Bump::new();
        let ok = scan("int main() { return 0; }", &arena);
        assert!(!ok.had_error());
        assert_eq!(ok.into_result().map(|t| t.len()), Ok(9));

        let bad = scan("int # x", &arena);
        assert!(bad.had_error());
        assert!(bad.into_result().is_err());
    }
}

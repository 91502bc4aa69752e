//! Expression parsing.
//!
//! One function per precedence level, lowest first:
//!
//! ```text
//! assignment     := equality ('=' assignment)?
//! equality       := comparison (('==' | '!=') comparison)?
//! comparison     := additive (('<' | '<=' | '>' | '>=') additive)?
//! additive       := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/' | '%') unary)*
//! unary          := ('+' | '-') unary | exponent
//! exponent       := atom ('^' exponent)?
//! ```

use microc_core::{ParseError, Span};

use crate::ast::parser::{Parser, describe};
use crate::ast::{
    ArrayRefExpr, BinaryOp, BinaryOpExpr, Expr, FloatLiteral, FuncCallExpr, Ident, IntLiteral,
    StringLiteral, UnaryOp, UnaryOpExpr, VarRefExpr,
};
use crate::lexer::TokenKind;

impl<'ast> Parser<'ast> {
    /// Parse an expression.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_expr(&mut self) -> Result<Expr<'ast>, ParseError> {
        self.parse_assignment()
    }

    /// Right-associative: `a = b = c` is `a = (b = c)`.
    fn parse_assignment(&mut self) -> Result<Expr<'ast>, ParseError> {
        let lhs = self.parse_equality()?;

        if let Some(op) = self.eat(TokenKind::Equals) {
            let rhs = self.parse_assignment()?;
            return Ok(self.binary(lhs, BinaryOp::Assign, op.span, rhs));
        }

        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr<'ast>, ParseError> {
        let lhs = self.parse_comparison()?;
        self.parse_non_associative(lhs, BinaryOp::is_equality, Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr<'ast>, ParseError> {
        let lhs = self.parse_additive()?;
        self.parse_non_associative(lhs, BinaryOp::is_relational, Self::parse_additive)
    }

    /// At most one operator of the level; a second one is an error.
    fn parse_non_associative(
        &mut self,
        lhs: Expr<'ast>,
        accepts: fn(BinaryOp) -> bool,
        operand: fn(&mut Self) -> Result<Expr<'ast>, ParseError>,
    ) -> Result<Expr<'ast>, ParseError> {
        let Some((op, op_span)) = self.eat_operator(accepts) else {
            return Ok(lhs);
        };

        let rhs = operand(self)?;

        if self.eat_operator(accepts).is_some() {
            let token = self.buffer[self.position - 1];
            return Err(ParseError::non_associative(token.span, token.lexeme));
        }

        Ok(self.binary(lhs, op, op_span, rhs))
    }

    fn parse_additive(&mut self) -> Result<Expr<'ast>, ParseError> {
        let mut expr = self.parse_multiplicative()?;

        while let Some((op, op_span)) =
            self.eat_operator(|op| matches!(op, BinaryOp::Add | BinaryOp::Sub))
        {
            let rhs = self.parse_multiplicative()?;
            expr = self.binary(expr, op, op_span, rhs);
        }

        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr<'ast>, ParseError> {
        let mut expr = self.parse_unary()?;

        while let Some((op, op_span)) =
            self.eat_operator(|op| matches!(op, BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod))
        {
            let rhs = self.parse_unary()?;
            expr = self.binary(expr, op, op_span, rhs);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr<'ast>, ParseError> {
        let Some(op) = UnaryOp::from_token(self.peek().kind) else {
            return self.parse_exponent();
        };

        let op_token = self.advance();
        let operand = self.parse_unary()?;
        let node = UnaryOpExpr {
            id: self.next_id(),
            op,
            op_span: op_token.span,
            operand,
            span: op_token.span.merge(operand.span()),
        };
        Ok(Expr::Unary(self.alloc(node)))
    }

    /// Right-associative: `2 ^ 3 ^ 2` is `2 ^ (3 ^ 2)`.
    fn parse_exponent(&mut self) -> Result<Expr<'ast>, ParseError> {
        let lhs = self.parse_atom()?;

        if let Some(op) = self.eat(TokenKind::Caret) {
            let rhs = self.parse_exponent()?;
            return Ok(self.binary(lhs, BinaryOp::Pow, op.span, rhs));
        }

        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expr<'ast>, ParseError> {
        let token = self.peek();

        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = token
                    .lexeme
                    .parse::<i64>()
                    .map_err(|_| ParseError::integer_out_of_range(token.span, token.lexeme))?;
                Ok(Expr::IntLiteral(IntLiteral {
                    id: self.next_id(),
                    value,
                    span: token.span,
                }))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| ParseError::invalid_float(token.span, token.lexeme))?;
                Ok(Expr::FloatLiteral(FloatLiteral {
                    id: self.next_id(),
                    value,
                    span: token.span,
                }))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let lexeme = token.lexeme;
                let value = lexeme
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(lexeme);
                Ok(Expr::StringLiteral(StringLiteral {
                    id: self.next_id(),
                    value,
                    span: token.span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::LeftParen => {
                self.parse_call()
            }
            TokenKind::Identifier => self.parse_reference(),
            TokenKind::Eof => Err(self.error_expected("expression")),
            _ => Err(ParseError::unexpected_token(
                token.span,
                &describe(&token),
                token.lexeme,
            )),
        }
    }

    /// `name(arg, ...)`
    fn parse_call(&mut self) -> Result<Expr<'ast>, ParseError> {
        let name = self.parse_ident()?;
        self.expect(TokenKind::LeftParen)?;

        let mut args = self.list();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen)?;

        let node = FuncCallExpr {
            id: self.next_id(),
            name,
            args: args.into_bump_slice(),
            span: name.span.merge(close.span),
        };
        Ok(Expr::FuncCall(self.alloc(node)))
    }

    /// `name` or `name[index]`
    fn parse_reference(&mut self) -> Result<Expr<'ast>, ParseError> {
        let name = self.parse_ident()?;

        if self.eat(TokenKind::LeftBracket).is_some() {
            let index = self.parse_expr()?;
            let close = self.expect(TokenKind::RightBracket)?;
            let node = ArrayRefExpr {
                id: self.next_id(),
                name,
                index,
                span: name.span.merge(close.span),
            };
            return Ok(Expr::ArrayRef(self.alloc(node)));
        }

        Ok(Expr::VarRef(VarRefExpr {
            id: self.next_id(),
            name,
            span: name.span,
        }))
    }

    /// Consume an identifier token as an [`Ident`].
    pub(super) fn parse_ident(&mut self) -> Result<Ident<'ast>, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Ident::new(token.lexeme, token.span))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Consume the current token if it is a binary operator accepted by
    /// `accepts`.
    fn eat_operator(&mut self, accepts: impl Fn(BinaryOp) -> bool) -> Option<(BinaryOp, Span)> {
        let op = BinaryOp::from_token(self.peek().kind).filter(|op| accepts(*op))?;
        Some((op, self.advance().span))
    }

    fn binary(&mut self, lhs: Expr<'ast>, op: BinaryOp, op_span: Span, rhs: Expr<'ast>) -> Expr<'ast> {
        let node = BinaryOpExpr {
            id: self.next_id(),
            lhs,
            op,
            op_span,
            rhs,
            span: lhs.span().merge(rhs.span()),
        };
        Expr::Binary(self.alloc(node))
    }
}

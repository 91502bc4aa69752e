//! Statement parsing.
//!
//! `for` loops are lowered here, so later phases only ever see `while`:
//!
//! ```text
//! for (init; cond; inc) body   =>   { init; while (cond) { { body } inc; } }
//! ```

use microc_core::{ParseError, Span};

use crate::ast::parser::Parser;
use crate::ast::{
    ArrayDecl, CompoundStmt, EmptyStmt, Expr, ExprStmt, IfStmt, IntLiteral, ReturnStmt, Stmt,
    VarDecl, WhileStmt,
};
use crate::lexer::TokenKind;

impl<'ast> Parser<'ast> {
    /// Parse a statement.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_statement(&mut self) -> Result<Stmt<'ast>, ParseError> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LeftBrace => Ok(Stmt::Compound(self.parse_compound()?)),
            TokenKind::Semicolon => {
                let token = self.advance();
                Ok(Stmt::Empty(EmptyStmt {
                    id: self.next_id(),
                    span: token.span,
                }))
            }
            // `type name ...` is a declaration; anything else starting with a
            // name is an expression.
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::Identifier => {
                self.parse_declaration()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// `{ stmt* }`
    pub(super) fn parse_compound(&mut self) -> Result<CompoundStmt<'ast>, ParseError> {
        let open = self.expect(TokenKind::LeftBrace)?;

        let mut body = self.list();
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            body.push(self.parse_statement()?);
        }
        let close = self.expect(TokenKind::RightBrace)?;

        Ok(CompoundStmt {
            id: self.next_id(),
            body: body.into_bump_slice(),
            span: open.span.merge(close.span),
        })
    }

    /// `type name;`, `type name = expr;` or `type name[INT];`
    fn parse_declaration(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let ty = self.parse_ident()?;
        let name = self.parse_ident()?;

        if self.eat(TokenKind::LeftBracket).is_some() {
            let size_token = self.expect(TokenKind::IntLiteral)?;
            let value = size_token
                .lexeme
                .parse::<i64>()
                .map_err(|_| ParseError::integer_out_of_range(size_token.span, size_token.lexeme))?;
            let size = IntLiteral {
                id: self.next_id(),
                value,
                span: size_token.span,
            };
            self.expect(TokenKind::RightBracket)?;
            let semi = self.expect(TokenKind::Semicolon)?;

            return Ok(Stmt::ArrayDecl(ArrayDecl {
                id: self.next_id(),
                ty,
                name,
                size,
                span: ty.span.merge(semi.span),
            }));
        }

        let init = match self.eat(TokenKind::Equals) {
            Some(_) => Some(self.parse_expr()?),
            None => None,
        };
        let semi = self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::VarDecl(VarDecl {
            id: self.next_id(),
            ty,
            name,
            init,
            span: ty.span.merge(semi.span),
        }))
    }

    /// `expr ;`
    fn parse_expr_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let expr = self.parse_expr()?;
        let semi = self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Expr(ExprStmt {
            id: self.next_id(),
            expr,
            span: expr.span().merge(semi.span),
        }))
    }

    /// `if ( expr ) stmt (else stmt)?`
    fn parse_if(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_statement()?;

        let else_branch = match self.eat(TokenKind::Else) {
            Some(_) => Some(self.parse_statement()?),
            None => None,
        };

        let end = else_branch.as_ref().unwrap_or(&then_branch).span();
        let node = IfStmt {
            id: self.next_id(),
            condition,
            then_branch,
            else_branch,
            span: keyword.span.merge(end),
        };
        Ok(Stmt::If(self.alloc(node)))
    }

    /// `while ( expr ) stmt`
    fn parse_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_statement()?;

        let node = WhileStmt {
            id: self.next_id(),
            condition,
            body,
            span: keyword.span.merge(body.span()),
        };
        Ok(Stmt::While(self.alloc(node)))
    }

    /// `for ( init cond ; inc ) body`, lowered to a while loop.
    fn parse_for(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LeftParen)?;

        // The init statement carries its own `;`.
        let init = self.parse_for_init()?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        let increment = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_statement()?;

        let span = keyword.span.merge(body.span());
        Ok(self.lower_for(init, condition, increment, body, span))
    }

    /// `;`, a declaration, or an expression statement.
    fn parse_for_init(&mut self) -> Result<Stmt<'ast>, ParseError> {
        match self.peek().kind {
            TokenKind::Semicolon => {
                let token = self.advance();
                Ok(Stmt::Empty(EmptyStmt {
                    id: self.next_id(),
                    span: token.span,
                }))
            }
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::Identifier => {
                self.parse_declaration()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// Build `{ init; while (cond) { { body } inc; } }`.
    fn lower_for(
        &mut self,
        init: Stmt<'ast>,
        condition: Expr<'ast>,
        increment: Expr<'ast>,
        body: Stmt<'ast>,
        span: Span,
    ) -> Stmt<'ast> {
        let scoped_body = CompoundStmt {
            id: self.next_id(),
            body: self.arena.alloc_slice_copy(&[body]),
            span: body.span(),
        };
        let step = ExprStmt {
            id: self.next_id(),
            expr: increment,
            span: increment.span(),
        };
        let loop_body = CompoundStmt {
            id: self.next_id(),
            body: self
                .arena
                .alloc_slice_copy(&[Stmt::Compound(scoped_body), Stmt::Expr(step)]),
            span,
        };
        let while_stmt = WhileStmt {
            id: self.next_id(),
            condition,
            body: Stmt::Compound(loop_body),
            span,
        };
        let while_stmt = Stmt::While(self.alloc(while_stmt));

        Stmt::Compound(CompoundStmt {
            id: self.next_id(),
            body: self.arena.alloc_slice_copy(&[init, while_stmt]),
            span,
        })
    }

    /// `return expr? ;`
    fn parse_return(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let keyword = self.expect(TokenKind::Return)?;

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let semi = self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Return(ReturnStmt {
            id: self.next_id(),
            value,
            span: keyword.span.merge(semi.span),
        }))
    }

    /// `( expr )`
    fn parse_condition(&mut self) -> Result<Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;
        Ok(condition)
    }
}

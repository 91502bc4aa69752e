//! Top-level parsing: the program and its function declarations.

use log::debug;
use microc_core::{ParseError, Span};

use crate::ast::parser::Parser;
use crate::ast::{FuncDecl, Program, VarDecl};
use crate::lexer::TokenKind;

impl<'ast> Parser<'ast> {
    /// `program := funcDecl*`
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_program(&mut self) -> Result<Program<'ast>, ParseError> {
        let start = self.peek().span;

        let mut functions = self.list();
        while !self.is_eof() {
            functions.push(self.parse_function()?);
        }
        let functions = functions.into_bump_slice();

        let span = functions
            .last()
            .map(|last| start.merge(last.span))
            .unwrap_or(start);
        let program = Program {
            id: self.next_id(),
            functions,
            span,
        };

        debug!(
            "parsed {} functions ({} nodes)",
            program.functions.len(),
            self.node_count()
        );
        Ok(program)
    }

    /// `type name ( params ) compound`
    fn parse_function(&mut self) -> Result<FuncDecl<'ast>, ParseError> {
        let return_type = self.parse_ident()?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LeftParen)?;
        let mut params = self.list();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_compound()?;

        Ok(FuncDecl {
            id: self.next_id(),
            return_type,
            name,
            params: params.into_bump_slice(),
            body,
            span: return_type.span.merge(body.span),
        })
    }

    /// `type name`
    fn parse_param(&mut self) -> Result<VarDecl<'ast>, ParseError> {
        let ty = self.parse_ident()?;
        let name = self.parse_ident()?;

        Ok(VarDecl {
            id: self.next_id(),
            ty,
            name,
            init: None,
            span: Span::merge(ty.span, name.span),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Parser, Stmt};
    use bumpalo::Bump;
    use microc_core::{CompileError, ParseErrorKind};

    #[test]
    fn parses_functions_with_parameters() {
        let arena = Bump::new();
        let source = "int add(int a, int b) { return a + b; }\nvoid main() { print(add(1, 2)); }";
        let program = Parser::parse(source, &arena).unwrap();

        assert_eq!(program.functions.len(), 2);
        let add = &program.functions[0];
        assert_eq!(add.name.name, "add");
        assert_eq!(add.return_type.name, "int");
        let params: Vec<(&str, &str)> = add.params.iter().map(|p| (p.ty.name, p.name.name)).collect();
        assert_eq!(params, [("int", "a"), ("int", "b")]);
        assert!(matches!(add.body.body, [Stmt::Return(_)]));

        assert!(program.functions[1].params.is_empty());
    }

    #[test]
    fn empty_program() {
        let arena = Bump::new();
        let program = Parser::parse("  // nothing here\n", &arena).unwrap();
        assert!(program.functions.is_empty());
    }

    #[test]
    fn program_id_is_last() {
        let arena = Bump::new();
        let program = Parser::parse("int main() { return 0; }", &arena).unwrap();
        assert!(program.functions[0].id < program.id);
        assert!(program.functions[0].body.id < program.functions[0].id);
    }

    #[test]
    fn repeated_parses_number_nodes_identically() {
        let source = "int main() { int x = 1; return x; }";
        let first = Bump::new();
        let second = Bump::new();
        let a = Parser::parse(source, &first).unwrap();
        let b = Parser::parse(source, &second).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.functions[0].body.body[1].id(), b.functions[0].body.body[1].id());
    }

    #[test]
    fn unterminated_body_reports_end_of_file() {
        let arena = Bump::new();
        match Parser::parse("int main() { return 0;", &arena) {
            Err(CompileError::Parse(err)) => {
                assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
                assert_eq!(err.message, "Expected '}', but found end of file");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn lexical_errors_prevent_parsing() {
        let arena = Bump::new();
        match Parser::parse("int main() { return 1 ! 2; @ }", &arena) {
            Err(CompileError::Lex(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parameter_list_errors() {
        let arena = Bump::new();
        let err = Parser::parse("int f(int) { }", &arena).unwrap_err();
        assert_eq!(err.to_string(), "Expected identifier, but found ')'");
        let err = Parser::parse("int f(int a,) { }", &arena).unwrap_err();
        assert_eq!(err.to_string(), "Expected identifier, but found ')'");
    }
}

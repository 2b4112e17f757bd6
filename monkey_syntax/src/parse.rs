use std::{iter::Peekable, slice::Iter};

use log::trace;

use crate::{
    ast::{Block, Expr, InfixOp, Literal, PrefixOp, Program, Stmt},
    error::{Error, ErrorMsg},
    stack::ensure_sufficient_stack,
    token::{Token, TokenKind},
};

/// Binding strength of an operator, from loosest to tightest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    /// The precedence of a token in infix position. Tokens
    /// without an infix rule bind with the lowest precedence,
    /// which ends the current expression.
    pub fn from_token(t: TokenKind) -> Self {
        match t {
            TokenKind::EQUAL_EQUAL | TokenKind::BANG_EQUAL => Self::Equals,
            TokenKind::LESS | TokenKind::GREATER => Self::LessGreater,
            TokenKind::PLUS | TokenKind::MINUS => Self::Sum,
            TokenKind::STAR | TokenKind::SLASH => Self::Product,
            TokenKind::LPAREN | TokenKind::LBRACKET => Self::Call,
            _ => Self::Lowest,
        }
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
    errors: Vec<Error>,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
            errors: Vec::default(),
        }
    }

    /// Parse the whole stream. Parsing continues past a syntax
    /// error from the next statement boundary, so the returned
    /// program holds every statement that parsed successfully.
    pub fn parse(mut self) -> (Program, Vec<Error>) {
        let mut stmts: Vec<Stmt> = Vec::default();
        while self.stream.peek().is_some() {
            match self.parse_stmt() {
                Ok(stmt) => {
                    trace!("Parsed statement {stmt}");
                    stmts.push(stmt);
                }
                Err(e) => {
                    self.errors.push(e);
                    self.sync();
                }
            }
        }

        (Program { stmts }, self.errors)
    }

    pub fn parse_all(self) -> Result<Program, Vec<Error>> {
        let (program, errors) = self.parse();
        errors.is_empty().then_some(program).ok_or(errors)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        let stmt = match self.stream.peek() {
            Some(&t) => match t.kind {
                TokenKind::LET => self.parse_let_stmt(),
                TokenKind::RETURN => self.parse_return_stmt(),
                _ => self.parse_expr(Precedence::Lowest).map(Stmt::Expr),
            }?,
            None => return Err(Self::eof_error(ErrorMsg::EndOfStream)),
        };
        // The terminating semicolon is optional
        self.advance_if(|t| t.kind == TokenKind::SEMICOLON);
        Ok(stmt)
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `let` keyword
        self.advance();
        let ident = self.advance_or_err(TokenKind::IDENT)?.lexeme.clone();
        self.advance_or_err(TokenKind::EQUAL)?;
        let value = self.parse_expr(Precedence::Lowest)?;

        Ok(Stmt::Let { ident, value })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `return` keyword
        self.advance();
        let bare = self
            .stream
            .peek()
            .map_or(true, |t| matches!(t.kind, TokenKind::SEMICOLON | TokenKind::RBRACE));
        if bare {
            return Ok(Stmt::Return(None));
        }

        Ok(Stmt::Return(Some(self.parse_expr(Precedence::Lowest)?)))
    }

    fn parse_block(&mut self) -> Result<Block, Error> {
        self.advance_or_err(TokenKind::LBRACE)?;
        let mut stmts = Vec::default();
        while let Some(&t) = self.stream.peek() {
            if t.kind == TokenKind::RBRACE {
                break;
            }
            // Statements inside a block recover on their own, so an
            // error never leaks the rest of the body to the top level
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.sync();
                }
            }
        }
        self.advance_or_err(TokenKind::RBRACE)?;

        Ok(Block { stmts })
    }

    fn parse_expr(&mut self, precedence: Precedence) -> Result<Expr, Error> {
        ensure_sufficient_stack(|| -> Result<Expr, Error> {
            let mut lhs = self.parse_prefix()?;
            while let Some(&t) = self.stream.peek() {
                if precedence >= Precedence::from_token(t.kind) {
                    break;
                }
                lhs = self.parse_infix(lhs)?;
            }

            Ok(lhs)
        })
    }

    fn parse_prefix(&mut self) -> Result<Expr, Error> {
        let Some(t) = self.advance() else {
            return Err(Self::eof_error(ErrorMsg::EndOfStream));
        };
        let line = t.line + 1;
        let expr = match t.kind {
            TokenKind::IDENT => Expr::Ident {
                name: t.lexeme.clone(),
                line,
            },
            TokenKind::INT => Expr::Literal(Literal::Integer(
                t.lexeme
                    .parse()
                    .map_err(|_| Self::error(t, ErrorMsg::InvalidInteger))?,
            )),
            TokenKind::STRING => Expr::Literal(Literal::Str(t.lexeme.clone())),
            TokenKind::TRUE => Expr::Literal(Literal::Boolean(true)),
            TokenKind::FALSE => Expr::Literal(Literal::Boolean(false)),
            TokenKind::BANG | TokenKind::MINUS => Expr::Prefix {
                // Infallible unwrap as we are ensuring the right token kind above
                op: PrefixOp::from_token(t.kind)
                    .expect("non-prefix operators cannot be present here"),
                expr: Box::new(self.parse_expr(Precedence::Prefix)?),
                line,
            },
            TokenKind::LPAREN => {
                // Groups only steer precedence and leave no node behind
                let expr = self.parse_expr(Precedence::Lowest)?;
                self.advance_or_err(TokenKind::RPAREN)?;
                expr
            }
            TokenKind::IF => self.parse_if_expr()?,
            TokenKind::FN => self.parse_function()?,
            TokenKind::LBRACKET => Expr::Array(self.parse_expr_list(TokenKind::RBRACKET)?),
            TokenKind::LBRACE => self.parse_hash(line)?,
            _ => return Err(Self::error(t, ErrorMsg::NoPrefixRule)),
        };

        Ok(expr)
    }

    fn parse_infix(&mut self, lhs: Expr) -> Result<Expr, Error> {
        let Some(t) = self.advance() else {
            return Err(Self::eof_error(ErrorMsg::EndOfStream));
        };
        let line = t.line + 1;
        let expr = match t.kind {
            TokenKind::LPAREN => Expr::Call {
                func: Box::new(lhs),
                args: self.parse_expr_list(TokenKind::RPAREN)?,
                line,
            },
            TokenKind::LBRACKET => {
                let index = self.parse_expr(Precedence::Lowest)?;
                self.advance_or_err(TokenKind::RBRACKET)?;
                Expr::Index {
                    expr: Box::new(lhs),
                    index: Box::new(index),
                    line,
                }
            }
            _ => {
                // Infallible unwrap as only tokens with an infix
                // precedence can make it to this function
                let op = InfixOp::from_token(t.kind)
                    .expect("non-infix operators cannot be present here");
                // Parsing the right operand at the operator's own
                // precedence makes the operators left-associative
                let rhs = self.parse_expr(Precedence::from_token(t.kind))?;
                Expr::Infix {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                    line,
                }
            }
        };

        Ok(expr)
    }

    fn parse_if_expr(&mut self) -> Result<Expr, Error> {
        self.advance_or_err(TokenKind::LPAREN)?;
        let condition = self.parse_expr(Precedence::Lowest)?;
        self.advance_or_err(TokenKind::RPAREN)?;
        let consequence = self.parse_block()?;
        let alternative = if self.advance_if(|t| t.kind == TokenKind::ELSE).is_some() {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function(&mut self) -> Result<Expr, Error> {
        self.advance_or_err(TokenKind::LPAREN)?;
        let mut params = vec![];
        if self.advance_if(|t| t.kind == TokenKind::RPAREN).is_none() {
            loop {
                params.push(self.advance_or_err(TokenKind::IDENT)?.lexeme.clone());
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                    break;
                }
            }
            self.advance_or_err(TokenKind::RPAREN)?;
        }
        let body = self.parse_block()?;

        Ok(Expr::Function { params, body })
    }

    /// Parse comma separated expressions up to the closing `end`
    /// token. The opening delimiter must already be consumed.
    fn parse_expr_list(&mut self, end: TokenKind) -> Result<Vec<Expr>, Error> {
        let mut exprs = vec![];
        if self.advance_if(|t| t.kind == end).is_some() {
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr(Precedence::Lowest)?);
            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                break;
            }
        }
        self.advance_or_err(end)?;

        Ok(exprs)
    }

    fn parse_hash(&mut self, line: usize) -> Result<Expr, Error> {
        let mut pairs = vec![];
        while self.advance_if(|t| t.kind == TokenKind::RBRACE).is_none() {
            let key = self.parse_expr(Precedence::Lowest)?;
            self.advance_or_err(TokenKind::COLON)?;
            let value = self.parse_expr(Precedence::Lowest)?;
            pairs.push((key, value));
            // A pair is followed either by a comma or the closing brace
            if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                self.advance_or_err(TokenKind::RBRACE)?;
                break;
            }
        }

        Ok(Expr::Hash { pairs, line })
    }

    fn advance(&mut self) -> Option<&'a Token> {
        self.stream.next()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind) -> Result<&'a Token, Error> {
        match self.stream.peek() {
            Some(&t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            Some(&t) => Err(format!(
                "Parse error at line {}: {} {}, found {}",
                t.line + 1,
                ErrorMsg::ExpectedToken,
                kind,
                t
            )),
            None => Err(format!(
                "Parse error: {} {}, found {}",
                ErrorMsg::ExpectedToken,
                kind,
                ErrorMsg::EndOfStream
            )),
        }
    }

    /// Skip ahead to the next statement boundary of the current
    /// block: right after a semicolon, before a statement keyword,
    /// or before the brace closing the block. Nested braces are
    /// skipped along with everything inside them.
    fn sync(&mut self) {
        let mut depth = 0usize;
        while let Some(&t) = self.stream.peek() {
            match t.kind {
                TokenKind::RBRACE if depth == 0 => return,
                TokenKind::LET | TokenKind::RETURN if depth == 0 => return,
                TokenKind::SEMICOLON if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBRACE => depth += 1,
                TokenKind::RBRACE => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    fn error(token: &Token, msg: ErrorMsg) -> Error {
        format!("Parse error at line {}: {} {}", token.line + 1, msg, token)
    }

    fn eof_error(msg: ErrorMsg) -> Error {
        format!("Parse error: {}", msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;
    use pretty_assertions::assert_eq;

    fn parse_test(input: &str, expected: Program) {
        let tokens = Lexer::new(input).lex_all_sanitised().unwrap();
        let program = Parser::new(&tokens).parse_all().unwrap();
        assert_eq!(program, expected);
    }

    fn parse_err_test(input: &str, expected: &[&str]) {
        let tokens = Lexer::new(input).lex_all_sanitised().unwrap();
        let (_, errors) = Parser::new(&tokens).parse();
        assert_eq!(errors, expected);
    }

    /// Parse the input and render it back to source text
    fn render(input: &str) -> String {
        let tokens = Lexer::new(input).lex_all_sanitised().unwrap();
        Parser::new(&tokens).parse_all().unwrap().to_string()
    }

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident {
            name: name.to_string(),
            line: 1,
        })
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Integer(n))
    }

    #[test]
    fn let_stmts() {
        parse_test(
            "let x = 5; let y = true; let foobar = \"bar\";",
            Program {
                stmts: vec![
                    Stmt::Let {
                        ident: "x".to_string(),
                        value: int(5),
                    },
                    Stmt::Let {
                        ident: "y".to_string(),
                        value: Expr::Literal(Literal::Boolean(true)),
                    },
                    Stmt::Let {
                        ident: "foobar".to_string(),
                        value: Expr::Literal(Literal::Str("bar".to_string())),
                    },
                ],
            },
        );
    }

    #[test]
    fn return_stmts() {
        parse_test(
            "return 5; return; return x",
            Program {
                stmts: vec![
                    Stmt::Return(Some(int(5))),
                    Stmt::Return(None),
                    Stmt::Return(Some(*ident("x"))),
                ],
            },
        );
    }

    #[test]
    fn prefix_binds_tighter_than_product() {
        parse_test(
            "-a * b",
            Program {
                stmts: vec![Stmt::Expr(Expr::Infix {
                    lhs: Box::new(Expr::Prefix {
                        op: PrefixOp::Minus,
                        expr: ident("a"),
                        line: 1,
                    }),
                    op: InfixOp::Star,
                    rhs: ident("b"),
                    line: 1,
                })],
            },
        );
    }

    #[test]
    fn product_binds_tighter_than_sum() {
        parse_test(
            "a + b * c",
            Program {
                stmts: vec![Stmt::Expr(Expr::Infix {
                    lhs: ident("a"),
                    op: InfixOp::Plus,
                    rhs: Box::new(Expr::Infix {
                        lhs: ident("b"),
                        op: InfixOp::Star,
                        rhs: ident("c"),
                        line: 1,
                    }),
                    line: 1,
                })],
            },
        );
    }

    #[test]
    fn precedence() {
        let cases = [
            ("a - b - c", "((a - b) - c);"),
            ("!-a", "(!(-a));"),
            ("a * b / c", "((a * b) / c);"),
            ("a + b / c", "(a + (b / c));"),
            ("3 + 4; -5 * 5", "(3 + 4); ((-5) * 5);"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4));"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)));"),
            ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4);"),
            ("-(5 + 5)", "(-(5 + 5));"),
            ("!(true == true)", "(!(true == true));"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d);"),
            (
                "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
                "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)));",
            ),
            ("a * [1, 2, 3, 4][b * c] * d", "((a * ([1, 2, 3, 4][(b * c)])) * d);"),
            ("-a[0]", "(-(a[0]));"),
            ("f(x)(y)[0]", "(f(x)(y)[0]);"),
        ];
        for (input, expected) in cases {
            assert_eq!(render(input), expected, "input: {input}");
        }
    }

    #[test]
    fn if_expr() {
        parse_test(
            "if (x < y) { x } else { y; }",
            Program {
                stmts: vec![Stmt::Expr(Expr::If {
                    condition: Box::new(Expr::Infix {
                        lhs: ident("x"),
                        op: InfixOp::Less,
                        rhs: ident("y"),
                        line: 1,
                    }),
                    consequence: Block {
                        stmts: vec![Stmt::Expr(*ident("x"))],
                    },
                    alternative: Some(Block {
                        stmts: vec![Stmt::Expr(*ident("y"))],
                    }),
                })],
            },
        );
    }

    #[test]
    fn function_literal() {
        parse_test(
            "fn(x, y) { return x + y; }; fn() {}",
            Program {
                stmts: vec![
                    Stmt::Expr(Expr::Function {
                        params: vec!["x".to_string(), "y".to_string()],
                        body: Block {
                            stmts: vec![Stmt::Return(Some(Expr::Infix {
                                lhs: ident("x"),
                                op: InfixOp::Plus,
                                rhs: ident("y"),
                                line: 1,
                            }))],
                        },
                    }),
                    Stmt::Expr(Expr::Function {
                        params: vec![],
                        body: Block::default(),
                    }),
                ],
            },
        );
    }

    #[test]
    fn call_expr() {
        parse_test(
            "add(1, 2 * 3)",
            Program {
                stmts: vec![Stmt::Expr(Expr::Call {
                    func: ident("add"),
                    args: vec![
                        int(1),
                        Expr::Infix {
                            lhs: Box::new(int(2)),
                            op: InfixOp::Star,
                            rhs: Box::new(int(3)),
                            line: 1,
                        },
                    ],
                    line: 1,
                })],
            },
        );
    }

    #[test]
    fn array_and_index() {
        parse_test(
            "[1, \"two\"][0]; []",
            Program {
                stmts: vec![
                    Stmt::Expr(Expr::Index {
                        expr: Box::new(Expr::Array(vec![
                            int(1),
                            Expr::Literal(Literal::Str("two".to_string())),
                        ])),
                        index: Box::new(int(0)),
                        line: 1,
                    }),
                    Stmt::Expr(Expr::Array(vec![])),
                ],
            },
        );
    }

    #[test]
    fn hash_literal() {
        parse_test(
            "{\"one\": 1, true: 2 + 3}; {}",
            Program {
                stmts: vec![
                    Stmt::Expr(Expr::Hash {
                        pairs: vec![
                            (Expr::Literal(Literal::Str("one".to_string())), int(1)),
                            (
                                Expr::Literal(Literal::Boolean(true)),
                                Expr::Infix {
                                    lhs: Box::new(int(2)),
                                    op: InfixOp::Plus,
                                    rhs: Box::new(int(3)),
                                    line: 1,
                                },
                            ),
                        ],
                        line: 1,
                    }),
                    Stmt::Expr(Expr::Hash {
                        pairs: vec![],
                        line: 1,
                    }),
                ],
            },
        );
    }

    #[test]
    fn render_round_trip() {
        let inputs = [
            "let x = 5 * (3 + y);",
            "return;",
            "return -x;",
            "!true != false",
            "if (a > b) { a } else { let c = 1; c }",
            "if (a) { }",
            "let f = fn(a, b) { return a(b); };",
            "fn(x) { x }(5)",
            "[1, \"two\", [3]][1 + 1]",
            "{\"a\": 1, 2: fn() { 3 }, false: [4]}[\"a\"]",
            "len(\"hello\") + first([1, 2])",
        ];
        for input in inputs {
            let rendered = render(input);
            assert_eq!(render(&rendered), rendered, "input: {input}");
        }
    }

    #[test]
    fn render_then_reparse_is_structurally_equal() {
        let tokens = Lexer::new("let a = fn(x) { if (x) { [x, {1: x}] } }; a(-1)[0];")
            .lex_all_sanitised()
            .unwrap();
        let program = Parser::new(&tokens).parse_all().unwrap();
        let rendered = program.to_string();
        let tokens = Lexer::new(&rendered).lex_all_sanitised().unwrap();
        assert_eq!(Parser::new(&tokens).parse_all().unwrap(), program);
    }

    #[test]
    fn missing_closing_paren() {
        parse_err_test(
            "(1 + 2 * 3;",
            &["Parse error at line 1: expected ), found ;"],
        );
    }

    #[test]
    fn missing_closing_brace() {
        parse_err_test(
            "if (x) { a;",
            &["Parse error: expected }, found end of stream"],
        );
    }

    #[test]
    fn missing_let_ident() {
        parse_err_test("let = 5;", &["Parse error at line 1: expected identifier, found ="]);
    }

    #[test]
    fn no_prefix_rule() {
        parse_err_test(
            "1 + ;",
            &[format!("Parse error at line 1: {} ;", ErrorMsg::NoPrefixRule).as_str()],
        );
    }

    #[test]
    fn integer_overflow() {
        parse_err_test(
            "99999999999999999999",
            &[format!(
                "Parse error at line 1: {} 99999999999999999999",
                ErrorMsg::InvalidInteger
            )
            .as_str()],
        );
    }

    #[test]
    fn multiple_errors_are_reported() {
        let input = "let x 5;\nlet = 10;\nlet y = 3;\nlet 838383;";
        parse_err_test(
            input,
            &[
                "Parse error at line 1: expected =, found 5",
                "Parse error at line 2: expected identifier, found =",
                "Parse error at line 4: expected identifier, found 838383",
            ],
        );
    }

    #[test]
    fn recovery_keeps_valid_stmts() {
        let tokens = Lexer::new("let x 5; let y = 3; y")
            .lex_all_sanitised()
            .unwrap();
        let (program, errors) = Parser::new(&tokens).parse();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            program,
            Program {
                stmts: vec![
                    Stmt::Let {
                        ident: "y".to_string(),
                        value: int(3),
                    },
                    Stmt::Expr(*ident("y")),
                ],
            }
        );
    }

    #[test]
    fn error_in_block_recovers_inside_block() {
        let tokens = Lexer::new("let f = fn() { let = 1; 2 };\nlet y = 3;")
            .lex_all_sanitised()
            .unwrap();
        let (program, errors) = Parser::new(&tokens).parse();
        assert_eq!(
            errors,
            vec!["Parse error at line 1: expected identifier, found =".to_string()]
        );
        assert_eq!(program.to_string(), "let f = fn() { 2; }; let y = 3;");
    }

    #[test]
    fn errors_in_nested_blocks_are_reported_once_each() {
        let input = "if (a) {\n  fn() { let 1; }\n  let b 2;\n}\nlet c = 3;";
        parse_err_test(
            input,
            &[
                "Parse error at line 2: expected identifier, found 1",
                "Parse error at line 3: expected =, found 2",
            ],
        );
    }

    #[test]
    fn nodes_record_their_line() {
        let tokens = Lexer::new("let a = 1;\nlet b = -a;\nf(a);\n[b][0]")
            .lex_all_sanitised()
            .unwrap();
        let program = Parser::new(&tokens).parse_all().unwrap();
        let lines = program
            .stmts
            .iter()
            .map(|stmt| match stmt {
                Stmt::Let { value, .. } | Stmt::Expr(value) => value.line(),
                Stmt::Return(value) => value.as_ref().and_then(Expr::line),
            })
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![None, Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn deeply_nested_groups() {
        let depth = 5000;
        let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(render(&input), "1;");
    }
}

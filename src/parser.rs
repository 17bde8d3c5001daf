use super::{ast::*, error::*, scanner::*};
use std::rc::Rc;

const MAX_ARGUMENTS: usize = 255;

pub struct ParseResult {
    pub statements: Vec<Stmt>,
    pub errors: Vec<LoxError>,
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn parse(mut tokens: Vec<Token>) -> ParseResult {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let line = tokens.last().map(|token| token.line).unwrap_or(1);
            tokens.push(Token::new(TokenKind::Eof, "", None, line));
        }
        let mut parser = Self { tokens, current: 0 };
        let mut statements: Vec<Stmt> = vec![];
        let mut errors: Vec<LoxError> = vec![];
        while !parser.is_at_end() {
            match parser.declaration() {
                Ok(stmt) => {
                    statements.push(stmt);
                }
                Err(err) => {
                    errors.push(err);
                    parser.synchronize();
                }
            }
        }
        ParseResult { statements, errors }
    }

    /**
     * Statements
     */
    fn declaration(&mut self) -> LoxResult<Stmt> {
        if self.match_tokens(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.match_tokens(&[TokenKind::Fun]) {
            Ok(Stmt::Fun(self.function("function")?))
        } else if self.match_tokens(&[TokenKind::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> LoxResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "Expected class name")?
            .clone();
        let superclass = if self.match_tokens(&[TokenKind::Less]) {
            let supername = self
                .consume(TokenKind::Identifier, "Expected superclass name")?
                .clone();
            Some(Box::new(Expr::new(ExprKind::Identifier(supername))))
        } else {
            None
        };
        self.consume(TokenKind::LeftBrace, "Expected opening brace before class body")?;
        let mut methods = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }
        self.consume(TokenKind::RightBrace, "Expected closing brace after class body")?;
        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> LoxResult<Rc<FunctionDecl>> {
        let name = self
            .consume(TokenKind::Identifier, &format!("Expected {} name", kind))?
            .clone();
        self.consume(TokenKind::LeftParen, "Expected opening parenthesis")?;
        let params = self.fun_parameters()?;
        self.consume(TokenKind::RightParen, "Expected closing parenthesis")?;
        self.consume(TokenKind::LeftBrace, "Expected opening brace")?;
        let body = self.block_statements()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn fun_parameters(&mut self) -> LoxResult<Vec<Token>> {
        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.syntax_error(
                        "Exceeded maximum number of parameters",
                        self.peek().line,
                    ));
                }
                params.push(
                    self.consume(TokenKind::Identifier, "Expected parameter name")?
                        .clone(),
                );
                if !self.match_tokens(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        Ok(params)
    }

    fn var_declaration(&mut self) -> LoxResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "Expected identifier")?
            .clone();
        let initializer = if self.match_tokens(&[TokenKind::Equal]) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected a semicolon")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> LoxResult<Stmt> {
        if self.match_tokens(&[TokenKind::For]) {
            self.for_statement()
        } else if self.match_tokens(&[TokenKind::If]) {
            self.if_statement()
        } else if self.match_tokens(&[TokenKind::Print]) {
            self.print_statement()
        } else if self.match_tokens(&[TokenKind::Return]) {
            self.return_statement()
        } else if self.match_tokens(&[TokenKind::While]) {
            self.while_statement()
        } else if self.match_tokens(&[TokenKind::LeftBrace]) {
            Ok(Stmt::Block(self.block_statements()?))
        } else {
            self.expression_statement()
        }
    }

    fn expression_statement(&mut self) -> LoxResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected a semicolon")?;
        Ok(Stmt::Expr(Box::new(expr)))
    }

    // Desugars into a while loop wrapped in a block holding the initializer.
    fn for_statement(&mut self) -> LoxResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected opening parenthesis")?;
        let initializer = if self.match_tokens(&[TokenKind::Semicolon]) {
            None
        } else if self.match_tokens(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };
        let condition = if self.check(TokenKind::Semicolon) {
            let line = self.peek().line;
            Expr::new(ExprKind::Literal(Token::new(
                TokenKind::True,
                "true",
                Some(Literal::True),
                line,
            )))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expected semicolon")?;
        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expected closing parenthesis")?;
        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(increment))]);
        }
        body = Stmt::WhileLoop {
            condition: Box::new(condition),
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }
        Ok(body)
    }

    fn if_statement(&mut self) -> LoxResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected opening parenthesis")?;
        let condition = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expected closing parenthesis")?;
        let body = Box::new(self.statement()?);
        let else_branch = if self.match_tokens(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::IfElse {
            condition,
            body,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> LoxResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected a semicolon")?;
        Ok(Stmt::Print(Box::new(expr)))
    }

    fn return_statement(&mut self) -> LoxResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.consume(TokenKind::Semicolon, "Expected a semicolon")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> LoxResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected opening parenthesis")?;
        let condition = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expected closing parenthesis")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::WhileLoop { condition, body })
    }

    fn block_statements(&mut self) -> LoxResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenKind::RightBrace, "Expected closing brace")?;
        Ok(statements)
    }

    /**
     * Expressions
     */

    fn expression(&mut self) -> LoxResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> LoxResult<Expr> {
        let left = self.logic_or()?;
        if self.match_tokens(&[TokenKind::Equal]) {
            let line = self.previous().line;
            let value = Box::new(self.assignment()?);
            match left.kind {
                ExprKind::Identifier(name) => Ok(Expr::new(ExprKind::Assignment { name, value })),
                ExprKind::Get { object, name } => Ok(Expr::new(ExprKind::Set {
                    object,
                    name,
                    value,
                })),
                _ => Err(self.syntax_error("Invalid assignment target", line)),
            }
        } else {
            Ok(left)
        }
    }

    fn logic_or(&mut self) -> LoxResult<Expr> {
        let mut left = self.logic_and()?;
        while self.match_tokens(&[TokenKind::Or]) {
            let operator = self.previous().clone();
            let right = self.logic_and()?;
            left = Expr::new(ExprKind::Logical {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn logic_and(&mut self) -> LoxResult<Expr> {
        let mut left = self.equality()?;
        while self.match_tokens(&[TokenKind::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            left = Expr::new(ExprKind::Logical {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn equality(&mut self) -> LoxResult<Expr> {
        self.binary(
            &[TokenKind::BangEqual, TokenKind::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> LoxResult<Expr> {
        self.binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> LoxResult<Expr> {
        self.binary(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> LoxResult<Expr> {
        self.binary(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    // Left associative binary operators over the next precedence level.
    fn binary(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> LoxResult<Expr>,
    ) -> LoxResult<Expr> {
        let mut left = operand(self)?;
        while self.match_tokens(operators) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            left = Expr::new(ExprKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn unary(&mut self) -> LoxResult<Expr> {
        if self.match_tokens(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            Ok(Expr::new(ExprKind::Unary {
                operator,
                right: Box::new(right),
            }))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> LoxResult<Expr> {
        let mut left = self.primary()?;
        loop {
            if self.match_tokens(&[TokenKind::LeftParen]) {
                left = self.finish_call(left)?;
            } else if self.match_tokens(&[TokenKind::Dot]) {
                let name = self
                    .consume(TokenKind::Identifier, "Expected property name after \".\"")?
                    .clone();
                left = Expr::new(ExprKind::Get {
                    object: Box::new(left),
                    name,
                });
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn finish_call(&mut self, callee: Expr) -> LoxResult<Expr> {
        let mut arguments: Vec<Expr> = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.syntax_error(
                        "Exceeded maximum number of arguments",
                        self.peek().line,
                    ));
                }
                arguments.push(self.expression()?);
                if !self.match_tokens(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenKind::RightParen, "Expected closing parenthesis")?
            .clone();
        Ok(Expr::new(ExprKind::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> LoxResult<Expr> {
        if self.match_tokens(&[
            TokenKind::Number,
            TokenKind::String,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Nil,
        ]) {
            Ok(Expr::new(ExprKind::Literal(self.previous().clone())))
        } else if self.match_tokens(&[TokenKind::This]) {
            Ok(Expr::new(ExprKind::This(self.previous().clone())))
        } else if self.match_tokens(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expected \".\" after \"super\"")?;
            let method = self
                .consume(TokenKind::Identifier, "Expected superclass method name")?
                .clone();
            Ok(Expr::new(ExprKind::Super { keyword, method }))
        } else if self.match_tokens(&[TokenKind::Identifier]) {
            Ok(Expr::new(ExprKind::Identifier(self.previous().clone())))
        } else if self.match_tokens(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expected closing ')'")?;
            Ok(Expr::new(ExprKind::Grouping(Box::new(expr))))
        } else {
            Err(self.syntax_error("Expected expression", self.peek().line))
        }
    }

    /**
     * Utility methods
     */

    fn match_tokens(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds.iter() {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().kind == kind
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn syntax_error(&self, message: &str, line: u32) -> LoxError {
        LoxError::Syntax(SyntaxError::new(message.into(), line))
    }

    fn consume(&mut self, kind: TokenKind, err_msg: &str) -> LoxResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(err_msg, self.peek().line))
        }
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon
                || matches!(
                    self.peek().kind,
                    TokenKind::Class
                        | TokenKind::Fun
                        | TokenKind::Var
                        | TokenKind::For
                        | TokenKind::If
                        | TokenKind::While
                        | TokenKind::Print
                        | TokenKind::Return
                )
            {
                return;
            }
            self.advance();
        }
    }
}

/// Scan and parse a source string, keeping scan errors ahead of parse errors.
pub fn parse(source: &str) -> ParseResult {
    let ScanResult {
        tokens,
        errors: scan_errors,
    } = Scanner::scan(source);
    let ParseResult { statements, errors } = Parser::parse(tokens);
    let mut all_errors: Vec<LoxError> = scan_errors.into_iter().map(LoxError::Syntax).collect();
    all_errors.extend(errors);
    ParseResult {
        statements,
        errors: all_errors,
    }
}

use std::mem::discriminant;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    Branch, Conditional, Decl, Expr, FunctionCall, FunctionDecl, Param, Program, RangeLoop, Stmt,
    VarDecl,
};
use crate::lexer::{LexError, Lexer};
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Unexpected token '{found}', expected {expected}. {span}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        span: Span,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser with one token of lookahead in `current`, an
/// optional buffered second token, and a raw-character peek into the lexer
/// for identifier-led statement disambiguation.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peeked: None,
        })
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let program = self.program()?;
        self.validate(TokenKind::Eof)?;
        Ok(program)
    }

    /// program := declarations compound-statement
    fn program(&mut self) -> ParseResult<Program> {
        let mut declarations = Vec::new();

        if matches!(self.current.kind, TokenKind::Let) {
            self.advance()?;
            loop {
                let mut names = vec![self.expect_identifier()?];
                while matches!(self.current.kind, TokenKind::Comma) {
                    self.advance()?;
                    names.push(self.expect_identifier()?);
                }
                self.validate(TokenKind::Colon)?;
                let type_name = self.expect_identifier()?;
                for name in names {
                    declarations.push(Decl::Var(VarDecl {
                        name,
                        type_name: type_name.clone(),
                    }));
                }
                if matches!(self.current.kind, TokenKind::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
            self.validate(TokenKind::Semicolon)?;
        }

        while matches!(self.current.kind, TokenKind::Define) {
            declarations.push(Decl::Function(self.function_decl()?));
        }

        let statements = self.compound_statement()?;
        Ok(Program {
            declarations,
            statements,
        })
    }

    /// function-decl := "define" IDENT ("(" formal-params ")")? "{" program
    ///                      ("return" logical-stmt)? ";"? "}"
    fn function_decl(&mut self) -> ParseResult<FunctionDecl> {
        self.validate(TokenKind::Define)?;
        let name = self.expect_identifier()?;

        let mut params = Vec::new();
        if matches!(self.current.kind, TokenKind::LParen) {
            self.advance()?;
            if !matches!(self.current.kind, TokenKind::RParen) {
                loop {
                    let param_name = self.expect_identifier()?;
                    self.validate(TokenKind::Colon)?;
                    let type_name = self.expect_identifier()?;
                    params.push(Param {
                        name: param_name,
                        type_name,
                    });
                    if matches!(self.current.kind, TokenKind::Comma) {
                        self.advance()?;
                    } else {
                        break;
                    }
                }
            }
            self.validate(TokenKind::RParen)?;
        }

        self.validate(TokenKind::LBrace)?;
        let body = self.program()?;
        let ret = if matches!(self.current.kind, TokenKind::Return) {
            self.advance()?;
            Some(Rc::new(self.logical_stmt()?))
        } else {
            None
        };
        if matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance()?;
        }
        self.validate(TokenKind::RBrace)?;

        Ok(FunctionDecl {
            name,
            params,
            body: Rc::new(body),
            ret,
        })
    }

    /// compound-stmt := statement (";" statement)*
    fn compound_statement(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![self.statement()?];
        while matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance()?;
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.current.kind {
            // Empty statement slot: the surrounding construct finishes it.
            TokenKind::RBrace
            | TokenKind::Eof
            | TokenKind::Return
            | TokenKind::Semicolon => Ok(Stmt::Blank(Token::blank(self.current.span))),
            TokenKind::If => self.conditional(),
            TokenKind::Loop => self.range_loop(),
            TokenKind::Identifier(_) => {
                // A '(' directly after the identifier makes it a call; a
                // ':=' one token ahead makes it an assignment; anything
                // else is a bare logical-statement.
                if self.peeked.is_none() && self.lexer.peek_char() == Some('(') {
                    return Ok(Stmt::Expr(Expr::Call(self.function_call()?)));
                }
                if matches!(self.peek()?.kind, TokenKind::Assign) {
                    return self.assignment();
                }
                Ok(Stmt::Expr(self.logical_stmt()?))
            }
            _ => Ok(Stmt::Expr(self.logical_stmt()?)),
        }
    }

    fn assignment(&mut self) -> ParseResult<Stmt> {
        let target = self.expect_identifier()?;
        let op = self.validate(TokenKind::Assign)?;
        let value = self.logical_stmt()?;
        Ok(Stmt::Assign { target, op, value })
    }

    /// conditional := "if" logical-stmt "{" program "}"
    ///                ("elif" logical-stmt "{" program "}")*
    ///                ("else" "{" program "}")?
    fn conditional(&mut self) -> ParseResult<Stmt> {
        let if_token = self.validate(TokenKind::If)?;
        let mut branches = vec![self.branch(if_token.clone())?];

        while matches!(self.current.kind, TokenKind::Elif) {
            let elif_token = self.advance()?;
            branches.push(self.branch(elif_token)?);
        }

        let else_block = if matches!(self.current.kind, TokenKind::Else) {
            self.advance()?;
            self.validate(TokenKind::LBrace)?;
            let block = self.program()?;
            self.validate(TokenKind::RBrace)?;
            Some(block)
        } else {
            None
        };

        Ok(Stmt::Conditional(Conditional {
            token: if_token,
            branches,
            else_block,
        }))
    }

    fn branch(&mut self, token: Token) -> ParseResult<Branch> {
        let condition = self.logical_stmt()?;
        self.validate(TokenKind::LBrace)?;
        let block = self.program()?;
        self.validate(TokenKind::RBrace)?;
        Ok(Branch {
            token,
            condition,
            block,
        })
    }

    /// range-loop := "loop" "from" expression "to" expression "using" IDENT
    ///               "{" program "}"
    fn range_loop(&mut self) -> ParseResult<Stmt> {
        let loop_token = self.validate(TokenKind::Loop)?;
        self.validate(TokenKind::From)?;
        let low = self.expression()?;
        self.validate(TokenKind::To)?;
        let high = self.expression()?;
        self.validate(TokenKind::Using)?;
        let variable = self.expect_identifier()?;
        self.validate(TokenKind::LBrace)?;
        let body = self.program()?;
        self.validate(TokenKind::RBrace)?;
        Ok(Stmt::Loop(RangeLoop {
            token: loop_token,
            variable,
            low,
            high,
            body,
        }))
    }

    /// logical-stmt := comparison ( ("and"|"or"|"not") comparison )*
    fn logical_stmt(&mut self) -> ParseResult<Expr> {
        let mut node = self.comparison()?;
        while matches!(
            self.current.kind,
            TokenKind::And | TokenKind::Or | TokenKind::Not
        ) {
            let op = self.advance()?;
            let right = self.comparison()?;
            node = Expr::Logical {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    /// comparison := expression ( comparator expression )*
    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut node = self.expression()?;
        while matches!(
            self.current.kind,
            TokenKind::EqualEqual
                | TokenKind::NotEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::Less
                | TokenKind::LessEqual
        ) {
            let op = self.advance()?;
            let right = self.expression()?;
            node = Expr::Comparison {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    /// expression := term ( ("+"|"-") term )*
    fn expression(&mut self) -> ParseResult<Expr> {
        let mut node = self.term()?;
        while matches!(self.current.kind, TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance()?;
            let right = self.term()?;
            node = Expr::Binary {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    /// term := factor ( ("*"|"//"|"/"|"%"|"^") factor )*
    fn term(&mut self) -> ParseResult<Expr> {
        let mut node = self.factor()?;
        while matches!(
            self.current.kind,
            TokenKind::Star
                | TokenKind::SlashSlash
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Caret
        ) {
            let op = self.advance()?;
            let right = self.factor()?;
            node = Expr::Binary {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        match self.current.kind {
            TokenKind::Plus | TokenKind::Minus => {
                let op = self.advance()?;
                let operand = self.factor()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Integer(value) => {
                let token = self.advance()?;
                Ok(Expr::Integer { value, token })
            }
            TokenKind::Float(value) => {
                let token = self.advance()?;
                Ok(Expr::Float { value, token })
            }
            TokenKind::Str(_) => {
                let token = self.advance()?;
                let value = match &token.kind {
                    TokenKind::Str(value) => value.clone(),
                    _ => unreachable!("matched string token"),
                };
                Ok(Expr::Str { value, token })
            }
            TokenKind::True => {
                let token = self.advance()?;
                Ok(Expr::Boolean { value: true, token })
            }
            TokenKind::False => {
                let token = self.advance()?;
                Ok(Expr::Boolean {
                    value: false,
                    token,
                })
            }
            TokenKind::LParen => {
                self.advance()?;
                let node = self.expression()?;
                self.validate(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::Identifier(_) => {
                if self.peeked.is_none() && self.lexer.peek_char() == Some('(') {
                    Ok(Expr::Call(self.function_call()?))
                } else {
                    Ok(Expr::Variable(self.advance()?))
                }
            }
            _ => Err(self.error("expression")),
        }
    }

    fn function_call(&mut self) -> ParseResult<FunctionCall> {
        let name = self.expect_identifier()?;
        self.validate(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.current.kind, TokenKind::RParen) {
            loop {
                args.push(self.logical_stmt()?);
                if matches!(self.current.kind, TokenKind::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.validate(TokenKind::RParen)?;
        Ok(FunctionCall { name, args })
    }

    /// Assert the current token's kind, consume it, and return it; raise a
    /// parse error naming the expected kind otherwise.
    fn validate(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if discriminant(&self.current.kind) == discriminant(&kind) {
            self.advance()
        } else {
            Err(self.error(kind.name()))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<Token> {
        if matches!(self.current.kind, TokenKind::Identifier(_)) {
            self.advance()
        } else {
            Err(self.error("identifier"))
        }
    }

    fn advance(&mut self) -> ParseResult<Token> {
        let next = self.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.peeked.take() {
            Ok(token)
        } else {
            Ok(self.lexer.next_token()?)
        }
    }

    fn peek(&mut self) -> ParseResult<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().expect("peeked token missing"))
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.current.describe(),
            span: self.current.span,
        }
    }
}

pub fn parse(source: &str) -> ParseResult<Program> {
    Parser::new(source)?.parse_program()
}

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("Invalid character '{character}'. {span}")]
    InvalidCharacter { character: char, span: Span },
    #[error("Unterminated string literal. {span}")]
    UnterminatedString { span: Span },
    #[error("Invalid number literal '{literal}'. {span}")]
    InvalidNumber { literal: String, span: Span },
}

pub type LexResult<T> = Result<T, LexError>;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("let", TokenKind::Let),
        ("define", TokenKind::Define),
        ("return", TokenKind::Return),
        ("if", TokenKind::If),
        ("elif", TokenKind::Elif),
        ("else", TokenKind::Else),
        ("loop", TokenKind::Loop),
        ("from", TokenKind::From),
        ("to", TokenKind::To),
        ("using", TokenKind::Using),
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
    ])
});

/// Lazy tokenizer over a source string.
///
/// Tokens are produced one at a time by `next_token`; the parser additionally
/// peeks at the raw character stream (`peek_char`) to disambiguate
/// identifier-led statements before committing to another token.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Next raw, not-yet-tokenized character.
    pub fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_whitespace_and_comments();

        let span = self.position();
        let Some(c) = self.peek_char() else {
            // Idempotent: every call at end of input yields another Eof.
            return Ok(Token::new(TokenKind::Eof, "", span));
        };

        if c.is_ascii_digit() {
            return self.read_number(span);
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier(span));
        }
        if c == '"' || c == '\'' {
            return self.read_string(span);
        }
        self.read_operator(span)
    }

    fn advance(&mut self) -> Option<char> {
        let next = self.chars.next();
        match next {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        next
    }

    fn position(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_number(&mut self, span: Span) -> LexResult<Token> {
        let mut literal = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // A '.' continues the number only when a digit follows it.
        let mut is_float = false;
        if self.peek_char() == Some('.') {
            let mut ahead = self.chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                literal.push('.');
                self.advance();
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        literal.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            let value = literal.parse::<f32>().map_err(|_| LexError::InvalidNumber {
                literal: literal.clone(),
                span,
            })?;
            Ok(Token::new(TokenKind::Float(value), literal, span))
        } else {
            let value = literal.parse::<i64>().map_err(|_| LexError::InvalidNumber {
                literal: literal.clone(),
                span,
            })?;
            Ok(Token::new(TokenKind::Integer(value), literal, span))
        }
    }

    fn read_identifier(&mut self, span: Span) -> Token {
        let mut identifier = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                identifier.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match KEYWORDS.get(identifier.as_str()) {
            Some(kind) => Token::new(kind.clone(), identifier, span),
            None => Token::new(TokenKind::Identifier(identifier.clone()), identifier, span),
        }
    }

    fn read_string(&mut self, span: Span) -> LexResult<Token> {
        let quote = self.advance().unwrap_or('"');
        let mut content = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    self.advance();
                    // Stored verbatim, no escape processing.
                    return Ok(Token::new(TokenKind::Str(content.clone()), content, span));
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
                None => return Err(LexError::UnterminatedString { span }),
            }
        }
    }

    fn read_operator(&mut self, span: Span) -> LexResult<Token> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, "", span)),
        };

        let followed_by = |lexer: &mut Self, expected: char| {
            if lexer.peek_char() == Some(expected) {
                lexer.advance();
                true
            } else {
                false
            }
        };

        let kind = match c {
            ':' => {
                if followed_by(self, '=') {
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '=' => {
                if followed_by(self, '=') {
                    TokenKind::EqualEqual
                } else {
                    return Err(LexError::InvalidCharacter { character: c, span });
                }
            }
            '!' => {
                if followed_by(self, '=') {
                    TokenKind::NotEqual
                } else {
                    return Err(LexError::InvalidCharacter { character: c, span });
                }
            }
            '>' => {
                if followed_by(self, '=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '<' => {
                if followed_by(self, '=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '/' => {
                if followed_by(self, '/') {
                    TokenKind::SlashSlash
                } else {
                    TokenKind::Slash
                }
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => return Err(LexError::InvalidCharacter { character: c, span }),
        };

        Ok(Token::new(kind.clone(), kind.name(), span))
    }
}

/// Tokenize a whole source string, ending with the Eof token.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

//! Shared diagnostic taxonomy. Each pipeline stage raises its own typed
//! error; `QuillError` is the single fatal-diagnostic surface handed back
//! to the embedding caller, and `Stage` names the taxonomy kind a given
//! error belongs to.

use std::fmt;

use thiserror::Error;

use crate::interpreter::error::RuntimeError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::resolver::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexer,
    Parser,
    Semantic,
    Runtime,
    Type,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lexer => "LexerError",
            Stage::Parser => "ParseError",
            Stage::Semantic => "SemanticError",
            Stage::Runtime => "RuntimeError",
            Stage::Type => "TypeError",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuillError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<ParseError> for QuillError {
    fn from(error: ParseError) -> Self {
        // A lex failure surfacing through the parser's lazy token pull is
        // still a Lexer diagnostic.
        match error {
            ParseError::Lex(error) => QuillError::Lex(error),
            other => QuillError::Parse(other),
        }
    }
}

impl QuillError {
    pub fn stage(&self) -> Stage {
        match self {
            QuillError::Lex(_) => Stage::Lexer,
            QuillError::Parse(_) => Stage::Parser,
            QuillError::Resolve(_) => Stage::Semantic,
            QuillError::Runtime(error) => match error {
                RuntimeError::DivisionByZero { .. } => Stage::Runtime,
                RuntimeError::VariableNotDefined { .. }
                | RuntimeError::FunctionNotDefined { .. }
                | RuntimeError::ArityMismatch { .. } => Stage::Semantic,
                RuntimeError::OperandNotSupported { .. }
                | RuntimeError::UnsupportedOperands { .. }
                | RuntimeError::ExpectedBoolean { .. }
                | RuntimeError::ExpectedNumber { .. } => Stage::Type,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    #[test]
    fn lex_errors_inside_parse_errors_keep_their_stage() {
        let error: QuillError = ParseError::Lex(LexError::InvalidCharacter {
            character: '@',
            span: Span { line: 1, column: 1 },
        })
        .into();
        assert_eq!(error.stage(), Stage::Lexer);
    }

    #[test]
    fn runtime_errors_split_across_the_taxonomy() {
        let span = Span { line: 1, column: 1 };
        let division: QuillError = RuntimeError::DivisionByZero { span }.into();
        assert_eq!(division.stage(), Stage::Runtime);

        let unbound: QuillError = RuntimeError::VariableNotDefined {
            name: "x".to_string(),
            span,
        }
        .into();
        assert_eq!(unbound.stage(), Stage::Semantic);

        let operands: QuillError = RuntimeError::UnsupportedOperands {
            operator: "+".to_string(),
            left: "string",
            right: "int",
            span,
        }
        .into();
        assert_eq!(operands.stage(), Stage::Type);
    }

    #[test]
    fn messages_carry_source_location() {
        let error = RuntimeError::DivisionByZero {
            span: Span { line: 3, column: 9 },
        };
        assert_eq!(error.to_string(), "Division by zero. Line: 3, Column: 9");
    }
}

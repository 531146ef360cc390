use thiserror::Error;

use crate::token::Span;

/// Semantic errors raised by the static resolution pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Duplicate identifier '{name}'. {span}")]
    DuplicateIdentifier { name: String, span: Span },
    #[error("Identifier '{name}' not found. {span}")]
    IdentifierNotFound { name: String, span: Span },
    #[error("Unknown type '{name}'. {span}")]
    UnknownType { name: String, span: Span },
    #[error("Function '{name}' is not defined. {span}")]
    FunctionNotDefined { name: String, span: Span },
    #[error("Function '{name}' expected {expected} arguments, got {found}. {span}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

use thiserror::Error;

use crate::token::Span;

/// Evaluation-time errors: runtime faults, late semantic checks, and the
/// operand-type violations raised by the type checker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Division by zero. {span}")]
    DivisionByZero { span: Span },
    #[error("Variable '{name}' is not defined. {span}")]
    VariableNotDefined { name: String, span: Span },
    #[error("Function '{name}' is not defined. {span}")]
    FunctionNotDefined { name: String, span: Span },
    #[error("Function '{name}' expected {expected} arguments, got {found}. {span}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("Operand '{operator}' not defined for type {type_name}. {span}")]
    OperandNotSupported {
        operator: String,
        type_name: &'static str,
        span: Span,
    },
    #[error("Unsupported operand types for '{operator}': {left} and {right}. {span}")]
    UnsupportedOperands {
        operator: String,
        left: &'static str,
        right: &'static str,
        span: Span,
    },
    #[error("Expected a boolean, got {type_name}. {span}")]
    ExpectedBoolean {
        type_name: &'static str,
        span: Span,
    },
    #[error("Expected a number, got {type_name}. {span}")]
    ExpectedNumber {
        type_name: &'static str,
        span: Span,
    },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

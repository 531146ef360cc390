//! Operand-type compatibility checking for binary and comparison
//! operations, consulted by the evaluator immediately before an operation
//! executes.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::Expr;
use crate::interpreter::callstack::CallStack;
use crate::interpreter::error::RuntimeError;
use crate::interpreter::value::Value;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    Float,
    Str,
    Boolean,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Integer => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "string",
            TypeTag::Boolean => "bool",
        }
    }

    /// Map a declared type name to its runtime type tag.
    pub fn from_type_name(name: &str) -> Option<TypeTag> {
        match name {
            "int" => Some(TypeTag::Integer),
            "float" => Some(TypeTag::Float),
            "string" => Some(TypeTag::Str),
            "bool" => Some(TypeTag::Boolean),
            _ => None,
        }
    }

    pub fn of(value: &Value) -> Option<TypeTag> {
        match value {
            Value::Integer(_) => Some(TypeTag::Integer),
            Value::Float(_) => Some(TypeTag::Float),
            Value::Str(_) => Some(TypeTag::Str),
            Value::Boolean(_) => Some(TypeTag::Boolean),
            Value::None => None,
        }
    }
}

const NUMERIC: &[TypeTag] = &[TypeTag::Integer, TypeTag::Float];
const STRING_ONLY: &[TypeTag] = &[TypeTag::Str];
const INTEGER_ONLY: &[TypeTag] = &[TypeTag::Integer];

type OperandTable = HashMap<TypeTag, &'static [TypeTag]>;

fn numeric_operands() -> OperandTable {
    HashMap::from([(TypeTag::Integer, NUMERIC), (TypeTag::Float, NUMERIC)])
}

fn comparable_operands() -> OperandTable {
    HashMap::from([
        (TypeTag::Integer, NUMERIC),
        (TypeTag::Float, NUMERIC),
        (TypeTag::Str, STRING_ONLY),
    ])
}

/// operation -> accepted left type -> accepted right types.
static ALLOWED_OPERATIONS: Lazy<HashMap<&'static str, OperandTable>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("+", {
        let mut operands = numeric_operands();
        operands.insert(TypeTag::Str, STRING_ONLY);
        operands
    });
    table.insert("*", {
        let mut operands = numeric_operands();
        operands.insert(TypeTag::Str, INTEGER_ONLY);
        operands
    });
    table.insert("%", HashMap::from([(TypeTag::Integer, INTEGER_ONLY)]));
    for op in ["-", "/", "//", "^"] {
        table.insert(op, numeric_operands());
    }
    for op in [">", ">=", "<", "<=", "==", "!="] {
        table.insert(op, comparable_operands());
    }
    table
});

/// Check one operation against the compatibility matrix. The left type must
/// be a key for the operation and the right type must be in its accepted
/// set; either failure is a fatal type error naming the operator and types.
pub fn check(op: &Token, left: TypeTag, right: TypeTag) -> Result<(), RuntimeError> {
    let Some(accepted_left) = ALLOWED_OPERATIONS.get(op.lexeme.as_str()) else {
        return Ok(());
    };
    let Some(accepted_right) = accepted_left.get(&left) else {
        return Err(RuntimeError::OperandNotSupported {
            operator: op.lexeme.clone(),
            type_name: left.name(),
            span: op.span,
        });
    };
    if !accepted_right.contains(&right) {
        return Err(RuntimeError::UnsupportedOperands {
            operator: op.lexeme.clone(),
            left: left.name(),
            right: right.name(),
            span: op.span,
        });
    }
    Ok(())
}

/// Static type of an operand, when one can be named: literal kinds
/// directly, identifiers through their declared type in the activation
/// record chain. Compound operands defer to the evaluator's value checks.
pub fn static_type(expr: &Expr, call_stack: &CallStack) -> Option<TypeTag> {
    match expr {
        Expr::Integer { .. } => Some(TypeTag::Integer),
        Expr::Float { .. } => Some(TypeTag::Float),
        Expr::Str { .. } => Some(TypeTag::Str),
        Expr::Boolean { .. } => Some(TypeTag::Boolean),
        Expr::Variable(token) => call_stack
            .declared_type(&token.lexeme)
            .and_then(TypeTag::from_type_name),
        Expr::Unary { operand, .. } => static_type(operand, call_stack),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Span, TokenKind};

    fn op(symbol: &str) -> Token {
        Token::new(TokenKind::Blank, symbol, Span::default())
    }

    #[test]
    fn accepts_numeric_promotion_pairs() {
        check(&op("+"), TypeTag::Integer, TypeTag::Float).expect("int + float");
        check(&op("^"), TypeTag::Float, TypeTag::Integer).expect("float ^ int");
    }

    #[test]
    fn accepts_string_concatenation_and_repetition() {
        check(&op("+"), TypeTag::Str, TypeTag::Str).expect("string + string");
        check(&op("*"), TypeTag::Str, TypeTag::Integer).expect("string * int");
    }

    #[test]
    fn rejects_unsupported_left_operand() {
        let err = check(&op("-"), TypeTag::Str, TypeTag::Integer).expect_err("string - int");
        assert!(matches!(
            err,
            RuntimeError::OperandNotSupported { type_name: "string", .. }
        ));
    }

    #[test]
    fn rejects_unsupported_right_operand() {
        let err = check(&op("*"), TypeTag::Str, TypeTag::Str).expect_err("string * string");
        assert!(matches!(
            err,
            RuntimeError::UnsupportedOperands { left: "string", right: "string", .. }
        ));
    }

    #[test]
    fn modulo_is_integer_only() {
        check(&op("%"), TypeTag::Integer, TypeTag::Integer).expect("int % int");
        let err = check(&op("%"), TypeTag::Float, TypeTag::Integer).expect_err("float % int");
        assert!(matches!(err, RuntimeError::OperandNotSupported { .. }));
    }

    #[test]
    fn comparators_accept_strings_symmetrically() {
        check(&op("=="), TypeTag::Str, TypeTag::Str).expect("string == string");
        let err = check(&op("=="), TypeTag::Str, TypeTag::Integer).expect_err("string == int");
        assert!(matches!(err, RuntimeError::UnsupportedOperands { .. }));
    }

    #[test]
    fn booleans_are_not_comparable_operands() {
        let err = check(&op("=="), TypeTag::Boolean, TypeTag::Boolean).expect_err("bool == bool");
        assert!(matches!(
            err,
            RuntimeError::OperandNotSupported { type_name: "bool", .. }
        ));
    }
}

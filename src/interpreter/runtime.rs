use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Conditional, Decl, Expr, FunctionCall, Program, RangeLoop, Stmt};
use crate::resolver::scope::{FunctionInfo, OUTPUT_FUNCTION};
use crate::token::{Token, TokenKind};
use crate::typecheck;

use super::callstack::{ActivationRecord, CallStack, FrameKind};
use super::error::{RuntimeError, RuntimeResult};
use super::value::Value;

const PROGRAM_FRAME: &str = "program";
const LOOP_FRAME: &str = "loop";

/// Tree-walking executor. One instance runs one resolved program to
/// completion or to its first fatal error.
pub(super) struct Evaluator<'a> {
    functions: &'a HashMap<String, Rc<FunctionInfo>>,
    call_stack: CallStack,
    pub(super) output: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(functions: &'a HashMap<String, Rc<FunctionInfo>>) -> Self {
        Self {
            functions,
            call_stack: CallStack::new(),
            output: Vec::new(),
        }
    }

    /// Evaluate a program node: declarations first, then each statement in
    /// order, skipping blanks; the last evaluated statement's value is the
    /// program's value. Only the outermost program pushes its own frame —
    /// function and loop bodies run against the frame their caller pushed.
    pub(super) fn eval_program(&mut self, program: &Program) -> RuntimeResult<Value> {
        let entered = self.call_stack.peek().is_none();
        if entered {
            self.call_stack
                .push(ActivationRecord::new(PROGRAM_FRAME, FrameKind::Program, 1));
        }

        for declaration in &program.declarations {
            if let Decl::Var(declaration) = declaration {
                // Function declarations have no runtime effect beyond
                // having been resolved.
                if let Some(frame) = self.call_stack.peek_mut() {
                    frame.declare(&declaration.name.lexeme, &declaration.type_name.lexeme);
                }
            }
        }

        let mut result = Value::None;
        for statement in &program.statements {
            if matches!(statement, Stmt::Blank(_)) {
                continue;
            }
            match self.eval_stmt(statement) {
                Ok(value) => result = value,
                Err(error) => {
                    if entered {
                        self.call_stack.pop();
                    }
                    return Err(error);
                }
            }
        }

        if entered {
            self.call_stack.pop();
        }
        Ok(result)
    }

    fn eval_stmt(&mut self, statement: &Stmt) -> RuntimeResult<Value> {
        match statement {
            Stmt::Assign { target, value, .. } => {
                let value = self.eval_expr(value)?;
                self.call_stack.assign(&target.lexeme, value);
                Ok(Value::None)
            }
            Stmt::Expr(expr) => self.eval_expr(expr),
            Stmt::Conditional(conditional) => self.eval_conditional(conditional),
            Stmt::Loop(range_loop) => self.eval_loop(range_loop),
            Stmt::Blank(_) => Ok(Value::None),
        }
    }

    fn eval_conditional(&mut self, conditional: &Conditional) -> RuntimeResult<Value> {
        for branch in &conditional.branches {
            let condition = self.eval_expr(&branch.condition)?;
            match condition {
                Value::Boolean(true) => return self.eval_program(&branch.block),
                Value::Boolean(false) => {}
                other => {
                    return Err(RuntimeError::ExpectedBoolean {
                        type_name: other.type_name(),
                        span: branch.condition.token().span,
                    });
                }
            }
        }
        match &conditional.else_block {
            Some(block) => self.eval_program(block),
            None => Ok(Value::None),
        }
    }

    fn eval_loop(&mut self, range_loop: &RangeLoop) -> RuntimeResult<Value> {
        // Both bounds are evaluated once, before the frame is pushed.
        let low = self.loop_bound(&range_loop.low)?;
        let high = self.loop_bound(&range_loop.high)?;

        let nesting_level = self.current_nesting_level() + 1;
        self.call_stack
            .push(ActivationRecord::new(LOOP_FRAME, FrameKind::Loop, nesting_level));

        for counter in low..=high {
            if let Some(frame) = self.call_stack.peek_mut() {
                frame.bind(
                    &range_loop.variable.lexeme,
                    Some("int".to_string()),
                    Value::Integer(counter),
                );
            }
            if let Err(error) = self.eval_program(&range_loop.body) {
                self.call_stack.pop();
                return Err(error);
            }
        }

        self.call_stack.pop();
        Ok(Value::None)
    }

    fn loop_bound(&mut self, expr: &Expr) -> RuntimeResult<i64> {
        let value = self.eval_expr(expr)?;
        value.as_integer().ok_or_else(|| RuntimeError::ExpectedNumber {
            type_name: value.type_name(),
            span: expr.token().span,
        })
    }

    fn current_nesting_level(&self) -> usize {
        self.call_stack
            .peek()
            .map_or(0, |frame| frame.nesting_level)
    }

    fn eval_expr(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Integer { value, .. } => Ok(Value::Integer(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expr::Variable(token) => self.eval_variable(token),
            Expr::Unary { op, operand } => self.eval_unary(op, operand),
            Expr::Binary { left, op, right } => self.eval_binary(left, op, right),
            Expr::Comparison { left, op, right } => self.eval_comparison(left, op, right),
            Expr::Logical { left, op, right } => self.eval_logical(left, op, right),
            Expr::Call(call) => self.eval_call(call),
        }
    }

    fn eval_variable(&self, token: &Token) -> RuntimeResult<Value> {
        match self.call_stack.lookup(&token.lexeme) {
            Some(binding) if !binding.value.is_none() => Ok(binding.value.clone()),
            _ => Err(RuntimeError::VariableNotDefined {
                name: token.lexeme.clone(),
                span: token.span,
            }),
        }
    }

    fn eval_unary(&mut self, op: &Token, operand: &Expr) -> RuntimeResult<Value> {
        let value = self.eval_expr(operand)?;
        let negate = matches!(op.kind, TokenKind::Minus);
        match value {
            Value::Integer(value) => Ok(Value::Integer(if negate { -value } else { value })),
            Value::Float(value) => Ok(Value::Float(if negate { -value } else { value })),
            other => Err(RuntimeError::ExpectedNumber {
                type_name: other.type_name(),
                span: operand.token().span,
            }),
        }
    }

    /// Static check against the compatibility matrix when both operand
    /// types can be named; the value-level arms below catch the rest.
    fn check_operands(&self, op: &Token, left: &Expr, right: &Expr) -> RuntimeResult<()> {
        let left_type = typecheck::static_type(left, &self.call_stack);
        let right_type = typecheck::static_type(right, &self.call_stack);
        if let (Some(left_type), Some(right_type)) = (left_type, right_type) {
            typecheck::check(op, left_type, right_type)?;
        }
        Ok(())
    }

    fn eval_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> RuntimeResult<Value> {
        self.check_operands(op, left, right)?;
        let left_value = self.eval_expr(left)?;
        let right_value = self.eval_expr(right)?;
        self.apply_binary(op, left_value, right_value, right)
    }

    fn apply_binary(
        &self,
        op: &Token,
        left: Value,
        right: Value,
        divisor: &Expr,
    ) -> RuntimeResult<Value> {
        match (&op.kind, &left, &right) {
            (TokenKind::Plus, Value::Str(a), Value::Str(b)) => {
                Ok(Value::Str(format!("{a}{b}")))
            }
            (TokenKind::Star, Value::Str(a), Value::Integer(count)) => {
                let count = (*count).max(0) as usize;
                Ok(Value::Str(a.repeat(count)))
            }
            (TokenKind::Plus, Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
            (TokenKind::Minus, Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a - b)),
            (TokenKind::Star, Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
            _ => self.apply_numeric(op, &left, &right, divisor),
        }
    }

    /// Arithmetic after numeric promotion: if either operand is a float,
    /// both are treated as floats.
    fn apply_numeric(
        &self,
        op: &Token,
        left: &Value,
        right: &Value,
        divisor: &Expr,
    ) -> RuntimeResult<Value> {
        let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
            return Err(RuntimeError::UnsupportedOperands {
                operator: op.lexeme.clone(),
                left: left.type_name(),
                right: right.type_name(),
                span: op.span,
            });
        };

        match op.kind {
            TokenKind::Plus => Ok(Value::Float(a + b)),
            TokenKind::Minus => Ok(Value::Float(a - b)),
            TokenKind::Star => Ok(Value::Float(a * b)),
            TokenKind::Slash => {
                self.check_divisor(b, divisor)?;
                Ok(Value::Float(a / b))
            }
            TokenKind::SlashSlash => {
                self.check_divisor(b, divisor)?;
                // Truncation toward zero after float division.
                Ok(Value::Integer((a / b).trunc() as i64))
            }
            TokenKind::Percent => {
                self.check_divisor(b, divisor)?;
                Ok(Value::Integer(a.trunc() as i64 % b.trunc() as i64))
            }
            TokenKind::Caret => Ok(Value::Float(a.powf(b))),
            _ => Err(RuntimeError::UnsupportedOperands {
                operator: op.lexeme.clone(),
                left: left.type_name(),
                right: right.type_name(),
                span: op.span,
            }),
        }
    }

    fn check_divisor(&self, divisor: f32, expr: &Expr) -> RuntimeResult<()> {
        if divisor == 0.0 {
            return Err(RuntimeError::DivisionByZero {
                span: expr.token().span,
            });
        }
        Ok(())
    }

    fn eval_comparison(&mut self, left: &Expr, op: &Token, right: &Expr) -> RuntimeResult<Value> {
        self.check_operands(op, left, right)?;
        let left_value = self.eval_expr(left)?;
        let right_value = self.eval_expr(right)?;

        if let (Value::Str(a), Value::Str(b)) = (&left_value, &right_value) {
            // Strings support equality only: length first, then bytes.
            let equal = a.len() == b.len() && a.as_bytes() == b.as_bytes();
            return match op.kind {
                TokenKind::EqualEqual => Ok(Value::Boolean(equal)),
                TokenKind::NotEqual => Ok(Value::Boolean(!equal)),
                _ => Err(RuntimeError::UnsupportedOperands {
                    operator: op.lexeme.clone(),
                    left: "string",
                    right: "string",
                    span: op.span,
                }),
            };
        }

        let (Some(a), Some(b)) = (left_value.as_float(), right_value.as_float()) else {
            return Err(RuntimeError::UnsupportedOperands {
                operator: op.lexeme.clone(),
                left: left_value.type_name(),
                right: right_value.type_name(),
                span: op.span,
            });
        };

        let result = match op.kind {
            TokenKind::Greater => a > b,
            TokenKind::GreaterEqual => a >= b,
            TokenKind::Less => a < b,
            TokenKind::LessEqual => a <= b,
            TokenKind::EqualEqual => a == b,
            TokenKind::NotEqual => a != b,
            _ => {
                return Err(RuntimeError::UnsupportedOperands {
                    operator: op.lexeme.clone(),
                    left: left_value.type_name(),
                    right: right_value.type_name(),
                    span: op.span,
                });
            }
        };
        Ok(Value::Boolean(result))
    }

    /// Both operands are always evaluated; there is deliberately no
    /// short-circuiting.
    fn eval_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> RuntimeResult<Value> {
        let left_value = self.eval_expr(left)?;
        let right_value = self.eval_expr(right)?;

        if matches!(op.kind, TokenKind::Not) {
            return match right_value {
                Value::Boolean(value) => Ok(Value::Boolean(!value)),
                other => Err(RuntimeError::ExpectedBoolean {
                    type_name: other.type_name(),
                    span: right.token().span,
                }),
            };
        }

        let (Value::Boolean(a), Value::Boolean(b)) = (&left_value, &right_value) else {
            let (offender, span) = if matches!(left_value, Value::Boolean(_)) {
                (right_value.type_name(), right.token().span)
            } else {
                (left_value.type_name(), left.token().span)
            };
            return Err(RuntimeError::ExpectedBoolean {
                type_name: offender,
                span,
            });
        };

        match op.kind {
            TokenKind::And => Ok(Value::Boolean(*a && *b)),
            TokenKind::Or => Ok(Value::Boolean(*a || *b)),
            _ => Err(RuntimeError::UnsupportedOperands {
                operator: op.lexeme.clone(),
                left: left_value.type_name(),
                right: right_value.type_name(),
                span: op.span,
            }),
        }
    }

    fn eval_call(&mut self, call: &FunctionCall) -> RuntimeResult<Value> {
        let name = &call.name.lexeme;

        // The builtin print function evaluates its arguments without
        // pushing a frame.
        if name == OUTPUT_FUNCTION {
            let mut rendered = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                rendered.push(self.eval_expr(arg)?.to_output());
            }
            self.output.push(rendered.join(" "));
            return Ok(Value::None);
        }

        let Some(function) = self.functions.get(name).cloned() else {
            return Err(RuntimeError::FunctionNotDefined {
                name: name.clone(),
                span: call.name.span,
            });
        };
        if call.args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.clone(),
                expected: function.params.len(),
                found: call.args.len(),
                span: call.name.span,
            });
        }

        // Actuals are evaluated in the caller's context, in declaration
        // order, before the new frame is pushed.
        let mut arguments = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            arguments.push(self.eval_expr(arg)?);
        }

        let mut frame = ActivationRecord::new(
            &function.name,
            FrameKind::Function,
            self.current_nesting_level() + 1,
        );
        for (param, value) in function.params.iter().zip(arguments) {
            frame.bind(&param.name, Some(param.type_name.clone()), value);
        }
        self.call_stack.push(frame);

        if let Err(error) = self.eval_program(&function.body) {
            self.call_stack.pop();
            return Err(error);
        }
        // The return expression runs after the whole body, against the
        // function's still-live frame.
        let result = match &function.ret {
            Some(expr) => match self.eval_expr(expr) {
                Ok(value) => value,
                Err(error) => {
                    self.call_stack.pop();
                    return Err(error);
                }
            },
            None => Value::None,
        };
        self.call_stack.pop();
        Ok(result)
    }
}

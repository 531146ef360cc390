use std::mem;

use crate::error::QuillError;
use crate::parser;
use crate::resolver;

pub mod callstack;
pub mod error;
mod runtime;
pub mod value;

use runtime::Evaluator;
pub use value::Value;

/// Pipeline handle for one source text: lex, parse, resolve, then walk the
/// tree. Scope resolution always completes over the whole program before
/// evaluation begins; the first error at any stage aborts the run.
pub struct Interpreter {
    source: String,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output: Vec::new(),
        }
    }

    pub fn interpret(&mut self) -> Result<Value, QuillError> {
        let program = parser::parse(&self.source).map_err(QuillError::from)?;
        let resolved = resolver::resolve(&program)?;

        let mut evaluator = Evaluator::new(&resolved.functions);
        let result = evaluator.eval_program(&program);
        // Lines printed before a fatal error are still observable.
        self.output.append(&mut evaluator.output);
        Ok(result?)
    }

    /// Lines printed by `output(...)` during the last run.
    pub fn take_output(&mut self) -> Vec<String> {
        mem::take(&mut self.output)
    }
}

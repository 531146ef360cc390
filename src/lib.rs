pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod typecheck;

pub use error::{QuillError, Stage};
pub use interpreter::{Interpreter, Value};

/// One-shot convenience for embedders: interpret a source text and return
/// its value, discarding anything printed by `output`.
pub fn interpret(source: &str) -> Result<Value, QuillError> {
    let mut interpreter = Interpreter::new(source);
    interpreter.interpret()
}

//! Script evaluation.
//!
//! The compiler never runs template code itself. Every embedded expression
//! is handed to a [`ScriptEvaluator`]; the evaluator value is also the
//! evaluation context, so locals assigned by one `- stmt` line are visible
//! to the expressions that follow it.
//!
//! [`Interpreter`] is the built-in evaluator. It is deliberately small and
//! side-effect free: literals, variables, arrays and hashes, arithmetic,
//! comparison, boolean logic, string interpolation, assignment, and a fixed
//! set of value methods.

mod ast;
mod eval;
mod lexer;
mod parser;
mod value;

pub use eval::Interpreter;
pub use value::Value;

use crate::error::ScriptError;

pub trait ScriptEvaluator {
    /// Evaluates `code` and returns its value.
    ///
    /// Statements that produce nothing return [`Value::Nil`].
    fn evaluate(&mut self, code: &str) -> Result<Value, ScriptError>;
}

impl<F> ScriptEvaluator for F
where
    F: FnMut(&str) -> Result<Value, ScriptError>,
{
    fn evaluate(&mut self, code: &str) -> Result<Value, ScriptError> {
        self(code)
    }
}

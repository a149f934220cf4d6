use thiserror::Error;

/// Errors raised while validating compile options.
///
/// These are reported before any compilation work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option `{0}` detected")]
    UnknownOption(String),
    #[error("unknown parameter `{value}` for `{key}` detected")]
    UnknownParameter { key: String, value: String },
    #[error("option `{key}` expects {expected}, got `{value}`")]
    InvalidType {
        key: String,
        expected: &'static str,
        value: String,
    },
}

/// Errors raised by a script evaluator.
///
/// The compiler never recovers from these; they abort the compile unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("undefined local variable `{0}`")]
    UndefinedVariable(String),
    #[error("undefined method `{method}` for {receiver}")]
    UndefinedMethod { method: String, receiver: &'static str },
    #[error("type error: {0}")]
    Type(String),
    #[error("divided by 0")]
    ZeroDivision,
    /// Failure reported by an external evaluator, passed through verbatim.
    #[error("{0}")]
    Host(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read template: {0}")]
    TemplateIo(#[from] std::io::Error),
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("filter `{0}` is not defined")]
    UnknownFilter(String),
    #[error("template nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },
}

use std::fmt::Display;

use crate::types::Value;

/// Signals that unwind evaluation. Both variants short-circuit
/// through every enclosing construct via `?`, and a `Return` is
/// caught again at the nearest function call boundary.
#[derive(Debug, PartialEq)]
pub enum Exception {
    Error(RuntimeError),
    Return(Value),
}

impl Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Return(val) => write!(f, "{val}"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<RuntimeError> for Exception {
    fn from(e: RuntimeError) -> Self {
        Self::Error(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMsg {
    IdentNotFound,
    TypeMismatch,
    UnknownOperator,
    NotAFunction,
    WrongArgCount,
    NotHashable,
    DivisionByZero,
    IndexNotSupported,
    UnsupportedArg,
    CallDepthExceeded,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::IdentNotFound => "identifier not found",
            Self::TypeMismatch => "type mismatch",
            Self::UnknownOperator => "unknown operator",
            Self::NotAFunction => "not a function",
            Self::WrongArgCount => "wrong number of arguments",
            Self::NotHashable => "unusable as hash key",
            Self::DivisionByZero => "division by zero",
            Self::IndexNotSupported => "index operator not supported",
            Self::UnsupportedArg => "unsupported argument",
            Self::CallDepthExceeded => "maximum call depth exceeded",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub msg: ErrorMsg,
    pub detail: String,
    /// Line of the innermost expression the error passed through
    pub line: Option<usize>,
}

impl RuntimeError {
    /// Attach a source line, unless one is already known
    pub fn with_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "Runtime error at line {line}: {}: {}", self.msg, self.detail),
            None => write!(f, "Runtime error: {}: {}", self.msg, self.detail),
        }
    }
}

pub fn make(msg: ErrorMsg, detail: impl Display) -> RuntimeError {
    RuntimeError {
        msg,
        detail: detail.to_string(),
        line: None,
    }
}

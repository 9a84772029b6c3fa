// src/error.rs

use std::fmt;

#[derive(Debug, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, PartialEq)]
pub enum SyntaxErrorKind {
    UnexpectedChar(char),
    UnexpectedToken { found: String, expected: String },
    UnexpectedEnd { expected: String },
    InvalidNumber(String),
    NonAssociative(String),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax error at {}:{}: {}", self.line, self.col, self.kind)
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnexpectedChar(c) => write!(f, "Unexpected character: '{}'", c),
            SyntaxErrorKind::UnexpectedToken { found, expected } => {
                write!(f, "Unexpected token '{}', expected {}", found, expected)
            }
            SyntaxErrorKind::UnexpectedEnd { expected } => {
                write!(f, "Unexpected end of input, expected {}", expected)
            }
            SyntaxErrorKind::InvalidNumber(s) => write!(f, "Invalid number: '{}'", s),
            SyntaxErrorKind::NonAssociative(op) => {
                write!(f, "Comparison operator '{}' cannot be chained", op)
            }
        }
    }
}

/// Budget violations. Ill-typed terms never fail; they are left as residual terms.
#[derive(Debug, PartialEq)]
pub enum EvalError {
    StepLimitExceeded { limit: u64 },
    DepthLimitExceeded { limit: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::StepLimitExceeded { limit } => {
                write!(f, "Evaluation did not terminate within {} steps", limit)
            }
            EvalError::DepthLimitExceeded { limit } => {
                write!(f, "Evaluation nested deeper than {} levels", limit)
            }
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Error {
    Syntax(SyntaxError),
    Eval(EvalError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyntaxError {}
impl std::error::Error for EvalError {}
impl std::error::Error for Error {}

impl From<SyntaxError> for Error {
    fn from(value: SyntaxError) -> Self {
        Error::Syntax(value)
    }
}

impl From<EvalError> for Error {
    fn from(value: EvalError) -> Self {
        Error::Eval(value)
    }
}

use core::ops::Range;

use thiserror::Error;


/// Errors produced while turning source text into an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unrecognized input at {0:?}")]
    UnknownToken(Range<usize>),

    #[error("integer literal out of range at {0:?}")]
    IntegerOutOfRange(Range<usize>),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected closing delimiter at {0:?}")]
    UnexpectedClose(Range<usize>),

    #[error("mismatched delimiter at {span:?}: expected `{expected}`, found `{found}`")]
    MismatchedDelimiter { expected: char, found: char, span: Range<usize> },

    #[error("lists nested deeper than {limit} levels at {span:?}")]
    NestingTooDeep { limit: usize, span: Range<usize> },

    #[error("program contains no expressions")]
    EmptyProgram,

    #[error("malformed {form}: {reason}")]
    InvalidForm { form: &'static str, reason: String },
}

impl SyntaxError {
    pub(crate) fn invalid(form: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidForm { form, reason: reason.into() }
    }
}

/// Errors raised by the machine. Any of these aborts the running evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("unbound name `{0}`")]
    UnboundName(String),

    #[error("arity mismatch: expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("unknown primitive `{0}`")]
    UnknownPrimitive(String),

    #[error("undefined value accessed")]
    UndefinedValueAccess,

    #[error("primitive `{name}` failed: {reason}")]
    Primitive { name: String, reason: String },

    #[error("cannot apply non-procedure {0}")]
    NotAProcedure(String),

    /// The tree handed to the machine has a shape the parser should have rejected.
    #[error("malformed program: {0}")]
    MalformedProgram(String),
}

impl EvaluationError {
    pub(crate) fn primitive(name: &str, reason: impl Into<String>) -> Self {
        Self::Primitive { name: name.to_owned(), reason: reason.into() }
    }

    /// Stable name of the error kind, used by the JSON outcome format.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnboundName(_) => "UnboundNameError",
            Self::Arity { .. } => "ArityError",
            Self::UnknownPrimitive(_) => "UnknownPrimitiveError",
            Self::UndefinedValueAccess => "UndefinedValueAccessError",
            Self::Primitive { .. } => "PrimitiveError",
            Self::NotAProcedure(_) => "NotAProcedureError",
            Self::MalformedProgram(_) => "MalformedProgramError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VulcanError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl VulcanError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SyntaxError",
            Self::Evaluation(error) => error.kind(),
        }
    }
}

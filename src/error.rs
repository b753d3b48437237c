//! The three error categories raised by the pipeline (§7), plus [PlcError],
//! the aggregate most callers actually want.
use thiserror::Error;

/// A malformed token stream. Always carries the byte offset of the
/// offending token -- or, if the stream ran out first, the offset just
/// past the last token that was consumed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError { message: message.into(), offset }
    }
}

/// A type, scoping, or structural-invariant violation discovered before
/// execution (§4.2). The offset is optional: some rules (e.g. "missing
/// `main`") have no single offending token to point at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("analysis error{}: {message}", offset.map(|o| format!(" at byte {o}")).unwrap_or_default())]
pub struct AnalysisError {
    pub message: String,
    pub offset: Option<usize>,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>) -> Self {
        AnalysisError { message: message.into(), offset: None }
    }

    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        AnalysisError { message: message.into(), offset: Some(offset) }
    }
}

/// Everything that can go wrong once the interpreter starts evaluating an
/// analyzed program (§7): assignment to an immutable, a value-site type
/// mismatch, division by zero, an undefined name, or a missing `main`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("cannot assign to immutable variable '{name}'")]
    AssignToImmutable { name: String },

    #[error("undefined name '{name}'")]
    UndefinedName { name: String },

    #[error("expected a list, found {found}")]
    NotAList { found: String },

    #[error("expected a boolean, found {found}")]
    NotABoolean { found: String },

    #[error("operand kinds do not match: {left} vs {right}")]
    KindMismatch { left: String, right: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative exponent")]
    NegativeExponent,

    #[error("list index out of bounds: {index}")]
    IndexOutOfBounds { index: String },

    #[error("no function named '{name}' found")]
    UndefinedFunction { name: String },

    #[error("program declares no zero-argument 'main'")]
    MissingMain,

    #[error("write failed: {0}")]
    Io(String),

    #[error("converter base must be between 2 and 36, found {base}")]
    InvalidRadix { base: String },
}

/// Aggregates the three stage-specific error types for callers that want a
/// single error type across the whole pipeline, mirroring the teacher's
/// `InterpretationError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlcError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

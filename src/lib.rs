//! PLC: a small statically-typed imperative language. This crate parses,
//! semantically analyzes, and either interprets or transpiles (to a
//! Java-dialect listing) programs written in it.
//!
//! The pipeline is four stages, each its own module:
//! [lexer] -> [parser] -> [analyzer] -> ([interpreter] | [generator]),
//! sharing the [ast] node types, the [types] type lattice, and the
//! [scope] nested-binding structure.

pub mod analyzer;
pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod generator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod token;
pub mod types;
pub mod value;

/// The type returned by functions spanning more than one pipeline stage.
/// Individual stages return their own specific error type
/// ([error::ParseError], [error::AnalysisError], [error::RuntimeError]);
/// this alias is for callers that want to `?` across stage boundaries.
pub type Result<T> = std::result::Result<T, error::PlcError>;

/// Re-exports the items most callers reach for first.
pub mod prelude {
    pub use crate::analyzer::{analyze, AnalyzedProgram};
    pub use crate::diagnostic::Diagnostic;
    pub use crate::error::PlcError;
    pub use crate::interpreter::Interpreter;
    pub use crate::lexer::scan;
    pub use crate::parser::parse;
    pub use crate::value::Value;
}

/// Runs the full `source -> lex -> parse -> analyze` front end, the part
/// every back end needs.
pub fn analyze_source(source: &str) -> Result<analyzer::AnalyzedProgram> {
    let tokens = lexer::scan(source);
    let ast = parser::parse(&tokens)?;
    Ok(analyzer::analyze(ast)?)
}

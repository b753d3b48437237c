//! A small reporting shim used by all four pipeline stages.
//!
//! The teacher's `Parser::error_at` reports straight to `eprintln!`. That's
//! fine for a four-line demo binary, but a host embedding this crate (the
//! `main.rs` smoke-test included) wants to choose where diagnostics land --
//! so [Diagnostic::report] takes an `impl std::io::Write` sink instead of
//! hard-coding stderr.
use std::io;

/// Anything that carries a human-readable message and an optional source
/// offset can be reported through this trait. [crate::error::ParseError],
/// [crate::error::AnalysisError], and [crate::error::RuntimeError] all
/// implement it.
pub trait Diagnostic {
    fn message(&self) -> String;
    fn offset(&self) -> Option<usize>;

    /// Writes a single line: `error: <message>` or `error at byte <n>:
    /// <message>` when an offset is known.
    fn report(&self, sink: &mut impl io::Write) -> io::Result<()> {
        match self.offset() {
            Some(offset) => writeln!(sink, "error at byte {offset}: {}", self.message()),
            None => writeln!(sink, "error: {}", self.message()),
        }
    }
}

impl Diagnostic for crate::error::ParseError {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn offset(&self) -> Option<usize> {
        Some(self.offset)
    }
}

impl Diagnostic for crate::error::AnalysisError {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn offset(&self) -> Option<usize> {
        self.offset
    }
}

impl Diagnostic for crate::error::RuntimeError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn offset(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{AnalysisError, ParseError};

    #[test]
    fn reports_offset_when_present() {
        let mut buf = Vec::new();
        ParseError::new("unexpected token", 12).report(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "error at byte 12: unexpected token\n");
    }

    #[test]
    fn reports_without_offset() {
        let mut buf = Vec::new();
        AnalysisError::new("missing main").report(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "error: missing main\n");
    }
}

//! Error-related types.
//!
//! Three kinds of error can interrupt the pipeline: a [`LexError`] (no token kind
//! matched at the current position), a [`SyntaxError`] (the parser expected a token
//! of some kind/family but saw another), and a [`SemanticError`] (a rule rejected a
//! field). All three carry enough context to format the `Error[line=<n>,pos=<col>]: <msg>.`
//! diagnostic the language's tooling has always produced.

use std::fmt;

use thiserror::Error;

/// Where in the original text an error occurred.
///
/// `Eof` corresponds to the synthetic `ENDMARKER` token: there is no column to
/// point at, so the caller gets `pos=EOF` instead of a number.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Position {
    At { line: usize, column: usize },
    Eof { line: usize },
}

impl Position {
    pub fn line(&self) -> usize {
        match self {
            Position::At { line, .. } | Position::Eof { line } => *line,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::At { line, column } => write!(f, "line={line},pos={column}"),
            Position::Eof { line } => write!(f, "line={line},pos=EOF"),
        }
    }
}

/// Inserts a `[ERR]=>` cursor marker into `line` at byte offset `column`.
///
/// The reference lexer used `(ERR)=>` for illegal-character errors and `[ERR]=>`
/// for every parser error; this crate standardizes on brackets everywhere.
pub fn instrument_line(line: &str, column: usize) -> String {
    let at = column.min(line.len());
    let mut out = String::with_capacity(line.len() + 7);
    out.push_str(&line[..at]);
    out.push_str("[ERR]=>");
    out.push_str(&line[at..]);
    out
}

/// No token kind matched at the current position.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("Error[{position}]: illegal character.")]
pub struct LexError {
    pub position: Position,
    pub instrumented_line: String,
}

/// The parser expected a token of some kind/family but saw another, or a
/// production failed to close (e.g. `STOP` was never reached).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("Error[{position}]: {message}.")]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
    pub suggestion: Option<String>,
    pub instrumented_line: String,
}

/// An [`InvalidDateError`](crate::time::InvalidDateError), carried as plain
/// text so the parser's date-resolution helpers do not have to depend on
/// `chrono`'s error machinery; `DateRule` turns this into a [`SemanticError`]
/// with the field name attached.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{0}")]
pub struct InvalidDateErrorAt(pub String);

/// A semantic rule rejected a field: missing required variable, out-of-range
/// value, forbidden combination, unknown enum member, or unsupported keyword.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The crate-level error, unifying the three error kinds behind one type so
/// callers can match a single `Result<Message, Error>`.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruments_at_the_right_offset() {
        assert_eq!(instrument_line("WAVEFORMX", 9), "WAVEFORMX[ERR]=>");
        assert_eq!(instrument_line("WAVEFORMX", 0), "[ERR]=>WAVEFORMX");
    }

    #[test]
    fn formats_eof_position() {
        let err = SyntaxError {
            position: Position::Eof { line: 3 },
            message: "expected STOP".into(),
            suggestion: None,
            instrumented_line: String::new(),
        };
        assert_eq!(err.to_string(), "Error[line=3,pos=EOF]: expected STOP.");
    }
}

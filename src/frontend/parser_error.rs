use crate::lang::LineNumber;
use thiserror::Error;

/// A fatal parse error.
///
/// `source_line` is the 1-based line of the source text, which differs from
/// the program's own line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{source_line}: expected a line number")]
    MissingLineNumber { source_line: usize },

    #[error("{source_line}: invalid line number '{text}'")]
    InvalidLineNumber { source_line: usize, text: String },

    #[error(
        "{source_line}: duplicate line number {number} (first defined on source line {first_source_line})"
    )]
    DuplicateLineNumber {
        number: LineNumber,
        source_line: usize,
        first_source_line: usize,
    },

    #[error("{source_line}: unterminated task hint on line {number}, expected ')'")]
    UnterminatedHint {
        number: LineNumber,
        source_line: usize,
    },

    #[error("empty program: no numbered lines")]
    EmptyProgram,
}

impl ParseError {
    /// Source text line the error points at, if any.
    pub fn source_line(&self) -> Option<usize> {
        match self {
            ParseError::MissingLineNumber { source_line }
            | ParseError::InvalidLineNumber { source_line, .. }
            | ParseError::DuplicateLineNumber { source_line, .. }
            | ParseError::UnterminatedHint { source_line, .. } => Some(*source_line),
            ParseError::EmptyProgram => None,
        }
    }
}

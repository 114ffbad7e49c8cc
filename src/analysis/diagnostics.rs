use crate::analysis::cfg::EdgeKind;
use crate::lang::LineNumber;
use thiserror::Error;

/// A fatal static validation error.
///
/// Validation never stops at the first error; callers receive every
/// violation in the program at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("line {line}: {kind} target {target} does not exist")]
    UnresolvedTarget {
        line: LineNumber,
        target: LineNumber,
        kind: EdgeKind,
    },

    #[error("line {line}: {kind} target {target} is not a valid line number")]
    TargetOutOfRange {
        line: LineNumber,
        target: u64,
        kind: EdgeKind,
    },

    #[error(
        "line {line}: ambiguous control transfer ({})\n  hint: split the transfers onto separate lines",
        .cues.join(", ")
    )]
    AmbiguousControl { line: LineNumber, cues: Vec<String> },
}

impl ValidationError {
    /// The program line the error is reported on.
    pub fn line(&self) -> LineNumber {
        match self {
            ValidationError::UnresolvedTarget { line, .. }
            | ValidationError::TargetOutOfRange { line, .. }
            | ValidationError::AmbiguousControl { line, .. } => *line,
        }
    }
}

/// A non-fatal static diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A `return` that no `call` can statically reach. Hitting it at run time
    /// with an empty call stack is still fatal.
    UnreachableReturn { line: LineNumber },
}

impl Warning {
    pub fn line(&self) -> LineNumber {
        match self {
            Warning::UnreachableReturn { line } => *line,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnreachableReturn { line } => write!(
                f,
                "warning: line {}: return is not reachable from any call\n  hint: executing it will fail with an unbalanced return",
                line
            ),
        }
    }
}

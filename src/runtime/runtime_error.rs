use crate::lang::LineNumber;
use crate::runtime::state::LineTarget;
use thiserror::Error;

/// A fatal run-time error. None of these can be caught by `on error goto`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("runtime error: line {line}: return with an empty call stack")]
    UnbalancedReturn { line: LineNumber },

    #[error("runtime error: line {line}: unhandled fault: {message}")]
    UnhandledFault { line: LineNumber, message: String },

    #[error("runtime error: transfer from line {from} to missing line {target}")]
    UnknownLine {
        from: LineNumber,
        target: LineNumber,
    },

    #[error("runtime error: execution step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    #[error(
        "runtime error: line {line}: call depth limit exceeded ({limit}) - possible infinite recursion"
    )]
    CallDepthExceeded { line: LineNumber, limit: usize },

    #[error("runtime error: line {line}: '{operation}' needs dispatch mode")]
    TransitionInLinearMode {
        line: LineNumber,
        operation: &'static str,
    },
}

/// Fatal error plus the state the machine stopped in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}\n  call stack: {}", format_frames(.call_stack))]
pub struct RuntimeFailure {
    pub error: RuntimeError,
    /// Lines executed before the failure, in order.
    pub visited: Vec<LineNumber>,
    /// Return addresses, bottom to top.
    pub call_stack: Vec<LineTarget>,
}

fn format_frames(frames: &[LineTarget]) -> String {
    if frames.is_empty() {
        return "(empty)".to_string();
    }
    frames
        .iter()
        .rev()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" <- ")
}

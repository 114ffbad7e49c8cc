use crate::analysis::cfg::ControlFlowGraph;
use serde::{Deserialize, Serialize};

/// Whole-program execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchMode {
    /// Blocks run in program order with no program counter, call stack or
    /// error-handler state.
    Linear,
    /// A program-counter loop over line blocks.
    Dispatch,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Linear => write!(f, "linear"),
            DispatchMode::Dispatch => write!(f, "dispatch"),
        }
    }
}

/// Selects the mode for the entire program.
///
/// Every edge is a jump, conditional jump, call or error-handler update, so
/// a single edge anywhere forces `Dispatch`. There is no per-line mixing.
pub fn select_mode(graph: &ControlFlowGraph) -> DispatchMode {
    if graph.is_empty() {
        DispatchMode::Linear
    } else {
        DispatchMode::Dispatch
    }
}

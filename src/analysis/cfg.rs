//! Control-flow graph construction and validation.
//!
//! # Rules
//!
//! 1. **Static edges** - every jump, conditional jump, call and error-handler
//!    update produces one edge from its line to its target.
//! 2. **No edge for fallthrough or return** - their destinations are the
//!    program order and the run-time call stack respectively.
//! 3. **Exhaustive validation** - all unresolved targets are reported together.
//! 4. **Return reachability** - a `return` no call can reach is a warning, not
//!    an error.

use std::collections::{HashSet, VecDeque};

use crate::analysis::diagnostics::{ValidationError, Warning};
use crate::lang::{ClassifiedLine, ControlShape, LineNumber, Program};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kind of a static control edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Jump,
    ConditionalJump,
    Call,
    ErrorHandler,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EdgeKind::Jump => "goto",
            EdgeKind::ConditionalJump => "conditional goto",
            EdgeKind::Call => "call",
            EdgeKind::ErrorHandler => "error handler",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: LineNumber,
    pub to: LineNumber,
    pub kind: EdgeKind,
}

/// Static control edges of a program, in program order of their source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFlowGraph {
    edges: Vec<Edge>,
}

impl ControlFlowGraph {
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges_from(&self, line: LineNumber) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.from == line)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

/// Validated graph plus the non-fatal findings.
#[derive(Debug, Clone)]
pub struct CfgAnalysis {
    pub graph: ControlFlowGraph,
    pub warnings: Vec<Warning>,
}

/// Builds and validates the control-flow graph.
///
/// `classified` must hold one entry per program line, in program order.
///
/// # Errors
/// Every edge whose target is not a line of `program`, as
/// `ValidationError::UnresolvedTarget`.
pub fn build(
    program: &Program,
    classified: &[ClassifiedLine],
) -> Result<CfgAnalysis, Vec<ValidationError>> {
    let mut edges = Vec::new();

    for c in classified {
        if let Some(target) = c.error_handler_update {
            edges.push(Edge {
                from: c.number,
                to: target,
                kind: EdgeKind::ErrorHandler,
            });
        }

        let kind = match &c.shape {
            ControlShape::UnconditionalJump { .. } => EdgeKind::Jump,
            ControlShape::ConditionalJump { .. } => EdgeKind::ConditionalJump,
            ControlShape::Call { .. } => EdgeKind::Call,
            ControlShape::Fallthrough | ControlShape::Return => continue,
        };

        if let Some(target) = c.shape.target() {
            edges.push(Edge {
                from: c.number,
                to: target,
                kind,
            });
        }
    }

    let errors: Vec<ValidationError> = edges
        .iter()
        .filter(|e| !program.contains(e.to))
        .map(|e| ValidationError::UnresolvedTarget {
            line: e.from,
            target: e.to,
            kind: e.kind,
        })
        .collect();

    if !errors.is_empty() {
        return Err(errors);
    }

    let graph = ControlFlowGraph { edges };
    let warnings = unreachable_returns(program, classified, &graph);

    for w in &warnings {
        warn!(line = w.line(), "return not reachable from any call");
    }
    debug!(edges = graph.edges.len(), warnings = warnings.len(), "control-flow graph built");

    Ok(CfgAnalysis { graph, warnings })
}

/// Finds `return` lines no call target can reach.
///
/// Walks forward from every call target. A call site continues at its
/// program-order successor (the callee returns there); a jump follows its
/// target; an error-handler update also reaches its handler, since a fault
/// inside a subroutine lands there with the caller's frame still pushed.
fn unreachable_returns(
    program: &Program,
    classified: &[ClassifiedLine],
    graph: &ControlFlowGraph,
) -> Vec<Warning> {
    let shapes: IndexMap<LineNumber, &ClassifiedLine> =
        classified.iter().map(|c| (c.number, c)).collect();

    let mut seen: HashSet<LineNumber> = HashSet::new();
    let mut queue: VecDeque<LineNumber> = graph
        .edges_of_kind(EdgeKind::Call)
        .map(|e| e.to)
        .collect();

    while let Some(line) = queue.pop_front() {
        if !seen.insert(line) {
            continue;
        }
        let Some(c) = shapes.get(&line) else {
            continue;
        };

        let successor = program.successor(line);
        let mut next: Vec<LineNumber> = Vec::new();

        match &c.shape {
            ControlShape::Fallthrough | ControlShape::Call { .. } => next.extend(successor),
            ControlShape::UnconditionalJump { target } => next.push(*target),
            ControlShape::ConditionalJump { target, .. } => {
                next.push(*target);
                next.extend(successor);
            }
            ControlShape::Return => {}
        }
        next.extend(c.error_handler_update);

        queue.extend(next.into_iter().filter(|n| !seen.contains(n)));
    }

    classified
        .iter()
        .filter(|c| c.shape == ControlShape::Return && !seen.contains(&c.number))
        .map(|c| Warning::UnreachableReturn { line: c.number })
        .collect()
}

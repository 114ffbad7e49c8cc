//! Run-time control state of an emitted program.
//!
//! These are the program counter, call stack and error-handler registers
//! every line block can see. They exist only in dispatch mode.

use crate::lang::LineNumber;

/// Where control goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTarget {
    Line(LineNumber),
    Halt,
}

impl From<Option<LineNumber>> for LineTarget {
    /// `None` (no successor) means halt.
    fn from(line: Option<LineNumber>) -> Self {
        match line {
            Some(n) => LineTarget::Line(n),
            None => LineTarget::Halt,
        }
    }
}

impl std::fmt::Display for LineTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineTarget::Line(n) => write!(f, "{}", n),
            LineTarget::Halt => write!(f, "halt"),
        }
    }
}

/// LIFO stack of return addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<LineTarget>,
}

impl CallStack {
    pub fn push(&mut self, return_to: LineTarget) {
        self.frames.push(return_to);
    }

    pub fn pop(&mut self) -> Option<LineTarget> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from the bottom of the stack to the top.
    pub fn frames(&self) -> &[LineTarget] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// The active `on error goto` target, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorHandlerState {
    active: Option<LineNumber>,
}

impl ErrorHandlerState {
    /// Replaces the active handler. Setting the same target twice is a no-op.
    pub fn set(&mut self, target: LineNumber) {
        self.active = Some(target);
    }

    pub fn active(&self) -> Option<LineNumber> {
        self.active
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}

/// A run-time fault raised by a line block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The last routed fault, readable by the handler and every later line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultInfo {
    pub fault: Fault,
    pub line: LineNumber,
}

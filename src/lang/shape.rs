use super::line::LineNumber;
use serde::{Deserialize, Serialize};

/// Control-transfer kind of a single line.
///
/// Exactly one shape is assigned per line. Setting the error handler is not a
/// shape; it lives on [`ClassifiedLine::error_handler_update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlShape {
    /// Continue with the next line in program order.
    Fallthrough,

    /// `goto <n>`, `jump to [line] <n>`.
    UnconditionalJump { target: LineNumber },

    /// `if <cond> goto <n>`. Falls through when the predicate is false.
    ///
    /// `predicate` is the verbatim condition text; it is never interpreted
    /// here, only forwarded to the translator.
    ConditionalJump {
        target: LineNumber,
        predicate: String,
    },

    /// `call <n>` / `gosub <n>`.
    Call { target: LineNumber },

    /// `return`. The destination comes from the call stack at run time.
    Return,
}

impl ControlShape {
    /// Static target of this shape, if it has one.
    pub fn target(&self) -> Option<LineNumber> {
        match self {
            ControlShape::UnconditionalJump { target }
            | ControlShape::ConditionalJump { target, .. }
            | ControlShape::Call { target } => Some(*target),
            ControlShape::Fallthrough | ControlShape::Return => None,
        }
    }

    /// Whether execution can continue with the program-order successor.
    pub fn falls_through(&self) -> bool {
        matches!(
            self,
            ControlShape::Fallthrough | ControlShape::ConditionalJump { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlShape::Fallthrough => "fallthrough",
            ControlShape::UnconditionalJump { .. } => "goto",
            ControlShape::ConditionalJump { .. } => "if-goto",
            ControlShape::Call { .. } => "call",
            ControlShape::Return => "return",
        }
    }
}

impl std::fmt::Display for ControlShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlShape::Fallthrough => write!(f, "fallthrough"),
            ControlShape::UnconditionalJump { target } => write!(f, "goto {}", target),
            ControlShape::ConditionalJump { target, predicate } => {
                write!(f, "if ({}) goto {}", predicate, target)
            }
            ControlShape::Call { target } => write!(f, "call {}", target),
            ControlShape::Return => write!(f, "return"),
        }
    }
}

/// Classifier output for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub number: LineNumber,
    pub shape: ControlShape,

    /// Target installed by `on error goto <n>`, if the line carries one.
    pub error_handler_update: Option<LineNumber>,
}

impl ClassifiedLine {
    pub fn fallthrough(number: LineNumber) -> Self {
        ClassifiedLine {
            number,
            shape: ControlShape::Fallthrough,
            error_handler_update: None,
        }
    }
}

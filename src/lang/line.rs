use serde::{Deserialize, Serialize};

/// Positive line number. Zero is rejected by the parser.
pub type LineNumber = u32;

/// One numbered source line.
///
/// Lines are created by the parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub number: LineNumber,

    /// Normalized task-type hint, e.g. `redis` from `10 (Redis) ...`.
    ///
    /// `None` means "auto-detect downstream".
    pub task_hint: Option<String>,

    /// Instruction text with the number and hint stripped.
    pub text: String,
}

impl Line {
    pub fn new(number: LineNumber, task_hint: Option<&str>, text: &str) -> Self {
        Line {
            number,
            task_hint: task_hint.map(|h| h.to_string()),
            text: text.to_string(),
        }
    }
}

impl std::fmt::Display for Line {
    /// Formats the line back into source syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number)?;
        if let Some(hint) = &self.task_hint {
            write!(f, " ({})", hint)?;
        }
        if !self.text.is_empty() {
            write!(f, " {}", self.text)?;
        }
        Ok(())
    }
}

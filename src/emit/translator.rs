//! The translator seam.
//!
//! Translating a line's natural-language text into target statements is the
//! job of an external, non-deterministic collaborator (an LLM behind some
//! client). The compiler only depends on the [`Translator`] trait; the
//! deterministic [`EchoTranslator`] stands in for it in tests and dry runs.

use std::time::Duration;

use crate::analysis::{DispatchMode, InitRequirement, ModuleContextEntry};
use crate::lang::{ControlShape, Line, LineNumber};
use thiserror::Error;

/// Program-wide context shared by every request of one compilation.
///
/// Opaque to the compiler core; translators use it to keep names and
/// handles consistent across lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramContext {
    pub mode: DispatchMode,
    pub entry: LineNumber,
    pub lines: Vec<LineNumber>,
    pub resources: Vec<ModuleContextEntry>,
}

/// One line's translation request.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub line: &'a Line,
    pub control_shape: &'a ControlShape,
    pub error_handler_update: Option<LineNumber>,
    pub init_requirement: &'a InitRequirement,

    /// Program-order successor, the implicit next line of the block.
    pub successor: Option<LineNumber>,

    pub program_context: &'a ProgramContext,
}

impl TranslationRequest<'_> {
    pub fn mode(&self) -> DispatchMode {
        self.program_context.mode
    }
}

/// Target-language statements for one line, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    pub statements: Vec<String>,
}

impl Translation {
    pub fn new(statements: Vec<String>) -> Self {
        Translation { statements }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("translation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed translation: {0}")]
    Malformed(String),

    #[error("translator unavailable: {0}")]
    Unavailable(String),
}

/// Converts one line plus context into target statements.
///
/// Requests for different lines are independent and may be issued
/// concurrently, hence `Sync`. In dispatch mode the output must also set the
/// next-line register consistently with the line's control shape.
pub trait Translator: Sync {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<Translation, TranslateError>;
}

/// Deterministic translator that echoes the request as neutral pseudo-code.
///
/// Output per line: the resource acquisition or reference, the
/// error-handler installation, the instruction as a comment, then the
/// control transfer (dispatch mode only).
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTranslator;

impl Translator for EchoTranslator {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<Translation, TranslateError> {
        let mut statements = Vec::new();

        match request.init_requirement {
            InitRequirement::FirstUse { resource_key } => {
                statements.push(format!("{} = acquire(\"{}\")", resource_key, resource_key))
            }
            InitRequirement::Reuse { resource_key } => {
                statements.push(format!("use {}", resource_key))
            }
            InitRequirement::None => {}
        }

        if let Some(handler) = request.error_handler_update {
            statements.push(format!("on_error = {}", handler));
        }

        if !request.line.text.is_empty() {
            statements.push(format!("# {}", request.line.text));
        }

        if request.mode() == DispatchMode::Dispatch {
            match request.control_shape {
                ControlShape::Fallthrough => {}
                ControlShape::UnconditionalJump { target } => {
                    statements.push(format!("next_line = {}", target))
                }
                ControlShape::ConditionalJump { target, predicate } => {
                    statements.push(format!("if ({}): next_line = {}", predicate, target))
                }
                ControlShape::Call { target } => statements.push(format!("call {}", target)),
                ControlShape::Return => statements.push("return".to_string()),
            }
        } else if *request.control_shape == ControlShape::Return {
            statements.push("fail(\"unbalanced return\")".to_string());
        }

        if statements.is_empty() {
            statements.push("pass".to_string());
        }

        Ok(Translation::new(statements))
    }
}

use std::collections::HashSet;

use crate::emit::ir::EmittedBlock;
use crate::lang::{ControlShape, LineNumber};
use crate::runtime::machine::{BlockExecutor, LineContext};
use crate::runtime::state::Fault;

type Predicate = Box<dyn FnMut(LineNumber, &str) -> bool>;

/// Executes a block by its control shape alone.
///
/// Conditional jumps ask the predicate, which sees the line number and the
/// condition text. Lines registered with [`ShapeExecutor::fail_once`] raise a
/// fault the first time they run, after their handler update is applied.
pub struct ShapeExecutor {
    predicate: Predicate,
    pending_faults: HashSet<LineNumber>,
}

impl Default for ShapeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeExecutor {
    /// Every condition is false.
    pub fn new() -> Self {
        ShapeExecutor {
            predicate: Box::new(|_, _| false),
            pending_faults: HashSet::new(),
        }
    }

    pub fn with_predicate(predicate: impl FnMut(LineNumber, &str) -> bool + 'static) -> Self {
        ShapeExecutor {
            predicate: Box::new(predicate),
            pending_faults: HashSet::new(),
        }
    }

    /// Takes the set of conditional lines whose jump is taken.
    pub fn taking(lines: impl IntoIterator<Item = LineNumber>) -> Self {
        let taken: HashSet<LineNumber> = lines.into_iter().collect();
        Self::with_predicate(move |line, _| taken.contains(&line))
    }

    pub fn fail_once(mut self, line: LineNumber) -> Self {
        self.pending_faults.insert(line);
        self
    }
}

impl BlockExecutor for ShapeExecutor {
    fn execute(&mut self, block: &EmittedBlock, ctx: &mut LineContext<'_>) -> Result<(), Fault> {
        let line = block.number();

        if let Some(handler) = block.error_handler_update {
            ctx.set_error_handler(handler);
        }

        if self.pending_faults.remove(&line) {
            return Err(Fault::new(format!("injected fault at line {}", line)));
        }

        match &block.shape {
            ControlShape::Fallthrough => {}
            ControlShape::UnconditionalJump { target } => ctx.jump(*target),
            ControlShape::ConditionalJump { target, predicate } => {
                if (self.predicate)(line, predicate) {
                    ctx.jump(*target);
                }
            }
            ControlShape::Call { target } => ctx.call(*target),
            ControlShape::Return => ctx.ret(),
        }

        Ok(())
    }
}

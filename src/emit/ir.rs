use crate::analysis::{DispatchMode, InitRequirement, ModuleContextEntry};
use crate::lang::{ControlShape, Line, LineNumber};
use serde::{Deserialize, Serialize};

/// A compiled program: translated line blocks in program order.
///
/// This is the assembled output of a compilation and the unit the runtime
/// machine executes. It is written to disk as a postcard artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedProgram {
    pub mode: DispatchMode,

    /// Resources in initialization order.
    pub resources: Vec<ModuleContextEntry>,

    /// Line blocks, sorted by line number.
    pub blocks: Vec<EmittedBlock>,
}

/// The emitted unit of one source line. Single entry, single exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedBlock {
    pub line: Line,
    pub shape: ControlShape,
    pub error_handler_update: Option<LineNumber>,
    pub init: InitRequirement,

    /// Translator output, in the order it must execute.
    pub statements: Vec<String>,
}

impl EmittedBlock {
    pub fn number(&self) -> LineNumber {
        self.line.number
    }
}

impl EmittedProgram {
    pub fn entry(&self) -> Option<LineNumber> {
        self.blocks.first().map(|b| b.number())
    }

    pub fn index_of(&self, line: LineNumber) -> Option<usize> {
        self.blocks.binary_search_by_key(&line, |b| b.number()).ok()
    }

    pub fn block(&self, line: LineNumber) -> Option<&EmittedBlock> {
        self.index_of(line).map(|i| &self.blocks[i])
    }

    /// Program-order successor of `line`.
    pub fn successor(&self, line: LineNumber) -> Option<LineNumber> {
        let i = self.index_of(line)?;
        self.blocks.get(i + 1).map(|b| b.number())
    }

    /// Serializes into the compact binary artifact format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

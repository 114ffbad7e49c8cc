//! Front end of a line-numbered instruction transpiler.
//!
//! Source lines are parsed, classified by their control cues, checked as a
//! control-flow graph and handed line by line to a [`emit::Translator`]. The
//! result is an [`emit::EmittedProgram`] that runs either straight through or
//! under a program-counter dispatch loop (see [`runtime::Machine`]).

pub mod analysis;
pub mod emit;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use emit::{Compilation, CompileError, CompileOptions, Compiler};

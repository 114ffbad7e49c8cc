//! # Line program model
//!
//! This module defines the intermediate representation produced by the line
//! parser and consumed by every later pass.
//!
//! ## Conventions
//!
//! - A program is ordered by ascending line number, regardless of the order
//!   the lines appeared in the source text.
//! - Instruction text is opaque natural language. Only control-transfer cues
//!   are ever extracted from it.

pub mod line;
pub mod program;
pub mod shape;

pub use line::{Line, LineNumber};
pub use program::Program;
pub use shape::{ClassifiedLine, ControlShape};

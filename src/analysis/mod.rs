//! Static passes over a parsed [`Program`](crate::lang::Program):
//! classification, control-flow validation, dispatch-mode selection and
//! resource tracking.

pub mod cfg;
pub mod classify;
pub mod diagnostics;
pub mod dispatch;
pub mod resources;

pub use cfg::{CfgAnalysis, ControlFlowGraph, Edge, EdgeKind};
pub use diagnostics::{ValidationError, Warning};
pub use dispatch::{DispatchMode, select_mode};
pub use resources::{InitRequirement, ModuleContext, ModuleContextEntry, ResourceTable};

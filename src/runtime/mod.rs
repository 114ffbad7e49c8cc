pub mod machine;
pub mod runtime_error;
pub mod shape_executor;
pub mod state;

pub use machine::{BlockExecutor, ExecutionTrace, LineContext, Machine, MachineConfig};
pub use runtime_error::{RuntimeError, RuntimeFailure};
pub use shape_executor::ShapeExecutor;
pub use state::{CallStack, ErrorHandlerState, Fault, FaultInfo, LineTarget};

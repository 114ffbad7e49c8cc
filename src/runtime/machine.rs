use crate::analysis::DispatchMode;
use crate::emit::ir::{EmittedBlock, EmittedProgram};
use crate::lang::LineNumber;
use crate::runtime::runtime_error::{RuntimeError, RuntimeFailure};
use crate::runtime::state::{CallStack, ErrorHandlerState, Fault, FaultInfo, LineTarget};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub max_steps: Option<usize>,
    pub max_call_depth: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            max_steps: Some(1_000_000),
            max_call_depth: 1000,
        }
    }
}

/// Executes one line block.
///
/// Implementations perform the line's work and report control transfers
/// through the [`LineContext`]. Returning `Err` raises a run-time fault.
pub trait BlockExecutor {
    fn execute(&mut self, block: &EmittedBlock, ctx: &mut LineContext<'_>) -> Result<(), Fault>;
}

impl<F> BlockExecutor for F
where
    F: FnMut(&EmittedBlock, &mut LineContext<'_>) -> Result<(), Fault>,
{
    fn execute(&mut self, block: &EmittedBlock, ctx: &mut LineContext<'_>) -> Result<(), Fault> {
        self(block, ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Jump(LineNumber),
    Call(LineNumber),
    Return,
}

/// The run-time state a line block sees while it executes.
///
/// A block sets at most one next line; a later transfer call replaces an
/// earlier one. In linear mode there is no dispatch state, so `jump`, `call`
/// and `set_error_handler` are errors.
pub struct LineContext<'m> {
    line: LineNumber,
    mode: DispatchMode,
    call_stack: &'m CallStack,
    error_handler: Option<&'m mut ErrorHandlerState>,
    last_fault: Option<&'m FaultInfo>,
    transfer: Option<Transfer>,
    violation: Option<&'static str>,
}

impl LineContext<'_> {
    pub fn line(&self) -> LineNumber {
        self.line
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn jump(&mut self, target: LineNumber) {
        self.transfer_to(Transfer::Jump(target), "goto");
    }

    /// Calls `target`; the program-order successor becomes the return address.
    pub fn call(&mut self, target: LineNumber) {
        self.transfer_to(Transfer::Call(target), "call");
    }

    pub fn ret(&mut self) {
        self.transfer = Some(Transfer::Return);
    }

    pub fn set_error_handler(&mut self, target: LineNumber) {
        match self.error_handler.as_deref_mut() {
            Some(handler) => handler.set(target),
            None => {
                self.violation.get_or_insert("on error goto");
            }
        }
    }

    pub fn error_handler(&self) -> Option<LineNumber> {
        self.error_handler.as_deref().and_then(|h| h.active())
    }

    /// The last fault routed to a handler.
    pub fn fault(&self) -> Option<&Fault> {
        self.last_fault.map(|f| &f.fault)
    }

    /// Line the last routed fault happened on.
    pub fn fault_line(&self) -> Option<LineNumber> {
        self.last_fault.map(|f| f.line)
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    fn transfer_to(&mut self, transfer: Transfer, operation: &'static str) {
        match self.mode {
            DispatchMode::Dispatch => self.transfer = Some(transfer),
            DispatchMode::Linear => {
                self.violation.get_or_insert(operation);
            }
        }
    }
}

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub mode: DispatchMode,
    /// Lines in execution order, repeats included.
    pub visited: Vec<LineNumber>,
    pub steps: usize,
    pub error_handler: Option<LineNumber>,
    pub last_fault: Option<FaultInfo>,
}

/// Reference interpreter for emitted programs.
///
/// In dispatch mode it runs the program-counter loop: after each block the
/// next line is the block's explicit transfer if it made one, otherwise the
/// program-order successor, or halt after the last line. Faults go to the
/// active error handler when there is one and are fatal otherwise.
///
/// In linear mode blocks simply run in order.
pub struct Machine {
    config: MachineConfig,
    call_stack: CallStack,
    error_handler: ErrorHandlerState,
    last_fault: Option<FaultInfo>,
    steps: usize,
    visited: Vec<LineNumber>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Machine {
            config,
            call_stack: CallStack::default(),
            error_handler: ErrorHandlerState::default(),
            last_fault: None,
            steps: 0,
            visited: Vec::new(),
        }
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn error_handler(&self) -> &ErrorHandlerState {
        &self.error_handler
    }

    pub fn reset_execution_state(&mut self) {
        self.call_stack.clear();
        self.error_handler.clear();
        self.last_fault = None;
        self.steps = 0;
        self.visited.clear();
    }

    pub fn run<E>(
        &mut self,
        program: &EmittedProgram,
        executor: &mut E,
    ) -> Result<ExecutionTrace, RuntimeFailure>
    where
        E: BlockExecutor + ?Sized,
    {
        self.reset_execution_state();

        let result = match program.mode {
            DispatchMode::Linear => self.run_linear(program, executor),
            DispatchMode::Dispatch => self.run_dispatch(program, executor),
        };

        match result {
            Ok(()) => {
                debug!(steps = self.steps, "program halted");
                Ok(ExecutionTrace {
                    mode: program.mode,
                    visited: self.visited.clone(),
                    steps: self.steps,
                    error_handler: self.error_handler.active(),
                    last_fault: self.last_fault.clone(),
                })
            }
            Err(error) => {
                debug!(%error, steps = self.steps, "program failed");
                Err(RuntimeFailure {
                    error,
                    visited: self.visited.clone(),
                    call_stack: self.call_stack.frames().to_vec(),
                })
            }
        }
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::StepLimitExceeded { limit: max });
            }
        }

        Ok(())
    }

    fn run_linear<E>(&mut self, program: &EmittedProgram, executor: &mut E) -> Result<(), RuntimeError>
    where
        E: BlockExecutor + ?Sized,
    {
        let no_frames = CallStack::default();

        for block in &program.blocks {
            self.check_limits()?;

            let line = block.number();
            self.visited.push(line);

            let mut ctx = LineContext {
                line,
                mode: DispatchMode::Linear,
                call_stack: &no_frames,
                error_handler: None,
                last_fault: None,
                transfer: None,
                violation: None,
            };
            let outcome = executor.execute(block, &mut ctx);

            if let Some(operation) = ctx.violation {
                return Err(RuntimeError::TransitionInLinearMode { line, operation });
            }
            if let Err(fault) = outcome {
                return Err(RuntimeError::UnhandledFault {
                    line,
                    message: fault.message,
                });
            }
            if ctx.transfer == Some(Transfer::Return) {
                return Err(RuntimeError::UnbalancedReturn { line });
            }
        }

        Ok(())
    }

    fn run_dispatch<E>(
        &mut self,
        program: &EmittedProgram,
        executor: &mut E,
    ) -> Result<(), RuntimeError>
    where
        E: BlockExecutor + ?Sized,
    {
        let mut pc = LineTarget::from(program.entry());
        let mut previous: Option<LineNumber> = None;

        while let LineTarget::Line(line) = pc {
            self.check_limits()?;

            let Some(index) = program.index_of(line) else {
                return Err(RuntimeError::UnknownLine {
                    from: previous.unwrap_or(line),
                    target: line,
                });
            };
            let block = &program.blocks[index];
            let successor = LineTarget::from(program.blocks.get(index + 1).map(|b| b.number()));

            self.visited.push(line);
            previous = Some(line);

            let handler_before = self.error_handler.active();
            let mut ctx = LineContext {
                line,
                mode: DispatchMode::Dispatch,
                call_stack: &self.call_stack,
                error_handler: Some(&mut self.error_handler),
                last_fault: self.last_fault.as_ref(),
                transfer: None,
                violation: None,
            };
            let outcome = executor.execute(block, &mut ctx);
            let transfer = ctx.transfer;

            // a new handler retires the previously published fault
            if self.error_handler.active() != handler_before {
                self.last_fault = None;
            }

            if let Err(fault) = outcome {
                let Some(handler) = self.error_handler.active() else {
                    return Err(RuntimeError::UnhandledFault {
                        line,
                        message: fault.message,
                    });
                };
                debug!(line, handler, fault = %fault, "fault routed to handler");
                self.last_fault = Some(FaultInfo { fault, line });
                pc = LineTarget::Line(handler);
                continue;
            }

            pc = match transfer {
                None => successor,
                Some(Transfer::Jump(target)) => LineTarget::Line(target),
                Some(Transfer::Call(target)) => {
                    if self.call_stack.depth() >= self.config.max_call_depth {
                        return Err(RuntimeError::CallDepthExceeded {
                            line,
                            limit: self.config.max_call_depth,
                        });
                    }
                    self.call_stack.push(successor);
                    LineTarget::Line(target)
                }
                Some(Transfer::Return) => self
                    .call_stack
                    .pop()
                    .ok_or(RuntimeError::UnbalancedReturn { line })?,
            };

            trace!(line, next = %pc, depth = self.call_stack.depth(), "step");
        }

        Ok(())
    }
}

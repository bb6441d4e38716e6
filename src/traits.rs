//! Tracer, world-state and processing traits
//!
//! This module provides traits for:
//! - Consuming the execution event protocol (`ExecutionTracer`)
//! - Reading world state without mutating it (`WorldState`)
//! - Producing a finished trace value (`TraceOutput`)
//! - Clearing per-transaction state (`Reset`)
//! - Tracing batches of transactions (`TransactionProcessor`)

use crate::{
    errors::{RuntimeError, TraceError},
    registry::TraceOptions,
    tracers::TxTraceResult,
    types::*,
};

/// Consumer of the execution event protocol
///
/// The VM (or a recorded event stream) calls one method per event, in program
/// order, on a single tracer instance. Every method defaults to a no-op, so a
/// tracer only overrides the events it cares about. An `Err` aborts the trace.
pub trait ExecutionTracer {
    fn on_action_entered(&mut self, _action: &ActionEntered) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_action_exited(&mut self, _exit: &ActionExited) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_action_reverted(&mut self, _revert: &ActionReverted) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_action_errored(&mut self, _error: &ActionErrored) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_operation_started(&mut self, _operation: &OperationStarted) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_operation_gas(&mut self, _gas_remaining: u64) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_operation_error(&mut self, _error: &ErrorKind) -> Result<(), TraceError> {
        Ok(())
    }

    /// `words` is ordered bottom to top
    fn on_stack(&mut self, _words: &[U256]) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_memory(&mut self, _memory: &[u8]) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_storage_accessed(&mut self, _access: &StorageAccessed) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_log(&mut self, _log: &TraceLog) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_refund(&mut self, _amount: u64) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_transaction_settled(&mut self, _outcome: &TransactionSettled) -> Result<(), TraceError> {
        Ok(())
    }

    /// Dispatch a single event to the matching method
    fn handle_event(&mut self, event: &ExecutionEvent) -> Result<(), TraceError> {
        match event {
            ExecutionEvent::ActionEntered(action) => self.on_action_entered(action),
            ExecutionEvent::ActionExited(exit) => self.on_action_exited(exit),
            ExecutionEvent::ActionReverted(revert) => self.on_action_reverted(revert),
            ExecutionEvent::ActionErrored(error) => self.on_action_errored(error),
            ExecutionEvent::OperationStarted(operation) => self.on_operation_started(operation),
            ExecutionEvent::OperationGasReported { gas_remaining } => {
                self.on_operation_gas(*gas_remaining)
            }
            ExecutionEvent::OperationError(error) => self.on_operation_error(error),
            ExecutionEvent::StackSnapshotted(words) => self.on_stack(words),
            ExecutionEvent::MemorySnapshotted(memory) => self.on_memory(memory),
            ExecutionEvent::StorageAccessed(access) => self.on_storage_accessed(access),
            ExecutionEvent::LogEmitted(log) => self.on_log(log),
            ExecutionEvent::RefundReported(amount) => self.on_refund(*amount),
            ExecutionEvent::TransactionSettled(outcome) => self.on_transaction_settled(outcome),
        }
    }

    /// Feed a whole event stream, stopping at the first error
    fn handle_events<'e, I>(&mut self, events: I) -> Result<(), TraceError>
    where
        I: IntoIterator<Item = &'e ExecutionEvent>,
        Self: Sized,
    {
        events
            .into_iter()
            .try_for_each(|event| self.handle_event(event))
    }
}

/// Read-only view of world state consulted by tracers
///
/// Tracers never write through this capability.
pub trait WorldState {
    fn get_balance(&self, address: Address) -> Result<U256, RuntimeError>;

    fn get_nonce(&self, address: Address) -> Result<u64, RuntimeError>;

    fn get_code(&self, address: Address) -> Result<Bytes, RuntimeError>;

    fn get_storage(&self, address: Address, key: B256) -> Result<B256, RuntimeError>;

    fn account_exists(&self, address: Address) -> Result<bool, RuntimeError>;
}

/// Finalizes a tracer into its result value
///
/// Building is side-effect free: calling `get_output` twice on the same
/// tracer state yields identical values.
pub trait TraceOutput {
    type Output;

    fn get_output(&self) -> Result<Self::Output, TraceError>;
}

/// Clears all per-transaction state
pub trait Reset {
    fn reset(&mut self);
}

/// Batch transaction tracing
pub trait TransactionProcessor {
    /// Execute a block of transactions in order, tracing each one selected by
    /// the options' `txHash` filter
    ///
    /// Transactions outside the filter still execute (later ones depend on
    /// their state changes) but produce no entry.
    fn trace_transactions(
        &mut self,
        batch: SimulationBatch,
        options: &TraceOptions,
    ) -> Vec<Result<TxTraceResult, TraceError>>;
}

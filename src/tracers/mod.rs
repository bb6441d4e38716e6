//! Native tracer implementations
//!
//! The set of tracers is closed: `Tracer` is a tagged union over the three
//! built-in variants, and the registry maps names onto its constructors.

pub mod call_stack;
pub mod call_tracer;
pub mod four_byte_tracer;
pub mod operation;
pub mod prestate_tracer;

pub use call_tracer::{CallFrame, CallLog, CallTracer, CallTracerConfig};
pub use four_byte_tracer::{FourByteResult, FourByteTracer};
pub use prestate_tracer::{AccountState, PrestateResult, PrestateTracer};

use crate::{
    errors::TraceError,
    traits::{ExecutionTracer, TraceOutput},
    types::*,
};
use serde::Serialize;

/// One of the built-in tracers
pub enum Tracer<'a> {
    Call(CallTracer),
    Prestate(PrestateTracer<'a>),
    FourByte(FourByteTracer),
}

/// Finished trace of any tracer, serialized without a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TraceResult {
    Call(CallFrame),
    Prestate(PrestateResult),
    FourByte(FourByteResult),
}

/// Trace of one transaction in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxTraceResult {
    pub tx_hash: B256,
    pub result: TraceResult,
}

macro_rules! delegate {
    ($self:ident, $tracer:ident => $call:expr) => {
        match $self {
            Tracer::Call($tracer) => $call,
            Tracer::Prestate($tracer) => $call,
            Tracer::FourByte($tracer) => $call,
        }
    };
}

impl Tracer<'_> {
    /// Registry name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Call(_) => crate::registry::CALL_TRACER,
            Self::Prestate(_) => crate::registry::PRESTATE_TRACER,
            Self::FourByte(_) => crate::registry::FOUR_BYTE_TRACER,
        }
    }

    /// Build the finished trace; the tracer can keep receiving builds
    pub fn build_result(&self) -> Result<TraceResult, TraceError> {
        Ok(match self {
            Self::Call(tracer) => TraceResult::Call(tracer.get_output()?),
            Self::Prestate(tracer) => TraceResult::Prestate(tracer.get_output()?),
            Self::FourByte(tracer) => TraceResult::FourByte(tracer.get_output()?),
        })
    }
}

impl TraceOutput for Tracer<'_> {
    type Output = TraceResult;

    fn get_output(&self) -> Result<TraceResult, TraceError> {
        self.build_result()
    }
}

impl ExecutionTracer for Tracer<'_> {
    fn on_action_entered(&mut self, action: &ActionEntered) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_action_entered(action))
    }

    fn on_action_exited(&mut self, exit: &ActionExited) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_action_exited(exit))
    }

    fn on_action_reverted(&mut self, revert: &ActionReverted) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_action_reverted(revert))
    }

    fn on_action_errored(&mut self, error: &ActionErrored) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_action_errored(error))
    }

    fn on_operation_started(&mut self, operation: &OperationStarted) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_operation_started(operation))
    }

    fn on_operation_gas(&mut self, gas_remaining: u64) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_operation_gas(gas_remaining))
    }

    fn on_operation_error(&mut self, error: &ErrorKind) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_operation_error(error))
    }

    fn on_stack(&mut self, words: &[U256]) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_stack(words))
    }

    fn on_memory(&mut self, memory: &[u8]) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_memory(memory))
    }

    fn on_storage_accessed(&mut self, access: &StorageAccessed) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_storage_accessed(access))
    }

    fn on_log(&mut self, log: &TraceLog) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_log(log))
    }

    fn on_refund(&mut self, amount: u64) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_refund(amount))
    }

    fn on_transaction_settled(&mut self, outcome: &TransactionSettled) -> Result<(), TraceError> {
        delegate!(self, tracer => tracer.on_transaction_settled(outcome))
    }
}

//! Error types for native execution tracing
//!
//! This module defines the error taxonomy of the tracing subsystem:
//! - Configuration errors, reported before any trace begins
//! - Operand decoding errors, recovered locally by the tracers
//! - Runtime errors from the EVM or the world-state view
//! - Event protocol violations, which abort the trace

use alloy::primitives::U256;
use thiserror::Error;

/// Top-level error type for the tracing system
///
/// Every fallible operation in the crate returns this type, so callers only
/// need a single match to classify a failure.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Unknown tracer or malformed options
    #[error("Invalid tracer configuration: {0}")]
    Config(#[from] ConfigError),

    /// A stack or memory operand could not be decoded
    #[error("Failed to decode operand: {0}")]
    Decode(#[from] DecodeError),

    /// Errors occurring during transaction execution or state reads
    #[error("Error during execution: {0}")]
    Runtime(#[from] RuntimeError),

    /// The event source broke the enter/exit nesting contract
    ///
    /// There is no safe recovery from this: the reconstructed call stack no
    /// longer mirrors the VM's, so the trace is aborted.
    #[error("Execution event protocol violation: {0}")]
    ProtocolViolation(String),
}

/// Configuration errors
///
/// Raised while resolving a tracer by name or parsing the options object.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No tracer is registered under the requested name
    #[error("unknown tracer: {0:?}")]
    UnknownTracer(String),

    /// The top-level options object is not valid JSON for `TraceOptions`
    #[error("invalid trace options: {0}")]
    InvalidOptions(String),
}

/// Operand decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A memory range reaches past the end of the snapshot
    #[error("tracer accessed out of bound memory: offset {offset}, end {end}, available {available}")]
    MemoryOutOfBounds {
        offset: usize,
        end: usize,
        available: usize,
    },

    /// A stack word is too large to be used as an offset or length
    #[error("operand {0:#x} does not fit in platform memory addressing")]
    OperandOverflow(U256),

    /// The stack snapshot is shallower than the opcode requires
    #[error("missing stack operand {index} (stack holds {len} items)")]
    MissingOperand { index: usize, len: usize },
}

/// Runtime execution errors
///
/// These errors occur while executing transactions or reading world state.
/// They are distinct from VM-level failures (revert, out of gas), which are
/// recorded inside the trace instead of failing it.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The EVM rejected or failed to run the transaction
    #[error("Transaction execution failed: {0}")]
    ExecutionFailed(String),

    /// Errors accessing account information
    #[error("Account access error: {0}")]
    AccountAccess(String),

    /// Errors accessing storage slots
    #[error("Slot access error: {0}")]
    SlotAccess(String),

    /// A blocking trace task did not complete
    #[error("Trace task failed: {0}")]
    TaskFailed(String),
}

impl TraceError {
    /// Shorthand used by the call-stack reconstructor
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// Whether this error aborted the trace because of broken event ordering
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

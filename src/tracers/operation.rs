//! State of the operation currently being reported

use crate::types::OperationStarted;
use alloy::primitives::Bytes;

/// Opcode and memory of the operation in flight
///
/// Operand-decoding tracers act on `StackSnapshotted`, which arrives after the
/// `OperationStarted` and `MemorySnapshotted` of the same operation.
#[derive(Debug, Clone, Default)]
pub struct PendingOperation {
    pub opcode: Option<u8>,
    pub pc: usize,
    pub depth: usize,
    pub memory: Bytes,
}

impl PendingOperation {
    pub fn begin(&mut self, operation: &OperationStarted) {
        self.opcode = Some(operation.opcode);
        self.pc = operation.pc;
        self.depth = operation.depth;
        self.memory = Bytes::new();
    }

    pub fn set_memory(&mut self, memory: &[u8]) {
        self.memory = Bytes::copy_from_slice(memory);
    }

    /// Drop the in-flight operation once its stack has been consumed
    pub fn finish(&mut self) -> Option<u8> {
        self.memory = Bytes::new();
        self.opcode.take()
    }
}

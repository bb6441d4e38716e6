//! Function selector histogram (`4byteTracer`)
//!
//! Counts `selector-size` pairs for the top-level call and for every internal
//! call opcode. Internal calls are decoded from the opcode's own stack and
//! memory operands rather than from action events, so calls the VM later
//! rejects (depth limit, insufficient gas) are counted too.

use std::collections::BTreeMap;

use crate::{
    errors::{DecodeError, TraceError},
    traits::{ExecutionTracer, TraceOutput},
    tracers::{
        call_stack::{ActionScope, CallStack},
        operation::PendingOperation,
    },
    types::*,
    utils::{
        address_utils::is_precompile,
        decode_utils::{memory_slice, peek, word_to_address, word_to_usize},
        opcode_utils::call_input_operands,
    },
};
use alloy::primitives::hex;
use tracing::{debug, warn};

/// Histogram keyed by `0x<selector>-<remaining input length>`
pub type FourByteResult = BTreeMap<String, u64>;

const SELECTOR_LEN: usize = 4;

fn selector_key(selector: &[u8], input_len: usize) -> String {
    format!("{}-{}", hex::encode_prefixed(selector), input_len - SELECTOR_LEN)
}

#[derive(Debug, Clone)]
pub struct FourByteTracer {
    context: TracerContext,
    ids: FourByteResult,
    scopes: CallStack<ActionScope>,
    operation: PendingOperation,
}

impl FourByteTracer {
    pub fn new(context: TracerContext) -> Self {
        debug!("creating 4byte tracer");
        Self {
            context,
            ids: FourByteResult::new(),
            scopes: CallStack::new(false),
            operation: PendingOperation::default(),
        }
    }

    fn record(ids: &mut FourByteResult, key: String) {
        *ids.entry(key).or_insert(0) += 1;
    }

    /// Selector key of the call described by a call opcode's operands
    ///
    /// `None` for short inputs and precompile targets.
    fn decode_call(
        &self,
        words: &[U256],
        (offset_at, length_at): (usize, usize),
    ) -> Result<Option<String>, DecodeError> {
        let target = word_to_address(peek(words, 1)?);
        if is_precompile(target, self.context.spec) {
            return Ok(None);
        }
        let input_len = word_to_usize(peek(words, length_at)?)?;
        if input_len < SELECTOR_LEN {
            return Ok(None);
        }
        let selector = memory_slice(
            &self.operation.memory,
            peek(words, offset_at)?,
            U256::from(SELECTOR_LEN),
        )?;
        Ok(Some(selector_key(selector, input_len)))
    }
}

impl ExecutionTracer for FourByteTracer {
    fn on_action_entered(&mut self, action: &ActionEntered) -> Result<(), TraceError> {
        if action.depth == 0 {
            self.context.apply_top_level_entry(action);
        }
        self.scopes
            .enter(action.depth, ActionScope { address: action.to })?;
        Ok(())
    }

    fn on_action_exited(&mut self, _exit: &ActionExited) -> Result<(), TraceError> {
        self.scopes.exit(|_| ())?;
        Ok(())
    }

    fn on_action_reverted(&mut self, _revert: &ActionReverted) -> Result<(), TraceError> {
        self.scopes.exit(|_| ())?;
        Ok(())
    }

    fn on_action_errored(&mut self, _error: &ActionErrored) -> Result<(), TraceError> {
        self.scopes.exit(|_| ())?;
        Ok(())
    }

    fn on_operation_started(&mut self, operation: &OperationStarted) -> Result<(), TraceError> {
        self.operation.begin(operation);
        Ok(())
    }

    fn on_memory(&mut self, memory: &[u8]) -> Result<(), TraceError> {
        self.operation.set_memory(memory);
        Ok(())
    }

    fn on_stack(&mut self, words: &[U256]) -> Result<(), TraceError> {
        let Some(operands) = self.operation.opcode.and_then(call_input_operands) else {
            return Ok(());
        };
        match self.decode_call(words, operands) {
            Ok(Some(key)) => Self::record(&mut self.ids, key),
            Ok(None) => {}
            Err(err) => warn!(%err, pc = self.operation.pc, "skipping undecodable call input"),
        }
        self.operation.finish();
        Ok(())
    }

    fn on_transaction_settled(&mut self, outcome: &TransactionSettled) -> Result<(), TraceError> {
        if self.scopes.depth() != 0 {
            return Err(TraceError::protocol(format!(
                "transaction settled with {} actions still open",
                self.scopes.depth()
            )));
        }
        self.context.apply_settlement(outcome);
        Ok(())
    }
}

impl TraceOutput for FourByteTracer {
    type Output = FourByteResult;

    /// Internal calls plus the top-level call
    ///
    /// The top-level input is added to a copy, so building twice yields the
    /// same histogram. Init code of a creation transaction is not a selector.
    fn get_output(&self) -> Result<FourByteResult, TraceError> {
        let mut ids = self.ids.clone();
        let context = &self.context;
        if let Some(to) = context.to.filter(|_| !context.is_creation()) {
            if context.input.len() >= SELECTOR_LEN && !is_precompile(to, context.spec) {
                Self::record(
                    &mut ids,
                    selector_key(&context.input[..SELECTOR_LEN], context.input.len()),
                );
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::opcode_utils::{CALL, STATICCALL};

    /// Stack of a CALL: gas, to, value, in_offset, in_size, out_offset, out_size
    fn call_stack(to: u64, in_offset: u64, in_size: u64) -> Vec<U256> {
        [0u64, 0, in_size, in_offset, 0, to, 50_000]
            .into_iter()
            .map(U256::from)
            .collect()
    }

    fn run_op(tracer: &mut FourByteTracer, opcode: u8, memory: &[u8], stack: &[U256]) {
        tracer
            .on_operation_started(&OperationStarted { pc: 0, opcode, gas: 0, depth: 0 })
            .unwrap();
        tracer.on_memory(memory).unwrap();
        tracer.on_stack(stack).unwrap();
    }

    #[test]
    fn test_staticcall_operand_positions() {
        let mut tracer = FourByteTracer::new(TracerContext::default());
        // gas, to, in_offset, in_size, out_offset, out_size
        let stack: Vec<U256> = [0u64, 0, 6, 2, 0xbeef, 50_000]
            .into_iter()
            .map(U256::from)
            .collect();
        run_op(&mut tracer, STATICCALL, &[0, 0, 0xde, 0xad, 0xbe, 0xef, 1, 2], &stack);
        let result = tracer.get_output().unwrap();
        assert_eq!(result.get("0xdeadbeef-2"), Some(&1));
    }

    #[test]
    fn test_out_of_bounds_input_is_skipped() {
        let mut tracer = FourByteTracer::new(TracerContext::default());
        run_op(&mut tracer, CALL, &[0xaa; 8], &call_stack(0xbeef, 6, 4));
        assert!(tracer.get_output().unwrap().is_empty());
    }

    #[test]
    fn test_creation_input_not_counted() {
        let context = TracerContext {
            kind: CallKind::Create,
            input: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]),
            ..Default::default()
        };
        let tracer = FourByteTracer::new(context);
        assert!(tracer.get_output().unwrap().is_empty());
    }
}

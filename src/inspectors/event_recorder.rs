//! revm inspector emitting the execution event protocol
//!
//! `EventRecorder` turns revm's inspector hooks into `ExecutionEvent`s:
//! - `call`/`create` and their `*_end` hooks become action enter/exit events
//! - `selfdestruct` becomes an enter/exit pair of kind SELFDESTRUCT
//! - `step` reports every opcode, plus memory, stack and storage snapshots for
//!   the opcodes whose operands some tracer decodes
//! - `log` becomes `LogEmitted`
//!
//! The recorder only reads from the interpreter and from the database behind
//! the journal; it never loads accounts through the journal, so warm/cold
//! accounting and gas are unaffected.

use std::collections::HashMap;

use crate::{
    traits::Reset,
    types::*,
    utils::{
        decode_utils::word_to_b256,
        opcode_utils::{has_traced_operands, is_storage_access, reads_memory, SSTORE},
    },
};
use revm::{
    context::ContextTr,
    database::Database,
    interpreter::{
        interpreter::EthInterpreter,
        interpreter_types::{InputsTr, Jumps, MemoryTr},
        CallInputs, CallOutcome, CallScheme, CreateInputs, CreateOutcome, CreateScheme,
        InstructionResult, Interpreter, InterpreterResult,
    },
    Inspector,
};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<ExecutionEvent>,
    /// Number of open actions
    depth: usize,
    /// Slots written in this transaction, consulted before the database.
    /// Writes of reverted frames are kept; only the first touch of a slot
    /// matters to the tracers.
    storage_writes: HashMap<(Address, U256), U256>,
    /// VM error that ended the top-level action, if any
    top_level_error: Option<ErrorKind>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    /// Move the recorded events out, leaving the recorder empty
    pub fn take_events(&mut self) -> Vec<ExecutionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn top_level_error(&self) -> Option<&ErrorKind> {
        self.top_level_error.as_ref()
    }

    fn enter(&mut self, action: ActionEntered) {
        self.events.push(ExecutionEvent::ActionEntered(action));
        self.depth += 1;
    }

    fn exit(&mut self, result: &InterpreterResult, created: Option<Address>) {
        self.depth = self.depth.saturating_sub(1);
        let gas_remaining = result.gas.remaining();
        let event = if result.result.is_ok() {
            ExecutionEvent::ActionExited(ActionExited {
                gas_remaining,
                output: result.output.clone(),
                created,
            })
        } else if result.result.is_revert() {
            ExecutionEvent::ActionReverted(ActionReverted {
                gas_remaining,
                output: result.output.clone(),
                created,
            })
        } else {
            ExecutionEvent::ActionErrored(ActionErrored {
                error: error_kind(result.result),
                created,
            })
        };
        if self.depth == 0 {
            self.top_level_error = match &event {
                ExecutionEvent::ActionReverted(_) => Some(ErrorKind::Revert),
                ExecutionEvent::ActionErrored(errored) => Some(errored.error.clone()),
                _ => None,
            };
        }
        self.events.push(event);
    }

    /// Value of a slot before the current operation
    fn storage_before<CTX: ContextTr>(
        &self,
        context: &mut CTX,
        address: Address,
        key: U256,
    ) -> U256 {
        if let Some(value) = self.storage_writes.get(&(address, key)) {
            return *value;
        }
        context.db().storage(address, key).unwrap_or_else(|e| {
            warn!(%address, %key, "failed to read storage slot: {e}");
            U256::ZERO
        })
    }
}

impl Reset for EventRecorder {
    fn reset(&mut self) {
        self.events = Vec::new();
        self.depth = 0;
        self.storage_writes.clear();
        self.top_level_error = None;
    }
}

/// Map a failing instruction result onto the geth error vocabulary
pub fn error_kind(result: InstructionResult) -> ErrorKind {
    match result {
        InstructionResult::Revert => ErrorKind::Revert,
        InstructionResult::OutOfGas
        | InstructionResult::MemoryOOG
        | InstructionResult::MemoryLimitOOG
        | InstructionResult::PrecompileOOG
        | InstructionResult::InvalidOperandOOG => ErrorKind::OutOfGas,
        InstructionResult::OpcodeNotFound | InstructionResult::InvalidFEOpcode => {
            ErrorKind::InvalidOpcode
        }
        InstructionResult::InvalidJump => ErrorKind::InvalidJump,
        InstructionResult::StackUnderflow => ErrorKind::StackUnderflow,
        InstructionResult::StackOverflow => ErrorKind::StackOverflow,
        InstructionResult::CallTooDeep => ErrorKind::CallDepthExceeded,
        InstructionResult::OutOfFunds => ErrorKind::InsufficientBalance,
        InstructionResult::CreateCollision => ErrorKind::ContractAddressCollision,
        InstructionResult::StateChangeDuringStaticCall
        | InstructionResult::CallNotAllowedInsideStatic => ErrorKind::WriteProtection,
        InstructionResult::OutOfOffset => ErrorKind::ReturnDataOutOfBounds,
        InstructionResult::CreateContractSizeLimit => ErrorKind::MaxCodeSizeExceeded,
        InstructionResult::CreateInitCodeSizeLimit => ErrorKind::MaxInitCodeSizeExceeded,
        InstructionResult::CreateContractStartingWithEF => ErrorKind::InvalidCode,
        InstructionResult::NonceOverflow => ErrorKind::NonceOverflow,
        other => ErrorKind::Other(format!("{other:?}")),
    }
}

impl<CTX: ContextTr> Inspector<CTX, EthInterpreter> for EventRecorder {
    fn step(&mut self, interp: &mut Interpreter<EthInterpreter>, context: &mut CTX) {
        let opcode = interp.bytecode.opcode();
        self.events
            .push(ExecutionEvent::OperationStarted(OperationStarted {
                pc: interp.bytecode.pc(),
                opcode,
                gas: 0,
                depth: self.depth.saturating_sub(1),
            }));
        if !has_traced_operands(opcode) {
            return;
        }

        if reads_memory(opcode) {
            let size = MemoryTr::size(&interp.memory);
            let memory = Bytes::copy_from_slice(&MemoryTr::slice(&interp.memory, 0..size));
            self.events.push(ExecutionEvent::MemorySnapshotted(memory));
        }

        let stack = interp.stack.data().clone();
        let slot = stack.last().copied();
        let written = stack
            .len()
            .checked_sub(2)
            .map(|position| stack[position]);
        self.events.push(ExecutionEvent::StackSnapshotted(stack));

        if let (true, Some(key)) = (is_storage_access(opcode), slot) {
            let address = interp.input.target_address();
            let value = self.storage_before(context, address, key);
            self.events
                .push(ExecutionEvent::StorageAccessed(StorageAccessed {
                    address,
                    key: word_to_b256(key),
                    value: word_to_b256(value),
                }));
            if let (SSTORE, Some(written)) = (opcode, written) {
                self.storage_writes.insert((address, key), written);
            }
        }
    }

    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        let kind = match inputs.scheme {
            CallScheme::CallCode => CallKind::CallCode,
            CallScheme::DelegateCall => CallKind::DelegateCall,
            CallScheme::StaticCall => CallKind::StaticCall,
            _ => CallKind::Call,
        };
        // DELEGATECALL inputs carry the parent's caller; the acting account is the parent itself
        let from = match kind {
            CallKind::DelegateCall => inputs.target_address,
            _ => inputs.caller,
        };
        let to = if kind.runs_in_caller_context() {
            inputs.bytecode_address
        } else {
            inputs.target_address
        };
        self.enter(ActionEntered {
            depth: self.depth,
            kind,
            from,
            to: Some(to),
            value: inputs.call_value(),
            gas: inputs.gas_limit,
            input: inputs.input.bytes(context),
            salt: None,
        });
        None
    }

    fn call_end(&mut self, _context: &mut CTX, _inputs: &CallInputs, outcome: &mut CallOutcome) {
        self.exit(&outcome.result, None);
    }

    fn create(&mut self, _context: &mut CTX, inputs: &mut CreateInputs) -> Option<CreateOutcome> {
        let (kind, salt) = match inputs.scheme {
            CreateScheme::Create2 { salt } => (CallKind::Create2, Some(word_to_b256(salt))),
            _ => (CallKind::Create, None),
        };
        self.enter(ActionEntered {
            depth: self.depth,
            kind,
            from: inputs.caller,
            to: None,
            value: inputs.value,
            gas: inputs.gas_limit,
            input: inputs.init_code.clone(),
            salt,
        });
        None
    }

    fn create_end(
        &mut self,
        _context: &mut CTX,
        _inputs: &CreateInputs,
        outcome: &mut CreateOutcome,
    ) {
        self.exit(&outcome.result, outcome.address);
    }

    fn log(&mut self, _interp: &mut Interpreter<EthInterpreter>, _context: &mut CTX, log: Log) {
        self.events.push(ExecutionEvent::LogEmitted(TraceLog::from(&log)));
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        self.enter(ActionEntered {
            depth: self.depth,
            kind: CallKind::SelfDestruct,
            from: contract,
            to: Some(target),
            value,
            gas: 0,
            input: Bytes::new(),
            salt: None,
        });
        self.depth = self.depth.saturating_sub(1);
        self.events
            .push(ExecutionEvent::ActionExited(ActionExited::default()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(error_kind(InstructionResult::Revert), ErrorKind::Revert);
        assert_eq!(error_kind(InstructionResult::MemoryOOG), ErrorKind::OutOfGas);
        assert_eq!(
            error_kind(InstructionResult::InvalidFEOpcode).to_string(),
            "invalid opcode"
        );
        assert_eq!(
            error_kind(InstructionResult::StateChangeDuringStaticCall),
            ErrorKind::WriteProtection
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut recorder = EventRecorder::new();
        Inspector::<revm::Context>::selfdestruct(&mut recorder, Address::ZERO, Address::with_last_byte(1), U256::from(5));
        assert_eq!(recorder.events().len(), 2);
        assert_eq!(recorder.depth, 0);
        recorder.reset();
        assert!(recorder.events().is_empty());
        assert!(recorder.top_level_error().is_none());
    }
}

//! Pre-execution state tracer (`prestateTracer`)
//!
//! Records, for every account the transaction touches, its balance, nonce,
//! code and touched storage as they were before the transaction ran.
//!
//! Accounts are read from the world-state view on first touch and never
//! re-queried. By the time the tracer sees the sender, recipient and coinbase
//! the VM has already charged gas, bumped the nonce and moved value, so those
//! three are reconciled when the result is built.

use std::collections::BTreeMap;

use crate::{
    errors::{DecodeError, RuntimeError, TraceError},
    traits::{ExecutionTracer, TraceOutput, WorldState},
    tracers::{
        call_stack::{ActionScope, CallStack},
        operation::PendingOperation,
    },
    types::*,
    utils::{
        address_utils::is_precompile,
        decode_utils::{memory_slice, peek, word_to_address, word_to_b256},
        opcode_utils::{is_call, touches_address_operand, CREATE2},
        serde_utils,
    },
};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// State of one account before the transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountState {
    pub balance: U256,
    #[serde(skip_serializing_if = "serde_utils::is_zero")]
    pub nonce: u64,
    #[serde(skip_serializing_if = "serde_utils::is_empty_bytes")]
    pub code: Bytes,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<B256, B256>,
}

/// Prestate keyed by address
pub type PrestateResult = BTreeMap<Address, AccountState>;

fn read_account(state: &dyn WorldState, address: Address) -> Result<AccountState, RuntimeError> {
    if !state.account_exists(address)? {
        return Ok(AccountState::default());
    }
    Ok(AccountState {
        balance: state.get_balance(address)?,
        nonce: state.get_nonce(address)?,
        code: state.get_code(address)?,
        storage: BTreeMap::new(),
    })
}

pub struct PrestateTracer<'a> {
    state: &'a dyn WorldState,
    context: TracerContext,
    prestate: PrestateResult,
    scopes: CallStack<ActionScope>,
    operation: PendingOperation,
}

impl<'a> PrestateTracer<'a> {
    pub fn new(state: &'a dyn WorldState, context: TracerContext) -> Self {
        debug!("creating prestate tracer");
        Self {
            state,
            context,
            prestate: PrestateResult::new(),
            scopes: CallStack::new(false),
            operation: PendingOperation::default(),
        }
    }

    pub fn context(&self) -> &TracerContext {
        &self.context
    }

    /// Accounts captured so far, before reconciliation
    pub fn captured(&self) -> &PrestateResult {
        &self.prestate
    }

    fn lookup_account(&mut self, address: Address) -> Result<(), TraceError> {
        if self.prestate.contains_key(&address) {
            return Ok(());
        }
        let account = read_account(self.state, address)?;
        trace!(%address, "captured account");
        self.prestate.insert(address, account);
        Ok(())
    }

    /// Storage context of the innermost open action
    fn current_address(&self) -> Option<Address> {
        self.scopes.current().and_then(|scope| scope.address)
    }

    /// Account touched by the operation whose stack is `words`
    fn touched_by_operation(&self, opcode: u8, words: &[U256]) -> Result<Option<Address>, DecodeError> {
        if touches_address_operand(opcode) {
            return Ok(Some(word_to_address(peek(words, 0)?)));
        }
        if is_call(opcode) {
            let target = word_to_address(peek(words, 1)?);
            return Ok((!is_precompile(target, self.context.spec)).then_some(target));
        }
        if opcode == CREATE2 {
            let Some(sender) = self.current_address() else {
                return Ok(None);
            };
            let init_code = memory_slice(&self.operation.memory, peek(words, 1)?, peek(words, 2)?)?;
            let salt = word_to_b256(peek(words, 3)?);
            return Ok(Some(sender.create2_from_code(salt, init_code)));
        }
        Ok(None)
    }

    /// Pop the innermost action; a creation's target counts as touched
    /// whether or not the deployment succeeded
    fn close_action(&mut self, created: Option<Address>) -> Result<(), TraceError> {
        self.scopes.exit(|_| ())?;
        if let Some(created) = created {
            self.lookup_account(created)?;
        }
        Ok(())
    }
}

impl ExecutionTracer for PrestateTracer<'_> {
    fn on_action_entered(&mut self, action: &ActionEntered) -> Result<(), TraceError> {
        if action.depth == 0 {
            self.context.apply_top_level_entry(action);
            self.lookup_account(self.context.from)?;
            if let Some(recipient) = self.context.recipient() {
                self.lookup_account(recipient)?;
            }
            if let Some(coinbase) = self.context.coinbase {
                self.lookup_account(coinbase)?;
            }
        }

        let target = match (action.to, action.salt) {
            (Some(to), _) => Some(to),
            (None, Some(salt)) if action.kind == CallKind::Create2 => {
                Some(action.from.create2_from_code(salt, &action.input))
            }
            (None, _) if action.depth == 0 => self.context.created_address,
            _ => None,
        };
        if let Some(target) = target.filter(|to| !is_precompile(*to, self.context.spec)) {
            self.lookup_account(target)?;
        }

        let address = if action.kind.runs_in_caller_context() {
            Some(action.from)
        } else {
            target
        };
        self.scopes.enter(action.depth, ActionScope { address })?;
        Ok(())
    }

    fn on_action_exited(&mut self, exit: &ActionExited) -> Result<(), TraceError> {
        self.close_action(exit.created)?;
        if let Some(created) = exit.created {
            if self.scopes.depth() == 0 && self.context.is_creation() {
                self.context.created_address = Some(created);
            }
        }
        Ok(())
    }

    fn on_action_reverted(&mut self, revert: &ActionReverted) -> Result<(), TraceError> {
        self.close_action(revert.created)
    }

    fn on_action_errored(&mut self, error: &ActionErrored) -> Result<(), TraceError> {
        self.close_action(error.created)
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
        let Some(opcode) = self.operation.opcode else {
            return Ok(());
        };
        match self.touched_by_operation(opcode, words) {
            Ok(Some(address)) => self.lookup_account(address)?,
            Ok(None) => {}
            Err(err) => warn!(%err, opcode, pc = self.operation.pc, "skipping undecodable operand"),
        }
        self.operation.finish();
        Ok(())
    }

    /// First touch of a slot wins; later reads see values this transaction wrote
    fn on_storage_accessed(&mut self, access: &StorageAccessed) -> Result<(), TraceError> {
        self.lookup_account(access.address)?;
        if let Some(account) = self.prestate.get_mut(&access.address) {
            account.storage.entry(access.key).or_insert(access.value);
        }
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

impl TraceOutput for PrestateTracer<'_> {
    type Output = PrestateResult;

    /// Reconcile the captured accounts into the pre-transaction state
    ///
    /// Works on a copy, so the tracer itself is left untouched.
    fn get_output(&self) -> Result<PrestateResult, TraceError> {
        let context = &self.context;
        let mut prestate = self.prestate.clone();
        let mut ensure = |address: Address| -> Result<(), TraceError> {
            if !prestate.contains_key(&address) {
                prestate.insert(address, read_account(self.state, address)?);
            }
            Ok(())
        };

        ensure(context.from)?;
        let recipient = context.recipient();
        if let Some(recipient) = recipient {
            ensure(recipient)?;
        }
        if let Some(coinbase) = context.coinbase {
            ensure(coinbase)?;
        }

        let transferred = if context.failed() {
            U256::ZERO
        } else {
            context.value
        };
        let gas_used = U256::from(context.gas_used);

        if let Some(account) = recipient.and_then(|to| prestate.get_mut(&to)) {
            account.balance = account.balance.saturating_sub(transferred);
        }
        if let Some(account) = prestate.get_mut(&context.from) {
            account.balance = account
                .balance
                .saturating_add(transferred)
                .saturating_add(gas_used.saturating_mul(context.gas_price));
            account.nonce = account.nonce.saturating_sub(1);
        }
        if let Some(account) = context.coinbase.and_then(|coinbase| prestate.get_mut(&coinbase)) {
            let tip = context.gas_price.saturating_sub(context.base_fee);
            account.balance = account.balance.saturating_sub(gas_used.saturating_mul(tip));
        }

        if context.is_creation() {
            if let Some(created) = context.created_address {
                prestate.remove(&created);
            }
        }
        Ok(prestate)
    }
}

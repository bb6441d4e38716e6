//! Read-only world-state views over a revm database
//!
//! `StateView` adapts any `DatabaseRef` to the `WorldState` capability used by
//! the tracers. Only the `*_ref` methods are used, so the database is never
//! mutated and no access lists are warmed.
//!
//! `ReplayState` is what the driver hands to a tracer after executing a
//! transaction but before committing it: the database as it was before the
//! transaction, with the value transfer and gas payment already applied to
//! the sender, recipient and coinbase.

use std::collections::HashMap;

use crate::{
    errors::RuntimeError,
    traits::WorldState,
    types::{TracerContext, TransactionSettled},
};
use alloy::primitives::{Address, Bytes, B256, U256};
use revm::{database::DatabaseRef, primitives::KECCAK_EMPTY, state::AccountInfo};

pub struct StateView<'a, DB> {
    db: &'a DB,
}

impl<'a, DB: DatabaseRef> StateView<'a, DB> {
    pub fn new(db: &'a DB) -> Self {
        Self { db }
    }

    fn account(&self, address: Address) -> Result<Option<AccountInfo>, RuntimeError> {
        self.db
            .basic_ref(address)
            .map_err(|e| RuntimeError::AccountAccess(format!("{address}: {e}")))
    }
}

impl<DB: DatabaseRef> WorldState for StateView<'_, DB> {
    fn get_balance(&self, address: Address) -> Result<U256, RuntimeError> {
        Ok(self.account(address)?.map(|info| info.balance).unwrap_or_default())
    }

    fn get_nonce(&self, address: Address) -> Result<u64, RuntimeError> {
        Ok(self.account(address)?.map(|info| info.nonce).unwrap_or_default())
    }

    fn get_code(&self, address: Address) -> Result<Bytes, RuntimeError> {
        let Some(info) = self.account(address)? else {
            return Ok(Bytes::new());
        };
        if let Some(code) = info.code {
            return Ok(code.original_bytes());
        }
        if info.code_hash == KECCAK_EMPTY || info.code_hash == B256::ZERO {
            return Ok(Bytes::new());
        }
        self.db
            .code_by_hash_ref(info.code_hash)
            .map(|code| code.original_bytes())
            .map_err(|e| RuntimeError::AccountAccess(format!("code of {address}: {e}")))
    }

    fn get_storage(&self, address: Address, key: B256) -> Result<B256, RuntimeError> {
        self.db
            .storage_ref(address, U256::from_be_bytes(key.0))
            .map(|value| B256::from(value.to_be_bytes::<32>()))
            .map_err(|e| RuntimeError::SlotAccess(format!("{address} slot {key}: {e}")))
    }

    fn account_exists(&self, address: Address) -> Result<bool, RuntimeError> {
        Ok(self.account(address)?.is_some())
    }
}

/// Balance and nonce changes the settlement of a transaction applies to one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SettlementDelta {
    credit: U256,
    debit: U256,
    nonce: u64,
}

/// Pre-transaction database with only the transaction's settlement applied
///
/// The sender has paid for gas and value and bumped its nonce, the recipient
/// has received the value and the coinbase its tip. Everything the
/// transaction did while executing stays invisible, which is exactly the
/// state a tracer attached at transaction start would have looked up.
pub struct ReplayState<'a, DB> {
    pre: StateView<'a, DB>,
    settled: HashMap<Address, SettlementDelta>,
}

impl<'a, DB: DatabaseRef> ReplayState<'a, DB> {
    pub fn new(db: &'a DB, context: &TracerContext, outcome: &TransactionSettled) -> Self {
        let gas_used = U256::from(outcome.gas_used);
        let transferred = if outcome.success {
            context.value
        } else {
            U256::ZERO
        };
        let tip = context.gas_price.saturating_sub(context.base_fee);

        let mut settled: HashMap<Address, SettlementDelta> = HashMap::new();
        let sender = settled.entry(context.from).or_default();
        sender.debit = transferred.saturating_add(gas_used.saturating_mul(context.gas_price));
        sender.nonce = 1;
        if let Some(recipient) = context.recipient() {
            let delta = settled.entry(recipient).or_default();
            delta.credit = delta.credit.saturating_add(transferred);
        }
        if let Some(coinbase) = context.coinbase {
            let delta = settled.entry(coinbase).or_default();
            delta.credit = delta.credit.saturating_add(gas_used.saturating_mul(tip));
        }

        Self {
            pre: StateView::new(db),
            settled,
        }
    }
}

impl<DB: DatabaseRef> WorldState for ReplayState<'_, DB> {
    fn get_balance(&self, address: Address) -> Result<U256, RuntimeError> {
        let balance = self.pre.get_balance(address)?;
        Ok(match self.settled.get(&address) {
            Some(delta) => balance.saturating_add(delta.credit).saturating_sub(delta.debit),
            None => balance,
        })
    }

    fn get_nonce(&self, address: Address) -> Result<u64, RuntimeError> {
        let nonce = self.pre.get_nonce(address)?;
        Ok(nonce.saturating_add(self.settled.get(&address).map_or(0, |delta| delta.nonce)))
    }

    fn get_code(&self, address: Address) -> Result<Bytes, RuntimeError> {
        self.pre.get_code(address)
    }

    fn get_storage(&self, address: Address, key: B256) -> Result<B256, RuntimeError> {
        self.pre.get_storage(address, key)
    }

    fn account_exists(&self, address: Address) -> Result<bool, RuntimeError> {
        if self.settled.contains_key(&address) {
            return Ok(true);
        }
        self.pre.account_exists(address)
    }
}

//! Core types for native execution tracing
//!
//! This module defines the data structures shared by the event source, the
//! tracers and the block driver:
//! - Execution events and their payloads
//! - Call kinds and VM error kinds
//! - The per-transaction tracer context
//! - Block and transaction inputs for simulation

use std::fmt;

pub use alloy::primitives::{Address, Bytes, Log, TxKind, B256, U256};
pub use revm::primitives::hardfork::SpecId;
use serde::{Serialize, Serializer};

// ========================= Actions =========================

/// Kind of an action, serialized with the geth opcode names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    SelfDestruct,
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }

    /// STATICCALL frames carry no value at all (not even zero)
    pub fn carries_value(&self) -> bool {
        !matches!(self, Self::StaticCall)
    }

    /// Whether the frame executes in the storage context of its caller
    pub fn runs_in_caller_context(&self) -> bool {
        matches!(self, Self::DelegateCall | Self::CallCode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::CallCode => "CALLCODE",
            Self::DelegateCall => "DELEGATECALL",
            Self::StaticCall => "STATICCALL",
            Self::Create => "CREATE",
            Self::Create2 => "CREATE2",
            Self::SelfDestruct => "SELFDESTRUCT",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VM-level failure of an action or operation
///
/// These are not tracer errors: they end up in the `error` field of the
/// affected frame. `Display` yields the geth-compatible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Revert,
    OutOfGas,
    InvalidOpcode,
    InvalidJump,
    StackUnderflow,
    StackOverflow,
    CallDepthExceeded,
    InsufficientBalance,
    ContractAddressCollision,
    WriteProtection,
    ReturnDataOutOfBounds,
    MaxCodeSizeExceeded,
    MaxInitCodeSizeExceeded,
    InvalidCode,
    NonceOverflow,
    Other(String),
}

impl ErrorKind {
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Revert)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Revert => "execution reverted",
            Self::OutOfGas => "out of gas",
            Self::InvalidOpcode => "invalid opcode",
            Self::InvalidJump => "invalid jump destination",
            Self::StackUnderflow => "stack underflow",
            Self::StackOverflow => "stack limit reached 1024",
            Self::CallDepthExceeded => "max call depth exceeded",
            Self::InsufficientBalance => "insufficient balance for transfer",
            Self::ContractAddressCollision => "contract address collision",
            Self::WriteProtection => "write protection",
            Self::ReturnDataOutOfBounds => "return data out of bounds",
            Self::MaxCodeSizeExceeded => "max code size exceeded",
            Self::MaxInitCodeSizeExceeded => "max initcode size exceeded",
            Self::InvalidCode => "invalid code: must not begin with 0xef",
            Self::NonceOverflow => "nonce uint64 overflow",
            Self::Other(message) => message.as_str(),
        };
        f.write_str(message)
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ========================= Events =========================

/// An action (call, create or self-destruct) begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntered {
    /// Number of actions open before this one; the top-level action is 0
    pub depth: usize,
    pub kind: CallKind,
    pub from: Address,
    /// `None` for creations whose address the source does not know yet
    pub to: Option<Address>,
    pub value: U256,
    pub gas: u64,
    pub input: Bytes,
    /// CREATE2 salt, lets consumers derive the target before it is reported
    pub salt: Option<B256>,
}

/// The innermost open action returned successfully
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionExited {
    pub gas_remaining: u64,
    /// Return data, or the deployed code for creations
    pub output: Bytes,
    /// Deployment address for CREATE/CREATE2
    pub created: Option<Address>,
}

/// The innermost open action reverted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionReverted {
    pub gas_remaining: u64,
    pub output: Bytes,
    /// Address the CREATE/CREATE2 would have deployed to
    pub created: Option<Address>,
}

/// The innermost open action halted with a VM error, consuming all its gas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionErrored {
    pub error: ErrorKind,
    /// Address the CREATE/CREATE2 would have deployed to
    pub created: Option<Address>,
}

/// An opcode is about to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStarted {
    pub pc: usize,
    pub opcode: u8,
    /// Gas available before the operation; 0 when the source does not sample it
    pub gas: u64,
    pub depth: usize,
}

/// Storage slot touched by SLOAD/SSTORE, with the value before the operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccessed {
    pub address: Address,
    pub key: B256,
    pub value: B256,
}

/// A LOG0..LOG4 entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl From<&Log> for TraceLog {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address,
            topics: log.data.topics().to_vec(),
            data: log.data.data.clone(),
        }
    }
}

/// Final outcome of the transaction, reported once after the top-level action
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionSettled {
    pub success: bool,
    pub gas_used: u64,
    pub output: Bytes,
    pub logs: Vec<TraceLog>,
    pub error: Option<ErrorKind>,
}

/// One event of the execution event protocol
///
/// Events arrive in strict program order. Every `ActionEntered` is matched by
/// exactly one of `ActionExited`, `ActionReverted` or `ActionErrored`, with
/// stack discipline. Within one operation the order is `OperationStarted`,
/// then optionally `MemorySnapshotted`, `StackSnapshotted` and
/// `StorageAccessed`, then the gas or error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    ActionEntered(ActionEntered),
    ActionExited(ActionExited),
    ActionReverted(ActionReverted),
    ActionErrored(ActionErrored),
    OperationStarted(OperationStarted),
    OperationGasReported { gas_remaining: u64 },
    OperationError(ErrorKind),
    /// Stack words ordered bottom to top; the last word is the top of stack
    StackSnapshotted(Vec<U256>),
    /// Full memory of the current frame
    MemorySnapshotted(Bytes),
    StorageAccessed(StorageAccessed),
    LogEmitted(TraceLog),
    RefundReported(u64),
    TransactionSettled(TransactionSettled),
}

// ========================= Tracer context =========================

/// Per-transaction context shared by every tracer variant
///
/// The driver fills in what it knows before execution (gas price, limit,
/// coinbase). The depth-0 `ActionEntered` and the `TransactionSettled` event
/// complete it; no other event mutates it.
#[derive(Debug, Clone)]
pub struct TracerContext {
    pub gas_price: U256,
    pub gas_limit: u64,
    pub from: Address,
    /// Recipient, `None` for creation transactions
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub kind: CallKind,
    pub coinbase: Option<Address>,
    pub base_fee: U256,
    /// Address deployed by a creation transaction
    pub created_address: Option<Address>,
    pub spec: SpecId,
    pub settled: bool,
    pub success: bool,
    pub gas_used: u64,
    pub output: Bytes,
    pub error: Option<ErrorKind>,
}

impl Default for TracerContext {
    fn default() -> Self {
        Self {
            gas_price: U256::ZERO,
            gas_limit: 0,
            from: Address::ZERO,
            to: None,
            value: U256::ZERO,
            input: Bytes::new(),
            kind: CallKind::Call,
            coinbase: None,
            base_fee: U256::ZERO,
            created_address: None,
            spec: SpecId::PRAGUE,
            settled: false,
            success: true,
            gas_used: 0,
            output: Bytes::new(),
            error: None,
        }
    }
}

impl TracerContext {
    /// Take the transaction parameters from the top-level action
    ///
    /// A gas limit already supplied by the driver wins over the action's gas,
    /// which has the intrinsic cost deducted.
    pub fn apply_top_level_entry(&mut self, action: &ActionEntered) {
        self.kind = action.kind;
        self.from = action.from;
        self.value = action.value;
        self.input = action.input.clone();
        if action.kind.is_create() {
            self.to = None;
            if action.to.is_some() {
                self.created_address = action.to;
            }
        } else {
            self.to = action.to;
        }
        if self.gas_limit == 0 {
            self.gas_limit = action.gas;
        }
    }

    pub fn apply_settlement(&mut self, outcome: &TransactionSettled) {
        self.settled = true;
        self.success = outcome.success;
        self.gas_used = outcome.gas_used;
        self.output = outcome.output.clone();
        self.error = match (&outcome.error, outcome.success) {
            (Some(error), _) => Some(error.clone()),
            (None, false) => Some(ErrorKind::Revert),
            (None, true) => None,
        };
    }

    pub fn is_creation(&self) -> bool {
        self.kind.is_create()
    }

    /// Whether the transaction settled as failed
    pub fn failed(&self) -> bool {
        self.settled && !self.success
    }

    /// The account that received the transaction: `to`, or the created address
    pub fn recipient(&self) -> Option<Address> {
        self.to.or(self.created_address)
    }
}

// ========================= Simulation inputs =========================

/// Block parameters for a simulated block
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockEnv {
    pub number: u64,
    pub timestamp: u64,
    pub coinbase: Address,
    pub base_fee: u64,
}

/// A transaction to execute and trace
#[derive(Debug, Clone)]
pub struct SimulationTx {
    /// Identifier matched against the `txHash` filter
    pub hash: B256,
    pub caller: Address,
    pub value: U256,
    pub data: Bytes,
    pub transact_to: TxKind,
    pub gas_limit: u64,
    pub gas_price: u128,
}

impl SimulationTx {
    pub const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

    pub fn call(caller: Address, to: Address, value: U256, data: Bytes) -> Self {
        Self {
            hash: B256::ZERO,
            caller,
            value,
            data,
            transact_to: TxKind::Call(to),
            gas_limit: Self::DEFAULT_GAS_LIMIT,
            gas_price: 0,
        }
    }

    pub fn create(caller: Address, value: U256, init_code: Bytes) -> Self {
        Self {
            transact_to: TxKind::Create,
            ..Self::call(caller, Address::ZERO, value, init_code)
        }
    }

    pub fn with_hash(mut self, hash: B256) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }
}

/// A block of transactions executed sequentially over shared state
#[derive(Debug, Clone)]
pub struct SimulationBatch {
    pub block_env: BlockEnv,
    pub transactions: Vec<SimulationTx>,
}

//! # Native geth-style tracers for revm
//!
//! Reconstructs the three classic `debug_trace*` views of a transaction from
//! a linear stream of execution events:
//!
//! - **`callTracer`**: the nested call-frame tree with gas, input/output,
//!   errors, decoded revert reasons and (optionally) logs
//! - **`prestateTracer`**: every touched account's balance, nonce, code and
//!   storage as they were before the transaction
//! - **`4byteTracer`**: a histogram of function selectors and input sizes
//!
//! The tracers consume [`types::ExecutionEvent`]s through the
//! [`ExecutionTracer`] trait and read world state through [`WorldState`], so
//! they can be driven by any event source. The crate ships one: an
//! [`EventRecorder`] inspector for revm, and a [`TraceEvm`] that executes
//! blocks of transactions over a `CacheDB` and traces them.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use revm_native_trace::{
//!     create_evm, TraceOptions, TransactionProcessor,
//!     types::{BlockEnv, SimulationBatch, SimulationTx, SpecId},
//! };
//! use alloy::primitives::{address, Bytes, U256};
//! use revm::{database::{CacheDB, EmptyDB}, state::AccountInfo};
//!
//! # fn example() -> anyhow::Result<()> {
//! let sender = address!("C255fC198eEdAC7AF8aF0f6e0ca781794B094A61");
//! let mut backend = CacheDB::new(EmptyDB::default());
//! backend.insert_account_info(sender, AccountInfo {
//!     balance: U256::from(10u128.pow(18)),
//!     ..Default::default()
//! });
//!
//! let mut evm = create_evm(backend, SpecId::CANCUN);
//! let tx = SimulationTx::call(
//!     sender,
//!     address!("d878229c9c3575F224784DE610911B5607a3ad15"),
//!     U256::from(1_000),
//!     Bytes::new(),
//! );
//! let batch = SimulationBatch { block_env: BlockEnv::default(), transactions: vec![tx] };
//!
//! let options = TraceOptions::from_json(r#"{"tracer":"callTracer"}"#)?;
//! for trace in evm.trace_transactions(batch, &options) {
//!     println!("{}", serde_json::to_string_pretty(&trace?)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `types`: execution events, tracer context and simulation inputs
//! - `traits`: the event consumer, world-state and processing traits
//! - `tracers`: the three native tracers and the call-stack reconstructor
//! - `registry`: tracer lookup by name and trace options
//! - `state`: world-state views over revm databases
//! - `inspectors`: the revm event recorder
//! - `evm`: EVM construction and the block trace driver
//! - `errors`: error types
//! - `utils`: operand decoding and other helpers

pub mod errors;
pub mod evm;
pub mod inspectors;
pub mod registry;
pub mod state;
pub mod tracers;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export only the essential types and functions
pub use errors::TraceError;
pub use evm::{
    builder::{create_evm, TracingEvm},
    processor::trace_blocks,
    TraceEvm,
};
pub use inspectors::EventRecorder;
pub use registry::{create_tracer, TraceOptions};
pub use state::{ReplayState, StateView};
pub use tracers::{TraceResult, Tracer, TxTraceResult};
pub use traits::{ExecutionTracer, TraceOutput, TransactionProcessor, WorldState};

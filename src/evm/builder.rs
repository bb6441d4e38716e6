//! EVM construction
//!
//! Builds a mainnet EVM over an in-memory `CacheDB` layered on any read-only
//! backend, with the event recorder attached and development-friendly
//! configuration (no EIP-3607 sender check, no base fee or block gas limit
//! enforcement, no contract size limit).

use crate::{evm::TraceEvm, inspectors::EventRecorder, types::SpecId};
use revm::{
    context::{CfgEnv, Context},
    database::{CacheDB, DatabaseRef},
    handler::{MainBuilder, MainContext},
};
use tracing::debug;

/// EVM produced by [`create_evm`]
pub type TracingEvm<DB> = TraceEvm<CacheDB<DB>, EventRecorder>;

fn tracing_cfg(spec: SpecId) -> CfgEnv {
    let mut cfg = CfgEnv::default();
    cfg.spec = spec;
    cfg.disable_eip3607 = true;
    cfg.limit_contract_code_size = None;
    cfg.disable_block_gas_limit = true;
    cfg.disable_base_fee = true;
    cfg
}

/// Create an EVM over `db` running the `spec` hardfork rules
///
/// # Example
/// ```
/// use revm_native_trace::{create_evm, types::SpecId};
/// use revm::database::{CacheDB, EmptyDB};
///
/// let backend = CacheDB::new(EmptyDB::default());
/// let evm = create_evm(backend, SpecId::SHANGHAI);
/// assert_eq!(evm.ctx.cfg.spec, SpecId::SHANGHAI);
/// ```
pub fn create_evm<DB: DatabaseRef>(db: DB, spec: SpecId) -> TracingEvm<DB> {
    debug!(?spec, "creating tracing evm");
    let ctx = Context::mainnet()
        .with_db(CacheDB::new(db))
        .with_cfg(tracing_cfg(spec));
    let evm = ctx.build_mainnet_with_inspector(EventRecorder::new());
    TraceEvm::new(evm)
}

//! Block environment utilities for EVM simulation
//!
//! Helper functions to turn a simulated block description into revm's block
//! environment.

use crate::types::BlockEnv;
use revm::context::BlockEnv as RevmBlockEnv;

/// Create a revm block environment for EVM execution
///
/// Uses revm's defaults for every parameter the simulated block does not set.
///
/// # Example
/// ```rust
/// # use revm_native_trace::{types::BlockEnv, utils::block_utils::create_block_env};
/// let block = create_block_env(&BlockEnv { number: 18_000_000, timestamp: 1672531200, ..Default::default() });
/// assert_eq!(block.number, 18_000_000);
/// ```
pub fn create_block_env(block: &BlockEnv) -> RevmBlockEnv {
    RevmBlockEnv {
        number: block.number,
        timestamp: block.timestamp,
        beneficiary: block.coinbase,
        basefee: block.base_fee,
        ..Default::default()
    }
}

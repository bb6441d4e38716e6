//! Utility functions shared by the tracers
//!
//! # Modules
//!
//! - [`decode_utils`]: stack and memory operand decoding
//!   - Big-endian word to address/offset/length conversion
//!   - Bounds-checked memory slicing
//!
//! - [`address_utils`]: precompile detection per hardfork
//!
//! - [`error_utils`]: revert payload decoding
//!   - `Error(string)` messages and `Panic(uint256)` codes
//!   - Hex fallback for anything else
//!
//! - [`opcode_utils`]: opcodes with decoded operands
//!
//! - [`block_utils`]: revm block environment construction
//!
//! - [`serde_utils`]: skip predicates for result serialization

/// Operand decoding utilities
pub mod decode_utils;

/// Precompile detection
pub mod address_utils;

/// Error parsing utilities
pub mod error_utils;

/// Opcode constants and classification
pub mod opcode_utils;

/// Block environment utilities
pub mod block_utils;

/// Serialization skip predicates
pub mod serde_utils;

//! Skip predicates for the geth JSON result shapes
//!
//! Hex quantities go through `alloy::serde::quantity`.

use alloy::primitives::Bytes;

pub fn is_zero(value: &u64) -> bool {
    *value == 0
}

pub fn is_empty_bytes(value: &Bytes) -> bool {
    value.is_empty()
}

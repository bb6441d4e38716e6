//! Precompile detection

use alloy::primitives::Address;
use revm::{
    precompile::{PrecompileSpecId, Precompiles},
    primitives::hardfork::SpecId,
};

/// Whether `address` is a precompile under `spec`
///
/// Precompiles are never selector or prestate lookup targets.
pub fn is_precompile(address: Address, spec: SpecId) -> bool {
    Precompiles::new(PrecompileSpecId::from_spec_id(spec)).contains(&address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_precompile_range_follows_hardfork() {
        let blake2f = address!("0000000000000000000000000000000000000009");
        let point_eval = address!("000000000000000000000000000000000000000a");
        let bls_map = address!("0000000000000000000000000000000000000011");

        assert!(!is_precompile(Address::ZERO, SpecId::PRAGUE));
        assert!(is_precompile(Address::with_last_byte(1), SpecId::FRONTIER));
        assert!(!is_precompile(Address::with_last_byte(5), SpecId::FRONTIER));
        assert!(!is_precompile(blake2f, SpecId::BYZANTIUM));
        assert!(is_precompile(blake2f, SpecId::ISTANBUL));
        assert!(!is_precompile(point_eval, SpecId::SHANGHAI));
        assert!(is_precompile(point_eval, SpecId::CANCUN));
        assert!(!is_precompile(bls_map, SpecId::CANCUN));
        assert!(!is_precompile(
            address!("0100000000000000000000000000000000000001"),
            SpecId::PRAGUE
        ));
    }
}

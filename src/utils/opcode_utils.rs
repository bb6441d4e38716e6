//! Opcodes whose operands the tracers decode

pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const BALANCE: u8 = 0x31;
pub const EXTCODESIZE: u8 = 0x3b;
pub const EXTCODECOPY: u8 = 0x3c;
pub const EXTCODEHASH: u8 = 0x3f;
pub const CREATE: u8 = 0xf0;
pub const CALL: u8 = 0xf1;
pub const CALLCODE: u8 = 0xf2;
pub const DELEGATECALL: u8 = 0xf4;
pub const CREATE2: u8 = 0xf5;
pub const STATICCALL: u8 = 0xfa;
pub const REVERT: u8 = 0xfd;
pub const SELFDESTRUCT: u8 = 0xff;

/// Opcodes taking a target address as their first operand
pub fn touches_address_operand(opcode: u8) -> bool {
    matches!(
        opcode,
        BALANCE | EXTCODESIZE | EXTCODECOPY | EXTCODEHASH | SELFDESTRUCT
    )
}

pub fn is_call(opcode: u8) -> bool {
    matches!(opcode, CALL | CALLCODE | DELEGATECALL | STATICCALL)
}

pub fn is_storage_access(opcode: u8) -> bool {
    matches!(opcode, SLOAD | SSTORE)
}

/// Stack positions of the `(offset, length)` input operands of a call opcode
///
/// CALL and CALLCODE carry a value operand that shifts the input pair down.
pub fn call_input_operands(opcode: u8) -> Option<(usize, usize)> {
    match opcode {
        CALL | CALLCODE => Some((3, 4)),
        DELEGATECALL | STATICCALL => Some((2, 3)),
        _ => None,
    }
}

/// Whether the operands of `opcode` need a memory snapshot to decode
pub fn reads_memory(opcode: u8) -> bool {
    is_call(opcode) || matches!(opcode, CREATE | CREATE2 | REVERT)
}

/// Whether any tracer decodes the operands of `opcode`
pub fn has_traced_operands(opcode: u8) -> bool {
    is_call(opcode)
        || is_storage_access(opcode)
        || touches_address_operand(opcode)
        || matches!(opcode, CREATE | CREATE2 | REVERT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_input_operands() {
        assert_eq!(call_input_operands(CALL), Some((3, 4)));
        assert_eq!(call_input_operands(CALLCODE), Some((3, 4)));
        assert_eq!(call_input_operands(DELEGATECALL), Some((2, 3)));
        assert_eq!(call_input_operands(STATICCALL), Some((2, 3)));
        assert_eq!(call_input_operands(CREATE2), None);
    }
}

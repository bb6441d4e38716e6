//! Stack and memory operand decoding
//!
//! Words are big-endian 256-bit values. Stack snapshots are ordered bottom to
//! top, so operand `n` counted from the top lives at `len - 1 - n`.

use crate::errors::DecodeError;
use alloy::primitives::{Address, B256, U256};

/// Read the `index`-th operand from the top of the stack
pub fn peek(stack: &[U256], index: usize) -> Result<U256, DecodeError> {
    stack
        .len()
        .checked_sub(index + 1)
        .map(|position| stack[position])
        .ok_or(DecodeError::MissingOperand {
            index,
            len: stack.len(),
        })
}

/// Interpret a word as an address by keeping its low 20 bytes
///
/// High bytes are ignored, matching how the VM itself treats address operands.
pub fn word_to_address(word: U256) -> Address {
    Address::from_word(word_to_b256(word))
}

pub fn word_to_b256(word: U256) -> B256 {
    B256::from(word.to_be_bytes::<32>())
}

/// Interpret a word as a memory offset or length
pub fn word_to_usize(word: U256) -> Result<usize, DecodeError> {
    if word > U256::from(usize::MAX) {
        return Err(DecodeError::OperandOverflow(word));
    }
    Ok(word.to::<usize>())
}

/// Bounds-checked slice `memory[offset..offset + length]`
///
/// A zero length always succeeds, whatever the offset, since the VM never
/// touches memory for empty ranges.
pub fn memory_slice(memory: &[u8], offset: U256, length: U256) -> Result<&[u8], DecodeError> {
    let length = word_to_usize(length)?;
    if length == 0 {
        return Ok(&[]);
    }
    let start = word_to_usize(offset)?;
    let end = start
        .checked_add(length)
        .ok_or(DecodeError::OperandOverflow(offset))?;
    memory
        .get(start..end)
        .ok_or(DecodeError::MemoryOutOfBounds {
            offset: start,
            end,
            available: memory.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_peek_counts_from_top() {
        let stack = vec![U256::from(1), U256::from(2), U256::from(3)];
        assert_eq!(peek(&stack, 0).unwrap(), U256::from(3));
        assert_eq!(peek(&stack, 2).unwrap(), U256::from(1));
        assert_eq!(
            peek(&stack, 3),
            Err(DecodeError::MissingOperand { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_address_truncates_high_bytes() {
        let plain = address!("00000000000000000000000000000000000000aa");
        let dirty = U256::from(0xaa) | (U256::from(0xff) << 200);
        assert_eq!(word_to_address(dirty), plain);
        assert_eq!(word_to_address(U256::from(0xaa)), plain);
    }

    #[test]
    fn test_memory_slice_bounds() {
        let memory = [1u8, 2, 3, 4, 5];
        assert_eq!(
            memory_slice(&memory, U256::from(1), U256::from(3)).unwrap(),
            &[2, 3, 4]
        );
        assert_eq!(
            memory_slice(&memory, U256::from(3), U256::from(4)),
            Err(DecodeError::MemoryOutOfBounds {
                offset: 3,
                end: 7,
                available: 5
            })
        );
        assert!(memory_slice(&memory, U256::MAX, U256::ZERO).unwrap().is_empty());
        assert_eq!(
            memory_slice(&memory, U256::MAX, U256::from(1)),
            Err(DecodeError::OperandOverflow(U256::MAX))
        );
    }
}

//! Revert payload decoding
//!
//! This module turns the raw output of a reverted frame into a readable
//! reason:
//! - `Error(string)` payloads yield their message
//! - `Panic(uint256)` payloads yield a description of the panic code
//! - Anything else is reported as `0x`-prefixed hex, never as raw text

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{hex, U256},
};

/// Selector of `Error(string)`
pub const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Readable revert reason of a frame's output
///
/// Returns `None` for empty output. Payloads that are not a well-formed
/// `Error(string)` or `Panic(uint256)` fall back to their hex encoding.
///
/// # Example
/// ```
/// use revm_native_trace::utils::error_utils::decode_revert_reason;
///
/// assert_eq!(decode_revert_reason(&[0xde, 0xad]), Some("0xdead".to_string()));
/// assert_eq!(decode_revert_reason(&[]), None);
/// ```
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.is_empty() {
        return None;
    }
    Some(parse_custom_error(output).unwrap_or_else(|| hex::encode_prefixed(output)))
}

/// Parse custom error output from a failed frame
///
/// Handles two kinds of payload:
/// 1. Error(string) - standard revert with message (selector: 0x08c379a0)
/// 2. Panic(uint256) - Solidity panic with error code (selector: 0x4e487b71)
///
/// # Returns
/// * `Some(String)` - Decoded error message or panic reason
/// * `None` - If the payload is not recognized or is malformed
pub fn parse_custom_error(output: &[u8]) -> Option<String> {
    let (selector, body) = output.split_first_chunk::<4>()?;
    match *selector {
        ERROR_SELECTOR => decode_error_string(body),
        PANIC_SELECTOR => {
            if let Ok(DynSolValue::Uint(code, _)) = DynSolType::Uint(256).abi_decode(body) {
                return Some(panic_reason(code));
            }
            None
        }
        _ => None,
    }
}

/// Strict ABI decoding of the `string` argument of `Error(string)`
///
/// Requires the offset word, the length word and the full UTF-8 payload to be
/// present; anything else is treated as malformed.
fn decode_error_string(body: &[u8]) -> Option<String> {
    if body.len() < 64 {
        return None;
    }
    let offset = read_length(body, 0)?;
    let length = read_length(body, offset)?;
    let start = offset.checked_add(32)?;
    let end = start.checked_add(length)?;
    let bytes = body.get(start..end)?;
    String::from_utf8(bytes.to_vec()).ok()
}

fn read_length(body: &[u8], at: usize) -> Option<usize> {
    let word = body.get(at..at.checked_add(32)?)?;
    let value = U256::from_be_slice(word);
    if value > U256::from(u32::MAX) {
        return None;
    }
    Some(value.to::<usize>())
}

fn panic_reason(code: U256) -> String {
    if code > U256::from(u64::MAX) {
        return format!("Panic: Unknown error code ({code:#x})");
    }
    match code.to::<u64>() {
        0x00 => "Panic: Generic compiler panic".to_string(),
        0x01 => "Panic: Assertion failed".to_string(),
        0x11 => "Panic: Arithmetic overflow".to_string(),
        0x12 => "Panic: Division by zero".to_string(),
        0x21 => "Panic: Invalid enum value".to_string(),
        0x22 => "Panic: Invalid storage byte array access".to_string(),
        0x31 => "Panic: Pop on empty array".to_string(),
        0x32 => "Panic: Array access out of bounds".to_string(),
        0x41 => "Panic: Out of memory".to_string(),
        0x51 => "Panic: Uninitialized function pointer".to_string(),
        code => format!("Panic: Unknown error code (0x{code:x})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::hex::decode;

    fn error_payload(message: &str) -> Vec<u8> {
        let mut payload = ERROR_SELECTOR.to_vec();
        payload.extend_from_slice(&U256::from(32).to_be_bytes::<32>());
        payload.extend_from_slice(&U256::from(message.len()).to_be_bytes::<32>());
        let mut data = message.as_bytes().to_vec();
        data.resize(message.len().div_ceil(32) * 32, 0);
        payload.extend_from_slice(&data);
        payload
    }

    #[test]
    fn test_parse_error_string() {
        // "Not enough Ether provided." encoded as Error(string)
        let output = decode("08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000001a4e6f7420656e6f7567682045746865722070726f76696465642e000000000000").unwrap();
        assert_eq!(
            parse_custom_error(&output),
            Some("Not enough Ether provided.".to_string())
        );
        assert_eq!(
            decode_revert_reason(&error_payload("insufficient balance")),
            Some("insufficient balance".to_string())
        );
    }

    #[test]
    fn test_parse_panic() {
        let output =
            decode("4e487b710000000000000000000000000000000000000000000000000000000000000011")
                .unwrap();
        assert_eq!(
            parse_custom_error(&output),
            Some("Panic: Arithmetic overflow".to_string())
        );
    }

    #[test]
    fn test_malformed_payload_falls_back_to_hex() {
        // Selector present but the length word points past the payload
        let mut truncated = error_payload("insufficient balance");
        truncated.truncate(4 + 64 + 4);
        assert_eq!(parse_custom_error(&truncated), None);
        assert_eq!(
            decode_revert_reason(&truncated),
            Some(hex::encode_prefixed(&truncated))
        );

        // Printable bytes without a selector are still hex
        assert_eq!(
            decode_revert_reason(b"oops"),
            Some("0x6f6f7073".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_is_not_decoded() {
        let mut payload = error_payload("ab");
        payload[4 + 64] = 0xff;
        assert_eq!(parse_custom_error(&payload), None);
        assert!(decode_revert_reason(&payload).unwrap().starts_with("0x08c379a0"));
    }
}

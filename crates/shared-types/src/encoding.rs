//! # Hex Encoding
//!
//! `0x`-prefixed hex helpers for addresses, hashes and 256-bit quantities.

use primitive_types::U256;

use crate::entities::{Address, Hash};
use crate::errors::HexError;

/// Strip the mandatory `0x` / `0X` prefix.
pub fn strip_0x(s: &str) -> Result<&str, HexError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(HexError::MissingPrefix)
}

/// Decode `0x`-prefixed hex of any even length.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_0x(s.trim())?).map_err(|e| HexError::InvalidHex(e.to_string()))
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != N {
        return Err(HexError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse an address, ignoring case (checksummed input is accepted as-is).
pub fn parse_address(s: &str) -> Result<Address, HexError> {
    decode_fixed::<20>(s)
}

/// Parse a 32-byte hash.
pub fn parse_hash(s: &str) -> Result<Hash, HexError> {
    decode_fixed::<32>(s)
}

/// Canonical lower-case form of an address.
pub fn address_to_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Canonical lower-case form of a hash.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Render a 256-bit value as `0x` followed by exactly 64 hex digits.
pub fn u256_to_fixed_hex(value: U256) -> String {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    format!("0x{}", hex::encode(buf))
}

/// Parse a JSON-RPC quantity (`0x0`, `0x1bc16d674ec80000`, ...) into a U256.
pub fn parse_u256_quantity(s: &str) -> Result<U256, HexError> {
    let digits = strip_0x(s.trim())?;
    if digits.is_empty() {
        return Err(HexError::InvalidHex("empty quantity".into()));
    }
    if digits.len() > 64 {
        return Err(HexError::Overflow);
    }
    U256::from_str_radix(digits, 16).map_err(|e| HexError::InvalidHex(format!("{e:?}")))
}

/// Parse a JSON-RPC quantity that must fit in 64 bits (block numbers, timestamps).
pub fn parse_u64_quantity(s: &str) -> Result<u64, HexError> {
    let digits = strip_0x(s.trim())?;
    if digits.is_empty() {
        return Err(HexError::InvalidHex("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16).map_err(|e| HexError::InvalidHex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_is_case_insensitive() {
        let lower = parse_address("0x00a329c0648769a73afac7f9381e08fb43dbea72").unwrap();
        let mixed = parse_address("0x00a329C0648769A73afAc7F9381E08FB43dBEA72").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(
            address_to_hex(&mixed),
            "0x00a329c0648769a73afac7f9381e08fb43dbea72"
        );
    }

    #[test]
    fn test_parse_address_rejects_bad_input() {
        assert_eq!(
            parse_address("00a329c0648769a73afac7f9381e08fb43dbea72"),
            Err(HexError::MissingPrefix)
        );
        assert!(matches!(
            parse_address("0x00a329"),
            Err(HexError::InvalidLength { expected: 20, .. })
        ));
        assert!(matches!(
            parse_address("0xzz"),
            Err(HexError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_fixed_hex_width() {
        assert_eq!(u256_to_fixed_hex(U256::zero()), format!("0x{}", "0".repeat(64)));
        assert_eq!(u256_to_fixed_hex(U256::MAX), format!("0x{}", "f".repeat(64)));
    }

    #[test]
    fn test_quantities() {
        assert_eq!(parse_u64_quantity("0x1b4").unwrap(), 436);
        assert_eq!(
            parse_u256_quantity("0xde0b6b3a7640000").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert!(parse_u256_quantity("0x").is_err());
        assert_eq!(
            parse_u256_quantity(&format!("0x1{}", "0".repeat(64))),
            Err(HexError::Overflow)
        );
    }
}

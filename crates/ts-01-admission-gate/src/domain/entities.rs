//! # Domain Entities
//!
//! Claims and signatures as they arrive at the gate.

use serde::{Deserialize, Serialize};

/// A request to be admitted: the address the caller claims, the challenge
/// it signed and the RPC-encoded signature. Verified, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaim {
    /// Claimed signer, `0x`-prefixed hex in any case.
    pub claimed_address: String,
    /// The challenge message that was signed.
    pub message: String,
    /// `0x` + r ‖ s ‖ v, 65 bytes.
    pub signature: String,
}

/// ECDSA signature on the secp256k1 curve in RPC layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSignature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes)
    pub s: [u8; 32],
    /// Recovery value, normalised to 27 or 28 when parsed from 0/1.
    pub v: u8,
}

impl RpcSignature {
    /// Encode back into `0x` + r ‖ s ‖ v.
    pub fn to_rpc_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&self.r);
        bytes.extend_from_slice(&self.s);
        bytes.push(self.v);
        format!("0x{}", hex::encode(bytes))
    }
}

//! # Personal-Message Signatures (secp256k1)
//!
//! Pure domain logic for proving that a claimed address signed a challenge.
//!
//! ## Security Notes
//!
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - **Malleability Prevention (homestead)**: S must not exceed n/2
//! - **Constant-Time Comparisons**: range checks use `subtle`
//! - Recovery itself is delegated to `k256`; no secret material is handled

use super::entities::RpcSignature;
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use shared_types::{address_to_hex, decode_hex, Address, Hash};
use subtle::{Choice, ConstantTimeEq};

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// floor(n / 2)
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

// =============================================================================
// PARSING
// =============================================================================

impl RpcSignature {
    /// Parse `0x` + r ‖ s ‖ v. A v of 0 or 1 is lifted to 27 or 28.
    pub fn from_rpc_hex(signature: &str) -> Result<Self, SignatureError> {
        let bytes =
            decode_hex(signature).map_err(|e| SignatureError::InvalidFormat(e.to_string()))?;
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidFormat(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);

        let mut v = bytes[64];
        if v < 27 {
            v += 27;
        }

        Ok(Self { r, s, v })
    }
}

// =============================================================================
// CORE FUNCTIONS
// =============================================================================

/// Keccak-256 of the personal-message envelope around `message`.
pub fn hash_personal_message(message: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Structural validity: v in {27, 28}, R and S in range, S in lower half.
pub fn check_signature_components(signature: &RpcSignature) -> Result<(), SignatureError> {
    if signature.v != 27 && signature.v != 28 {
        return Err(SignatureError::InvalidRecoveryId(signature.v));
    }
    if !is_valid_scalar(&signature.r) || !is_valid_scalar(&signature.s) {
        return Err(SignatureError::ScalarOutOfRange);
    }
    if is_high_s(&signature.s) {
        return Err(SignatureError::MalleableSignature);
    }
    Ok(())
}

/// Recover the signer's address from a message hash.
pub fn recover_address(message_hash: &Hash, signature: &RpcSignature) -> Result<Address, SignatureError> {
    check_signature_components(signature)?;

    let recovery_id = RecoveryId::try_from(signature.v - 27)
        .map_err(|_| SignatureError::InvalidRecoveryId(signature.v))?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| SignatureError::ScalarOutOfRange)?;

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_from_pubkey(&recovered_key))
}

/// Verify that `claimed` signed `message`.
///
/// Has no side effects. Returns the canonical address on success.
pub fn verify_signature(
    claimed: &Address,
    message: &[u8],
    signature: &RpcSignature,
) -> Result<Address, SignatureError> {
    let message_hash = hash_personal_message(message);
    let recovered = recover_address(&message_hash, signature)?;

    if !bool::from(recovered[..].ct_eq(&claimed[..])) {
        return Err(SignatureError::SignerMismatch {
            expected: address_to_hex(claimed),
            actual: address_to_hex(&recovered),
        });
    }

    Ok(recovered)
}

/// Sign `message` as a personal message and return the RPC encoding.
///
/// This is what a wallet does client-side before calling `/register`.
pub fn sign_personal_message(key: &SigningKey, message: &[u8]) -> Result<String, SignatureError> {
    let message_hash = hash_personal_message(message);
    let (sig, recid) = key
        .sign_prehash_recoverable(&message_hash)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    let sig_bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&sig_bytes[..32]);
    s.copy_from_slice(&sig_bytes[32..]);

    // Normalize S to the lower half, flipping the recovery id with it.
    let (s, v) = if is_high_s(&s) {
        (invert_s(&s), 27 + (recid.to_byte() ^ 1))
    } else {
        (s, 27 + recid.to_byte())
    };

    Ok(RpcSignature { r, s, v }.to_rpc_hex())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Derive Ethereum address from public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let pubkey_slice = pubkey_bytes.as_bytes();

    // Keccak256 hash of public key (without 0x04 prefix)
    let hash = Keccak256::digest(&pubkey_slice[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Constant-time big-endian comparison, returning (less, greater).
fn ct_compare(a: &[u8; 32], b: &[u8; 32]) -> (Choice, Choice) {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        let byte_less = Choice::from((a[i] < b[i]) as u8);
        let byte_greater = Choice::from((a[i] > b[i]) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    (less, greater)
}

/// S strictly above floor(n/2).
fn is_high_s(s: &[u8; 32]) -> bool {
    let (_, greater) = ct_compare(s, &SECP256K1_HALF_ORDER);
    greater.into()
}

/// Scalar in [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }

    let (less, _) = ct_compare(scalar, &SECP256K1_ORDER);
    (!is_zero & less).into()
}

/// s' = n - s
fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }

    result
}

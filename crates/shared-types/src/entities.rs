//! # Domain Entities
//!
//! Chain primitives and the sale-specific records built on top of them.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::encoding::u256_to_fixed_hex;

/// 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// Transaction hash.
pub type TxHash = Hash;

/// Ethereum-style address (last 20 bytes of keccak256(pubkey)).
pub type Address = [u8; 20];

/// Block height.
pub type BlockNumber = u64;

/// Unix timestamp in seconds, as found in block headers.
pub type Timestamp = u64;

/// The subset of a block header the workspace cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height.
    pub number: BlockNumber,
    /// Block timestamp (seconds).
    pub timestamp: Timestamp,
}

// =============================================================================
// SALE EVENTS
// =============================================================================

/// Sale contract events that move the accounted total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A contribution made through the public `buyin` entry point.
    Buyin,
    /// A contribution injected by the sale administrator.
    Injected,
}

impl EventKind {
    /// All kinds that contribute to the ledger.
    pub const ALL: [EventKind; 2] = [EventKind::Buyin, EventKind::Injected];

    /// Event name as it appears in the contract ABI.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Buyin => "Buyin",
            EventKind::Injected => "Injected",
        }
    }

    /// Parse an ABI event name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Buyin" => Some(EventKind::Buyin),
            "Injected" => Some(EventKind::Injected),
            _ => None,
        }
    }
}

/// A log entry as delivered by the chain client, before validation.
///
/// Pending logs carry no block number, and logs the client failed to decode
/// carry no accounted amount. Both are rejected by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Emitting contract.
    pub contract: Address,
    /// Block the log was included in, if mined.
    pub block_number: Option<BlockNumber>,
    /// Position of the log within its block.
    pub log_index: u64,
    /// ABI event name.
    pub kind: String,
    /// Contract-computed credited value.
    pub accounted: Option<U256>,
}

impl RawEvent {
    /// Build a well-formed mined event.
    pub fn mined(
        contract: Address,
        block_number: BlockNumber,
        log_index: u64,
        kind: EventKind,
        accounted: U256,
    ) -> Self {
        Self {
            contract,
            block_number: Some(block_number),
            log_index,
            kind: kind.as_str().to_string(),
            accounted: Some(accounted),
        }
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// One collapsed point of the cumulative ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Block the entry summarises.
    pub block_number: BlockNumber,
    /// Timestamp of that block.
    pub timestamp: Timestamp,
    /// Cumulative accounted total at the end of that block.
    pub total_accounted: U256,
}

/// Wire form of a ledger entry served to chart clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// Block timestamp (seconds).
    pub time: Timestamp,
    /// Cumulative total as `0x` + 64 hex digits.
    pub total_accounted: String,
}

impl From<&LedgerEntry> for ChartPoint {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            time: entry.timestamp,
            total_accounted: u256_to_fixed_hex(entry.total_accounted),
        }
    }
}

// =============================================================================
// ACCOUNT STATE
// =============================================================================

/// Authoritative per-address sale state read from chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressState {
    /// Account balance in wei.
    pub balance: U256,
    /// Whether the certifier contract lists the address.
    pub certified: bool,
    /// Whether the fee registrar has recorded a payment for the address.
    pub fee_paid: bool,
    /// Total already accounted to the address by the sale contract.
    pub accounted: U256,
}

/// Status of a purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Not mined yet (or unknown to the node).
    Unknown,
    /// Mined and accepted by the sale contract.
    Success {
        /// Value credited by the contract.
        accounted: U256,
        /// Value actually received.
        received: U256,
    },
    /// Mined but reverted.
    Failed,
}

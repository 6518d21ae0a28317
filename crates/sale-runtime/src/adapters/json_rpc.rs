//! # JSON-RPC Chain Adapter
//!
//! Implements [`BlockSource`] and [`LogSource`] with `eth_blockNumber`,
//! `eth_getBlockByNumber` and `eth_getLogs`.
//!
//! Sale events are matched on their first topic:
//!
//! | Event | Signature |
//! |-------|-----------|
//! | `Buyin` | `Buyin(address,uint256,uint256,uint256)` |
//! | `Injected` | `Injected(address,uint256,uint256)` |
//!
//! Both carry `accounted` as their first non-indexed word.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use shared_types::{
    address_to_hex, decode_hex, hash_to_hex, parse_address, parse_u64_quantity, Address,
    BlockHeader, BlockNumber, ChainError, EventKind, Hash, RawEvent, U256,
};
use tracing::{debug, trace, warn};
use ts_02_event_ledger::{BlockSource, LogFilter, LogSource};

/// Keccak-256 of the event signature of `kind`.
pub fn event_topic(kind: EventKind) -> Hash {
    let signature = match kind {
        EventKind::Buyin => "Buyin(address,uint256,uint256,uint256)",
        EventKind::Injected => "Injected(address,uint256,uint256)",
    };
    Keccak256::digest(signature.as_bytes()).into()
}

/// A log object as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    /// `null` for pending logs.
    pub block_number: Option<String>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// Turn an RPC log into a [`RawEvent`].
///
/// Only the contract address must decode. Anything else that is missing or
/// unrecognised is left for the ledger to reject.
pub fn decode_log(log: &RpcLog) -> Result<RawEvent, ChainError> {
    let contract =
        parse_address(&log.address).map_err(|e| ChainError::Decode(format!("log address: {e}")))?;
    let block_number = log
        .block_number
        .as_deref()
        .and_then(|n| parse_u64_quantity(n).ok());
    let log_index = log
        .log_index
        .as_deref()
        .and_then(|n| parse_u64_quantity(n).ok())
        .unwrap_or_default();

    let topic0 = log.topics.first().map(|t| t.to_ascii_lowercase());
    let kind = EventKind::ALL
        .into_iter()
        .find(|k| topic0.as_deref() == Some(hash_to_hex(&event_topic(*k)).as_str()))
        .map(|k| k.as_str().to_string())
        .or(topic0)
        .unwrap_or_default();

    let accounted = decode_hex(&log.data)
        .ok()
        .filter(|data| data.len() >= 32)
        .map(|data| U256::from_big_endian(&data[..32]));

    Ok(RawEvent {
        contract,
        block_number,
        log_index,
        kind,
        accounted,
    })
}

/// Decode a batch, dropping logs whose contract address is unreadable so
/// one bad entry does not hide the rest of the range.
pub fn decode_logs(logs: &[RpcLog]) -> Vec<RawEvent> {
    logs.iter()
        .filter_map(|log| match decode_log(log) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(
                    address = %log.address,
                    block = ?log.block_number,
                    error = %err,
                    "Dropping undecodable log"
                );
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcBlock {
    number: String,
    timestamp: String,
}

/// Chain client over HTTP JSON-RPC.
pub struct JsonRpcChain {
    http: reqwest::Client,
    url: String,
    contract: Address,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    /// Client for `url`, querying logs of `contract`.
    pub fn new(url: impl Into<String>, contract: Address, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            contract,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "JSON-RPC request");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout
                } else {
                    ChainError::Unavailable(e.to_string())
                }
            })?;
        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(ChainError::Unavailable(format!(
                "{method} failed ({}): {}",
                err.code, err.message
            )));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl BlockSource for JsonRpcChain {
    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, ChainError> {
        let block: RpcBlock = self
            .call("eth_getBlockByNumber", json!([format!("0x{number:x}"), false]))
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("block {number}")))?;
        let decode = |e: shared_types::HexError| ChainError::Decode(format!("block {number}: {e}"));
        Ok(BlockHeader {
            number: parse_u64_quantity(&block.number).map_err(decode)?,
            timestamp: parse_u64_quantity(&block.timestamp).map_err(decode)?,
        })
    }

    async fn latest_block(&self) -> Result<BlockNumber, ChainError> {
        let head: String = self
            .call("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| ChainError::Decode("eth_blockNumber returned null".into()))?;
        parse_u64_quantity(&head).map_err(|e| ChainError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LogSource for JsonRpcChain {
    async fn get_logs(
        &self,
        kinds: &[EventKind],
        filter: LogFilter,
    ) -> Result<Vec<RawEvent>, ChainError> {
        let topics: Vec<String> = kinds.iter().map(|k| hash_to_hex(&event_topic(*k))).collect();
        let params = json!([{
            "address": address_to_hex(&self.contract),
            "fromBlock": format!("0x{:x}", filter.from),
            "toBlock": format!("0x{:x}", filter.to),
            "topics": [topics],
        }]);

        let logs: Vec<RpcLog> = self.call("eth_getLogs", params).await?.unwrap_or_default();
        debug!(from = filter.from, to = filter.to, count = logs.len(), "Fetched sale logs");
        Ok(decode_logs(&logs))
    }
}

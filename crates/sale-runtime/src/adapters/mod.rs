//! # Adapters
//!
//! Implementations of the chain ports over a node's JSON-RPC interface.

pub mod json_rpc;

pub use json_rpc::{decode_log, decode_logs, event_topic, JsonRpcChain, RpcLog};

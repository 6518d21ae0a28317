//! # Integration Flows

pub mod ledger_flow;
pub mod reconciliation_flow;
pub mod registration_flow;

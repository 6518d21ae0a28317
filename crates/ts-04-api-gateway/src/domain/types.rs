//! # Request and Response Bodies

use serde::{Deserialize, Serialize};

/// `POST /register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Claimed address, `0x`-prefixed.
    pub address: String,
    /// Signature of the challenge, `0x` + r ‖ s ‖ v.
    pub signature: String,
}

/// `POST /register` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Verified address, lower-case hex.
    pub address: String,
    pub registered: bool,
}

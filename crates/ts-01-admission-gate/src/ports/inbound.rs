//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::SignedClaim;
use crate::domain::errors::AdmissionError;
use async_trait::async_trait;
use shared_types::Address;

/// Admission API.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait AdmissionApi: Send + Sync {
    /// Verify that `claimed_address` signed `message`.
    ///
    /// Pure: no state is read or written.
    fn verify_signature(
        &self,
        claimed_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<Address, AdmissionError>;

    /// Record `claimed_address` against `origin`, failing with
    /// `QuotaExceeded` when the origin already uses its maximum.
    ///
    /// Re-admitting an address already on file always succeeds.
    async fn check_quota(&self, origin: &str, claimed_address: &str) -> Result<(), AdmissionError>;

    /// Verify the claim, then charge the quota with the verified address.
    async fn admit(&self, origin: &str, claim: &SignedClaim) -> Result<Address, AdmissionError>;
}

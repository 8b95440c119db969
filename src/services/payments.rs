use async_trait::async_trait;
use thiserror::Error;

use crate::db::enums::Plan;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Confirms with the payment provider that `reference` paid `amount` for `plan`.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, reference: &str, plan: Plan, amount: i64) -> Result<bool, PaymentError>;
}

/// Accepts any non-empty reference. Stands in for a real gateway check.
pub struct ReferenceVerifier;

#[async_trait]
impl PaymentVerifier for ReferenceVerifier {
    async fn verify(&self, reference: &str, _plan: Plan, _amount: i64) -> Result<bool, PaymentError> {
        Ok(!reference.trim().is_empty())
    }
}

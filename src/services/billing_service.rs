use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::db::entities::payment;
use crate::db::enums::{PaymentStatus, Plan};
use crate::db::services::{self, PaymentRecord};
use crate::services::payments::PaymentVerifier;
use crate::web::error::AppError;

/// Verifies the payment reference for `plan` and records the attempt. A
/// verified payment moves the user onto the plan; a declined one is kept in
/// the payment history and reported as `PaymentRequired`.
pub async fn upgrade_plan(
    db: &DatabaseConnection,
    verifier: &dyn PaymentVerifier,
    user_id: i32,
    plan: Plan,
    reference: &str,
) -> Result<payment::Model, AppError> {
    if plan == Plan::Free {
        return Err(AppError::InvalidInput("Cannot purchase the free plan.".to_string()));
    }
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(AppError::InvalidInput("A payment reference is required.".to_string()));
    }

    let amount = plan.monthly_price();
    let verified = verifier
        .verify(reference, plan, amount)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let status = if verified {
        PaymentStatus::Success
    } else {
        PaymentStatus::Failed
    };

    let saved = services::record_payment(
        db,
        user_id,
        PaymentRecord {
            plan,
            amount,
            reference: reference.to_string(),
            status,
        },
    )
    .await?;

    if verified {
        info!(user_id, %plan, payment_id = saved.id, "Plan upgraded.");
        Ok(saved)
    } else {
        warn!(user_id, %plan, %reference, "Payment could not be verified.");
        Err(AppError::PaymentRequired(
            "Payment could not be verified".to_string(),
        ))
    }
}

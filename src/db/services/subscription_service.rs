use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::Serialize;

use crate::db::entities::{payment, user};
use crate::db::enums::{PaymentStatus, Plan, SubscriptionStatus};

// --- Subscription Service Functions ---

pub const BILLING_PERIOD_DAYS: i64 = 30;
pub const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub payments: Vec<payment::Model>,
}

/// Outcome of a checked payment, ready to be recorded.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub plan: Plan,
    pub amount: i64,
    pub reference: String,
    pub status: PaymentStatus,
}

pub async fn get_subscription(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<SubscriptionSummary>, DbErr> {
    let Some(found) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };
    let payments = payment::Entity::find()
        .filter(payment::Column::UserId.eq(user_id))
        .order_by_desc(payment::Column::PaidAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await?;

    Ok(Some(SubscriptionSummary {
        plan: found.plan,
        subscription_status: found.subscription_status,
        next_billing_date: found.next_billing_date,
        payments,
    }))
}

/// Records a payment and, when it succeeded, moves the user onto the paid
/// plan for one billing period. Both writes commit together.
pub async fn record_payment(
    db: &DatabaseConnection,
    user_id: i32,
    record: PaymentRecord,
) -> Result<payment::Model, TransactionError<DbErr>> {
    db.transaction::<_, payment::Model, DbErr>(move |txn| {
        Box::pin(async move {
            let now = Utc::now();
            let saved = payment::ActiveModel {
                user_id: Set(user_id),
                amount: Set(record.amount),
                currency: Set(DEFAULT_CURRENCY.to_string()),
                status: Set(record.status),
                plan: Set(record.plan),
                reference: Set(record.reference),
                paid_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            if record.status == PaymentStatus::Success {
                let found = user::Entity::find_by_id(user_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| DbErr::RecordNotFound(format!("user {user_id}")))?;
                let mut active_user = found.into_active_model();
                active_user.plan = Set(record.plan);
                active_user.subscription_status = Set(SubscriptionStatus::Active);
                active_user.next_billing_date = Set(Some(now + Duration::days(BILLING_PERIOD_DAYS)));
                active_user.updated_at = Set(now);
                active_user.update(txn).await?;
            }

            Ok(saved)
        })
    })
    .await
}

pub async fn cancel_subscription(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    let Some(found) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };
    let mut active_user = found.into_active_model();
    active_user.subscription_status = Set(SubscriptionStatus::Cancelled);
    active_user.updated_at = Set(Utc::now());
    active_user.update(db).await.map(Some)
}

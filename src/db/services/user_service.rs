use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};

use crate::db::entities::{link, payment, profile, user};
use crate::db::enums::{Plan, SubscriptionStatus, UserRole};

// --- User Service Functions ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: String,
}

/// Account changes an administrator may make.
#[derive(Debug, Clone, Default)]
pub struct AdminUserChanges {
    pub plan: Option<Plan>,
    pub role: Option<UserRole>,
    pub is_verified: Option<bool>,
}

/// Creates an unverified user together with their default profile.
pub async fn create_user_with_profile(
    db: &DatabaseConnection,
    new_user: NewUser,
) -> Result<user::Model, TransactionError<DbErr>> {
    db.transaction::<_, user::Model, DbErr>(move |txn| {
        Box::pin(async move {
            let now = Utc::now();
            let created = user::ActiveModel {
                username: Set(new_user.username.clone()),
                email: Set(new_user.email),
                password_hash: Set(new_user.password_hash),
                role: Set(UserRole::User),
                plan: Set(Plan::Free),
                is_verified: Set(false),
                verification_token: Set(Some(new_user.verification_token)),
                subscription_status: Set(SubscriptionStatus::Active),
                next_billing_date: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            profile::ActiveModel {
                user_id: Set(created.id),
                display_name: Set(new_user.username.clone()),
                bio: Set(format!("Welcome to {}'s profile!", new_user.username)),
                avatar_url: Set(None),
                theme: Set("default".to_string()),
                font_family: Set("sans".to_string()),
                bg_image_url: Set(None),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;

            Ok(created)
        })
    })
    .await
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

/// Retrieves a user by their email address.
pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

/// Marks the user holding `token` as verified and consumes the token.
pub async fn verify_user_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<user::Model>, DbErr> {
    let Some(found) = user::Entity::find()
        .filter(user::Column::VerificationToken.eq(token))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let mut active_user = found.into_active_model();
    active_user.is_verified = Set(true);
    active_user.verification_token = Set(None);
    active_user.updated_at = Set(Utc::now());
    active_user.update(db).await.map(Some)
}

pub async fn update_password_hash(
    db: &DatabaseConnection,
    user_id: i32,
    password_hash: String,
) -> Result<Option<user::Model>, DbErr> {
    let Some(found) = get_user_by_id(db, user_id).await? else {
        return Ok(None);
    };
    let mut active_user = found.into_active_model();
    active_user.password_hash = Set(password_hash);
    active_user.updated_at = Set(Utc::now());
    active_user.update(db).await.map(Some)
}

pub async fn update_username(
    db: &DatabaseConnection,
    user_id: i32,
    username: String,
) -> Result<Option<user::Model>, DbErr> {
    let Some(found) = get_user_by_id(db, user_id).await? else {
        return Ok(None);
    };
    let mut active_user = found.into_active_model();
    active_user.username = Set(username);
    active_user.updated_at = Set(Utc::now());
    active_user.update(db).await.map(Some)
}

/// Retrieves every account, oldest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
}

pub async fn admin_update_user(
    db: &DatabaseConnection,
    user_id: i32,
    changes: AdminUserChanges,
) -> Result<Option<user::Model>, DbErr> {
    let Some(found) = get_user_by_id(db, user_id).await? else {
        return Ok(None);
    };
    let mut active_user = found.into_active_model();
    if let Some(plan) = changes.plan {
        active_user.plan = Set(plan);
    }
    if let Some(role) = changes.role {
        active_user.role = Set(role);
    }
    if let Some(is_verified) = changes.is_verified {
        active_user.is_verified = Set(is_verified);
        if is_verified {
            active_user.verification_token = Set(None);
        }
    }
    active_user.updated_at = Set(Utc::now());
    active_user.update(db).await.map(Some)
}

/// Deletes a user and everything they own in one transaction.
pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<u64, TransactionError<DbErr>> {
    db.transaction::<_, u64, DbErr>(move |txn| {
        Box::pin(async move {
            link::Entity::delete_many()
                .filter(link::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            payment::Entity::delete_many()
                .filter(payment::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            profile::Entity::delete_by_id(user_id).exec(txn).await?;
            let result = user::Entity::delete_by_id(user_id).exec(txn).await?;
            Ok(result.rows_affected)
        })
    })
    .await
}

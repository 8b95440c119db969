use chrono::Utc;
use sea_orm::{
    prelude::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::api_key;

// --- API Key Service Functions ---

/// Stores a new key. Only the bcrypt hash of the secret is persisted.
pub async fn insert_api_key(
    db: &DatabaseConnection,
    name: &str,
    prefix: &str,
    key_hash: String,
) -> Result<api_key::Model, DbErr> {
    api_key::ActiveModel {
        name: Set(name.to_owned()),
        prefix: Set(prefix.to_owned()),
        key_hash: Set(key_hash),
        revoked: Set(false),
        created_at: Set(Utc::now()),
        last_used_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn list_api_keys(db: &DatabaseConnection) -> Result<Vec<api_key::Model>, DbErr> {
    api_key::Entity::find()
        .order_by_asc(api_key::Column::Id)
        .all(db)
        .await
}

pub async fn find_active_api_key_by_prefix(
    db: &DatabaseConnection,
    prefix: &str,
) -> Result<Option<api_key::Model>, DbErr> {
    api_key::Entity::find()
        .filter(api_key::Column::Prefix.eq(prefix))
        .filter(api_key::Column::Revoked.eq(false))
        .one(db)
        .await
}

pub async fn touch_api_key(db: &DatabaseConnection, key_id: i32) -> Result<u64, DbErr> {
    let result = api_key::Entity::update_many()
        .col_expr(api_key::Column::LastUsedAt, Expr::value(Some(Utc::now())))
        .filter(api_key::Column::Id.eq(key_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn revoke_api_key(db: &DatabaseConnection, key_id: i32) -> Result<u64, DbErr> {
    let result = api_key::Entity::update_many()
        .col_expr(api_key::Column::Revoked, Expr::value(true))
        .filter(api_key::Column::Id.eq(key_id))
        .filter(api_key::Column::Revoked.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

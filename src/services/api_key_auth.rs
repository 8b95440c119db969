use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::db::entities::api_key;
use crate::db::services;
use crate::services::random_hex;
use crate::web::error::AppError;
use crate::web::models::AdminPrincipal;

/// Number of leading characters of a key stored in clear for lookup.
pub const KEY_PREFIX_LEN: usize = 8;
const KEY_BYTES: usize = 24;

pub struct IssuedApiKey {
    pub record: api_key::Model,
    pub secret: String,
}

/// Generates a new admin key. The plaintext is returned once and never stored.
pub async fn issue_api_key(
    db: &DatabaseConnection,
    name: &str,
    hash_cost: u32,
) -> Result<IssuedApiKey, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("API key name is required.".to_string()));
    }

    let secret = random_hex(KEY_BYTES);
    let prefix = &secret[..KEY_PREFIX_LEN];
    let key_hash = bcrypt::hash(&secret, hash_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let record = services::insert_api_key(db, name, prefix, key_hash)
        .await
        .map_err(|e| AppError::from_db_conflict(e, "API key prefix collision, try again"))?;
    info!(key_id = record.id, name = %record.name, "API key issued.");

    Ok(IssuedApiKey { record, secret })
}

/// Checks a presented key against the bootstrap key and the stored keys.
pub async fn authenticate_api_key(
    db: &DatabaseConnection,
    presented: &str,
    bootstrap_key: Option<&str>,
) -> Result<AdminPrincipal, AppError> {
    if let Some(bootstrap) = bootstrap_key {
        if presented == bootstrap {
            return Ok(AdminPrincipal::Bootstrap);
        }
    }

    let rejected = || AppError::Unauthorized("Invalid API key".to_string());
    let prefix = presented.get(..KEY_PREFIX_LEN).ok_or_else(rejected)?;
    let Some(record) = services::find_active_api_key_by_prefix(db, prefix).await? else {
        return Err(rejected());
    };

    let valid = bcrypt::verify(presented, &record.key_hash).unwrap_or(false);
    if !valid {
        warn!(key_id = record.id, "API key failed verification.");
        return Err(rejected());
    }

    services::touch_api_key(db, record.id).await?;
    Ok(AdminPrincipal::ApiKey {
        id: record.id,
        name: record.name,
    })
}

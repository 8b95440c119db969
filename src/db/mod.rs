use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    TransactionError,
};
use std::time::Duration;
use tracing::info;

use crate::db::entities::{api_key, link, payment, profile, user};

pub mod entities;
pub mod enums;
pub mod services;

/// Opens the shared connection pool. Every request borrows from this pool;
/// there is no other process-wide storage handle.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// Collapses the two failure points of a transaction (begin/commit or the
/// body itself) into the underlying database error.
pub fn flatten_transaction_error(err: TransactionError<DbErr>) -> DbErr {
    match err {
        TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
    }
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates any missing table. Parents are created before the tables that
/// reference them.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, user::Entity).await?;
    create_table(db, &schema, profile::Entity).await?;
    create_table(db, &schema, link::Entity).await?;
    create_table(db, &schema, payment::Entity).await?;
    create_table(db, &schema, api_key::Entity).await?;

    info!("Database schema is up to date.");
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use super::{connect, ensure_schema};
    use crate::db::entities::user;
    use crate::db::enums::{Plan, SubscriptionStatus, UserRole};

    /// A migrated SQLite database living in a temporary directory.
    pub struct TestDb {
        pub db: DatabaseConnection,
        _dir: tempfile::TempDir,
    }

    pub async fn test_db() -> TestDb {
        test_db_with(1).await
    }

    /// Same as `test_db`, with a pool large enough for transactions to run
    /// side by side.
    pub async fn test_db_with(max_connections: u32) -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = connect(&url, max_connections).await.unwrap();
        ensure_schema(&db).await.unwrap();
        TestDb { db, _dir: dir }
    }

    pub async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set("not-a-real-hash".to_string()),
            role: Set(UserRole::User),
            plan: Set(Plan::Free),
            is_verified: Set(true),
            verification_token: Set(None),
            subscription_status: Set(SubscriptionStatus::Active),
            next_billing_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }
}

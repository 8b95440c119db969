use chrono::Utc;
use sea_orm::{
    prelude::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::db::entities::link;
use crate::db::flatten_transaction_error;

// --- Link Service Functions ---

/// One `(link id, new position)` pair of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPosition {
    pub id: i32,
    pub position: i32,
}

#[derive(Error, Debug)]
pub enum ReorderError {
    #[error("Link {0} appears more than once in the batch")]
    DuplicateId(i32),
    #[error("Position {0} is assigned to more than one link")]
    DuplicatePosition(i32),
    #[error("Position {position} for link {id} is negative")]
    NegativePosition { id: i32, position: i32 },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<TransactionError<DbErr>> for ReorderError {
    fn from(err: TransactionError<DbErr>) -> Self {
        ReorderError::Database(flatten_transaction_error(err))
    }
}

/// Rejects batches that cannot describe a single ordering: repeated ids,
/// repeated positions, or negative positions.
pub fn validate_reorder(entries: &[LinkPosition]) -> Result<(), ReorderError> {
    let mut seen_ids = HashSet::with_capacity(entries.len());
    let mut seen_positions = HashSet::with_capacity(entries.len());

    for entry in entries {
        if entry.position < 0 {
            return Err(ReorderError::NegativePosition {
                id: entry.id,
                position: entry.position,
            });
        }
        if !seen_ids.insert(entry.id) {
            return Err(ReorderError::DuplicateId(entry.id));
        }
        if !seen_positions.insert(entry.position) {
            return Err(ReorderError::DuplicatePosition(entry.position));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub is_product: bool,
}

/// Field edits for an existing link. `None` leaves the field untouched;
/// `price: Some(None)` removes the price.
#[derive(Debug, Clone, Default)]
pub struct LinkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub price: Option<Option<i64>>,
    pub is_product: Option<bool>,
    pub active: Option<bool>,
    pub position: Option<i32>,
}

/// Retrieves all links of a user in display order.
pub async fn get_links_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<link::Model>, DbErr> {
    link::Entity::find()
        .filter(link::Column::UserId.eq(user_id))
        .order_by_asc(link::Column::Position)
        .order_by_asc(link::Column::Id)
        .all(db)
        .await
}

/// Retrieves the links shown on a public profile, in display order.
pub async fn get_active_links_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<link::Model>, DbErr> {
    link::Entity::find()
        .filter(link::Column::UserId.eq(user_id))
        .filter(link::Column::Active.eq(true))
        .order_by_asc(link::Column::Position)
        .order_by_asc(link::Column::Id)
        .all(db)
        .await
}

/// Appends a link to the end of the user's list: its position is the number
/// of links the user already has.
pub async fn create_link(
    db: &DatabaseConnection,
    user_id: i32,
    new_link: NewLink,
) -> Result<link::Model, TransactionError<DbErr>> {
    db.transaction::<_, link::Model, DbErr>(move |txn| {
        Box::pin(async move {
            let count = link::Entity::find()
                .filter(link::Column::UserId.eq(user_id))
                .count(txn)
                .await?;
            let position = i32::try_from(count)
                .map_err(|_| DbErr::Custom(format!("User {user_id} has too many links")))?;

            let now = Utc::now();
            let model = link::ActiveModel {
                user_id: Set(user_id),
                title: Set(new_link.title),
                url: Set(new_link.url),
                icon: Set(new_link.icon),
                color: Set(new_link.color),
                price: Set(new_link.price),
                is_product: Set(new_link.is_product),
                position: Set(position),
                active: Set(true),
                clicks: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            model.insert(txn).await
        })
    })
    .await
}

/// Applies field edits to a link owned by `user_id`. Returns `None` when the
/// link does not exist or belongs to someone else.
pub async fn update_link(
    db: &DatabaseConnection,
    link_id: i32,
    user_id: i32, // for authorization
    changes: LinkChanges,
) -> Result<Option<link::Model>, DbErr> {
    let Some(existing) = link::Entity::find_by_id(link_id)
        .filter(link::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let mut active_link = existing.into_active_model();
    if let Some(title) = changes.title {
        active_link.title = Set(title);
    }
    if let Some(url) = changes.url {
        active_link.url = Set(url);
    }
    if let Some(icon) = changes.icon {
        active_link.icon = Set(Some(icon).filter(|s| !s.is_empty()));
    }
    if let Some(color) = changes.color {
        active_link.color = Set(Some(color).filter(|s| !s.is_empty()));
    }
    if let Some(price) = changes.price {
        active_link.price = Set(price);
    }
    if let Some(is_product) = changes.is_product {
        active_link.is_product = Set(is_product);
    }
    if let Some(active) = changes.active {
        active_link.active = Set(active);
    }
    if let Some(position) = changes.position {
        active_link.position = Set(position);
    }
    active_link.updated_at = Set(Utc::now());

    active_link.update(db).await.map(Some)
}

/// Deletes a link owned by `user_id`. Remaining positions are left as they are.
pub async fn delete_link(db: &DatabaseConnection, link_id: i32, user_id: i32) -> Result<u64, DbErr> {
    let result = link::Entity::delete_many()
        .filter(link::Column::Id.eq(link_id))
        .filter(link::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Writes a whole reorder batch for `user_id` in one transaction.
///
/// Every write is scoped by owner, so ids that do not exist or belong to
/// another user match zero rows and are skipped silently. If any write fails
/// the transaction is rolled back and no position changes. Returns the number
/// of rows that matched.
pub async fn reorder_links(
    db: &DatabaseConnection,
    user_id: i32,
    entries: Vec<LinkPosition>,
) -> Result<u64, ReorderError> {
    validate_reorder(&entries)?;

    let batch_size = entries.len();
    let updated = db
        .transaction::<_, u64, DbErr>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let mut updated = 0;
                for entry in entries {
                    let result = link::Entity::update_many()
                        .col_expr(link::Column::Position, Expr::value(entry.position))
                        .col_expr(link::Column::UpdatedAt, Expr::value(now))
                        .filter(link::Column::Id.eq(entry.id))
                        .filter(link::Column::UserId.eq(user_id))
                        .exec(txn)
                        .await?;
                    updated += result.rows_affected;
                }
                Ok(updated)
            })
        })
        .await?;

    debug!(user_id, batch_size, updated, "Applied link reorder batch.");
    Ok(updated)
}

/// Counts a public click-through. Only active links are counted.
pub async fn record_click(db: &DatabaseConnection, link_id: i32) -> Result<u64, DbErr> {
    let result = link::Entity::update_many()
        .col_expr(link::Column::Clicks, Expr::col(link::Column::Clicks).add(1))
        .filter(link::Column::Id.eq(link_id))
        .filter(link::Column::Active.eq(true))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes a link regardless of owner. Used for moderation.
pub async fn delete_link_by_id(db: &DatabaseConnection, link_id: i32) -> Result<u64, DbErr> {
    let result = link::Entity::delete_by_id(link_id).exec(db).await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_user, test_db, test_db_with};
    use sea_orm::ConnectionTrait;

    fn new_link(title: &str) -> NewLink {
        NewLink {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            ..Default::default()
        }
    }

    async fn positions(db: &DatabaseConnection, user_id: i32) -> Vec<(String, i32)> {
        get_links_by_user_id(db, user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.title, l.position))
            .collect()
    }

    #[test]
    fn validate_accepts_a_permutation() {
        let batch = [
            LinkPosition { id: 3, position: 0 },
            LinkPosition { id: 1, position: 1 },
            LinkPosition { id: 2, position: 2 },
        ];
        assert!(validate_reorder(&batch).is_ok());
        assert!(validate_reorder(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicates_and_negatives() {
        let dup_id = [
            LinkPosition { id: 1, position: 0 },
            LinkPosition { id: 1, position: 1 },
        ];
        assert!(matches!(validate_reorder(&dup_id), Err(ReorderError::DuplicateId(1))));

        let dup_pos = [
            LinkPosition { id: 1, position: 4 },
            LinkPosition { id: 2, position: 4 },
        ];
        assert!(matches!(
            validate_reorder(&dup_pos),
            Err(ReorderError::DuplicatePosition(4))
        ));

        let negative = [LinkPosition { id: 7, position: -1 }];
        assert!(matches!(
            validate_reorder(&negative),
            Err(ReorderError::NegativePosition { id: 7, position: -1 })
        ));
    }

    #[tokio::test]
    async fn create_appends_to_the_end() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;

        for title in ["a", "b", "c"] {
            create_link(&test.db, user.id, new_link(title)).await.unwrap();
        }

        assert_eq!(
            positions(&test.db, user.id).await,
            vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
        );
    }

    #[tokio::test]
    async fn reorder_applies_submitted_positions() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let a = create_link(&test.db, user.id, new_link("a")).await.unwrap();
        let b = create_link(&test.db, user.id, new_link("b")).await.unwrap();
        let c = create_link(&test.db, user.id, new_link("c")).await.unwrap();

        let batch = vec![
            LinkPosition { id: c.id, position: 0 },
            LinkPosition { id: a.id, position: 1 },
            LinkPosition { id: b.id, position: 2 },
        ];
        let updated = reorder_links(&test.db, user.id, batch.clone()).await.unwrap();
        assert_eq!(updated, 3);

        let expected = vec![("c".to_string(), 0), ("a".to_string(), 1), ("b".to_string(), 2)];
        assert_eq!(positions(&test.db, user.id).await, expected);

        // Submitting the same batch again is idempotent.
        reorder_links(&test.db, user.id, batch).await.unwrap();
        assert_eq!(positions(&test.db, user.id).await, expected);
    }

    #[tokio::test]
    async fn reorder_leaves_omitted_links_alone() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let a = create_link(&test.db, user.id, new_link("a")).await.unwrap();
        let b = create_link(&test.db, user.id, new_link("b")).await.unwrap();
        let c = create_link(&test.db, user.id, new_link("c")).await.unwrap();
        let d = create_link(&test.db, user.id, new_link("d")).await.unwrap();
        assert_eq!(d.position, 3);

        let batch = vec![
            LinkPosition { id: c.id, position: 0 },
            LinkPosition { id: a.id, position: 1 },
            LinkPosition { id: b.id, position: 3 },
        ];
        reorder_links(&test.db, user.id, batch).await.unwrap();

        let d_after = link::Entity::find_by_id(d.id).one(&test.db).await.unwrap().unwrap();
        assert_eq!(d_after.position, 3);
        let b_after = link::Entity::find_by_id(b.id).one(&test.db).await.unwrap().unwrap();
        assert_eq!(b_after.position, 3);
    }

    #[tokio::test]
    async fn reorder_ignores_links_of_other_users() {
        let test = test_db().await;
        let owner = insert_user(&test.db, "amaka").await;
        let other = insert_user(&test.db, "tunde").await;
        let mine = create_link(&test.db, owner.id, new_link("mine")).await.unwrap();
        let theirs = create_link(&test.db, other.id, new_link("theirs")).await.unwrap();

        let batch = vec![
            LinkPosition { id: theirs.id, position: 5 },
            LinkPosition { id: mine.id, position: 1 },
            LinkPosition { id: 9_999, position: 2 },
        ];
        let updated = reorder_links(&test.db, owner.id, batch).await.unwrap();
        assert_eq!(updated, 1);

        let theirs_after = link::Entity::find_by_id(theirs.id).one(&test.db).await.unwrap().unwrap();
        assert_eq!(theirs_after.position, 0);
        let mine_after = link::Entity::find_by_id(mine.id).one(&test.db).await.unwrap().unwrap();
        assert_eq!(mine_after.position, 1);
    }

    #[tokio::test]
    async fn invalid_batch_changes_nothing() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let a = create_link(&test.db, user.id, new_link("a")).await.unwrap();
        let b = create_link(&test.db, user.id, new_link("b")).await.unwrap();

        let batch = vec![
            LinkPosition { id: a.id, position: 1 },
            LinkPosition { id: b.id, position: 1 },
        ];
        let result = reorder_links(&test.db, user.id, batch).await;
        assert!(matches!(result, Err(ReorderError::DuplicatePosition(1))));
        assert_eq!(
            positions(&test.db, user.id).await,
            vec![("a".into(), 0), ("b".into(), 1)]
        );
    }

    #[tokio::test]
    async fn storage_failure_mid_batch_rolls_back_everything() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let a = create_link(&test.db, user.id, new_link("a")).await.unwrap();
        let b = create_link(&test.db, user.id, new_link("b")).await.unwrap();
        let c = create_link(&test.db, user.id, new_link("c")).await.unwrap();

        // Third write in the batch fails inside the storage engine.
        test.db
            .execute_unprepared(&format!(
                "CREATE TRIGGER fail_on_link BEFORE UPDATE ON links WHEN NEW.id = {} \
                 BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
                c.id
            ))
            .await
            .unwrap();

        let batch = vec![
            LinkPosition { id: a.id, position: 2 },
            LinkPosition { id: b.id, position: 0 },
            LinkPosition { id: c.id, position: 1 },
        ];
        let result = reorder_links(&test.db, user.id, batch).await;
        assert!(matches!(result, Err(ReorderError::Database(_))));

        assert_eq!(
            positions(&test.db, user.id).await,
            vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_batches_resolve_to_one_of_them() {
        const ROUNDS: usize = 25;

        let test = test_db_with(4).await;
        let user = insert_user(&test.db, "amaka").await;
        let mut ids = Vec::new();
        for i in 0..12 {
            let title = format!("link-{i}");
            ids.push(create_link(&test.db, user.id, new_link(&title)).await.unwrap().id);
        }

        let forward: Vec<LinkPosition> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| LinkPosition { id: *id, position: i as i32 })
            .collect();
        let backward: Vec<LinkPosition> = ids
            .iter()
            .rev()
            .enumerate()
            .map(|(i, id)| LinkPosition { id: *id, position: i as i32 })
            .collect();
        let sorted = |mut pairs: Vec<LinkPosition>| {
            pairs.sort_by_key(|p| p.id);
            pairs
        };
        let forward_sorted = sorted(forward.clone());
        let backward_sorted = sorted(backward.clone());

        for round in 0..ROUNDS {
            // Alternate which batch is spawned first.
            let (a, b) = if round % 2 == 0 {
                (forward.clone(), backward.clone())
            } else {
                (backward.clone(), forward.clone())
            };
            let first = tokio::spawn(reorder_links_owned(test.db.clone(), user.id, a));
            let second = tokio::spawn(reorder_links_owned(test.db.clone(), user.id, b));
            assert_eq!(first.await.unwrap().unwrap(), ids.len() as u64);
            assert_eq!(second.await.unwrap().unwrap(), ids.len() as u64);

            let stored = get_links_by_user_id(&test.db, user.id).await.unwrap();
            let stored_pairs = sorted(
                stored
                    .iter()
                    .map(|l| LinkPosition { id: l.id, position: l.position })
                    .collect(),
            );
            // Never an interleaving of the two batches.
            assert!(
                stored_pairs == forward_sorted || stored_pairs == backward_sorted,
                "round {round} left a mixed ordering: {stored_pairs:?}"
            );
        }
    }

    async fn reorder_links_owned(
        db: DatabaseConnection,
        user_id: i32,
        entries: Vec<LinkPosition>,
    ) -> Result<u64, ReorderError> {
        reorder_links(&db, user_id, entries).await
    }

    #[tokio::test]
    async fn update_is_scoped_to_owner() {
        let test = test_db().await;
        let owner = insert_user(&test.db, "amaka").await;
        let other = insert_user(&test.db, "tunde").await;
        let link = create_link(&test.db, owner.id, new_link("shop")).await.unwrap();

        let changes = LinkChanges {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(update_link(&test.db, link.id, other.id, changes).await.unwrap().is_none());

        let changes = LinkChanges {
            title: Some("My shop".into()),
            price: Some(Some(150_000)),
            is_product: Some(true),
            active: Some(false),
            ..Default::default()
        };
        let updated = update_link(&test.db, link.id, owner.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "My shop");
        assert_eq!(updated.price, Some(150_000));
        assert!(updated.is_product);
        assert!(!updated.active);
        assert_eq!(updated.position, 0);
    }

    #[tokio::test]
    async fn price_can_be_removed() {
        let test = test_db().await;
        let owner = insert_user(&test.db, "amaka").await;
        let mut priced = new_link("ebook");
        priced.price = Some(250_000);
        priced.is_product = true;
        let link = create_link(&test.db, owner.id, priced).await.unwrap();

        let untouched = LinkChanges {
            title: Some("Ebook".into()),
            ..Default::default()
        };
        let updated = update_link(&test.db, link.id, owner.id, untouched).await.unwrap().unwrap();
        assert_eq!(updated.price, Some(250_000));

        let cleared = LinkChanges {
            price: Some(None),
            ..Default::default()
        };
        let updated = update_link(&test.db, link.id, owner.id, cleared).await.unwrap().unwrap();
        assert_eq!(updated.price, None);
        assert_eq!(updated.title, "Ebook");
    }

    #[tokio::test]
    async fn delete_does_not_renumber() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let a = create_link(&test.db, user.id, new_link("a")).await.unwrap();
        create_link(&test.db, user.id, new_link("b")).await.unwrap();
        create_link(&test.db, user.id, new_link("c")).await.unwrap();

        assert_eq!(delete_link(&test.db, a.id, user.id).await.unwrap(), 1);
        assert_eq!(
            positions(&test.db, user.id).await,
            vec![("b".into(), 1), ("c".into(), 2)]
        );

        // A new link takes the current count as its position.
        let d = create_link(&test.db, user.id, new_link("d")).await.unwrap();
        assert_eq!(d.position, 2);
    }

    #[tokio::test]
    async fn clicks_count_only_active_links() {
        let test = test_db().await;
        let user = insert_user(&test.db, "amaka").await;
        let link = create_link(&test.db, user.id, new_link("a")).await.unwrap();

        assert_eq!(record_click(&test.db, link.id).await.unwrap(), 1);
        assert_eq!(record_click(&test.db, link.id).await.unwrap(), 1);

        let changes = LinkChanges {
            active: Some(false),
            ..Default::default()
        };
        update_link(&test.db, link.id, user.id, changes).await.unwrap();
        assert_eq!(record_click(&test.db, link.id).await.unwrap(), 0);

        let stored = link::Entity::find_by_id(link.id).one(&test.db).await.unwrap().unwrap();
        assert_eq!(stored.clicks, 2);
        assert!(get_active_links_by_user_id(&test.db, user.id).await.unwrap().is_empty());
    }
}

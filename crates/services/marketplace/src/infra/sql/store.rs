//! SeaORM-backed document store.
//!
//! All collections share the `documents` table keyed by (collection, id).
//! Batches run in a SERIALIZABLE transaction and use
//! `UPDATE ... WHERE version = expected` row counts as the version check.
//! Change events are fanned out in-process after the transaction commits, so
//! subscribers only observe writes made through this store instance.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, AccessMode, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, IsolationLevel, QueryFilter,
    QueryOrder, Select, SqlErr, Statement, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use common::{AppError, AppResult};

use super::entity::{self, Column, Entity as DocumentEntity};
use crate::infra::store::{
    merge_into, ChangeEvent, ChangeFeed, ChangeKind, Collection, Document, DocumentStore, Filter,
    Subscription, Write,
};

type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

pub struct SqlStore {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
        }
    }

    /// Run `f` in a serializable read-write transaction, committing on success
    async fn in_transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), Some(AccessMode::ReadWrite))
            .await
            .map_err(transaction_error)?;

        let outcome = f(&txn).await;
        match outcome {
            Ok(result) => {
                txn.commit().await.map_err(transaction_error)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

fn key(collection: Collection, id: Uuid) -> (String, Uuid) {
    (collection.as_str().to_string(), id)
}

/// Rows of a collection in creation order, narrowed by JSONB containment.
///
/// `@>` also accepts supersets of arrays and objects, so callers re-check the
/// returned bodies with [`Filter::matches`].
fn select_documents(collection: Collection, filter: &Filter) -> Select<DocumentEntity> {
    let select = DocumentEntity::find().filter(Column::Collection.eq(collection.as_str()));
    let select = match filter.as_containment() {
        Some(pattern) => select.filter(Expr::cust_with_values("body @> $1", [pattern])),
        None => select,
    };
    select.order_by_asc(Column::CreatedAt)
}

fn db_version(version: u64) -> AppResult<i64> {
    i64::try_from(version).map_err(|_| AppError::internal("document version overflow"))
}

/// Postgres aborts one side of a serializable conflict with SQLSTATE 40001
fn is_serialization_failure(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("40001") || message.contains("could not serialize access")
}

fn transaction_error(err: DbErr) -> AppError {
    if is_serialization_failure(&err) {
        AppError::StaleWrite
    } else {
        AppError::Database(err)
    }
}

fn write_error(err: DbErr, collection: Collection, id: Uuid) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return AppError::conflict(format!("{} record {} already exists", collection, id));
    }
    transaction_error(err)
}

/// Explain a zero-row update or delete
async fn stale_or_missing(txn: &DatabaseTransaction, collection: Collection, id: Uuid) -> AppError {
    match DocumentEntity::find_by_id(key(collection, id)).one(txn).await {
        Ok(Some(_)) => AppError::StaleWrite,
        Ok(None) => AppError::not_found(collection.to_string()),
        Err(e) => transaction_error(e),
    }
}

async fn insert_row(
    txn: &DatabaseTransaction,
    collection: Collection,
    id: Uuid,
    body: Value,
) -> AppResult<Document> {
    let now = Utc::now();
    let row = entity::ActiveModel {
        collection: Set(collection.as_str().to_string()),
        id: Set(id),
        version: Set(1),
        body: Set(body.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    DocumentEntity::insert(row)
        .exec_without_returning(txn)
        .await
        .map_err(|e| write_error(e, collection, id))?;

    Ok(Document { id, version: 1, body })
}

async fn update_row(
    txn: &DatabaseTransaction,
    collection: Collection,
    id: Uuid,
    expected_version: u64,
    body: Value,
) -> AppResult<Document> {
    let next_version = expected_version + 1;

    let result = DocumentEntity::update_many()
        .col_expr(Column::Body, Expr::value(body.clone()))
        .col_expr(Column::Version, Expr::value(db_version(next_version)?))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Collection.eq(collection.as_str()))
        .filter(Column::Id.eq(id))
        .filter(Column::Version.eq(db_version(expected_version)?))
        .exec(txn)
        .await
        .map_err(|e| write_error(e, collection, id))?;

    if result.rows_affected == 0 {
        return Err(stale_or_missing(txn, collection, id).await);
    }

    Ok(Document {
        id,
        version: next_version,
        body,
    })
}

async fn delete_row(
    txn: &DatabaseTransaction,
    collection: Collection,
    id: Uuid,
    expected_version: Option<u64>,
) -> AppResult<Document> {
    let existing = DocumentEntity::find_by_id(key(collection, id))
        .one(txn)
        .await
        .map_err(transaction_error)?
        .ok_or_else(|| AppError::not_found(collection.to_string()))?;

    let version = match expected_version {
        Some(expected) => db_version(expected)?,
        None => existing.version,
    };

    let result = DocumentEntity::delete_many()
        .filter(Column::Collection.eq(collection.as_str()))
        .filter(Column::Id.eq(id))
        .filter(Column::Version.eq(version))
        .exec(txn)
        .await
        .map_err(|e| write_error(e, collection, id))?;

    if result.rows_affected == 0 {
        return Err(AppError::StaleWrite);
    }

    Ok(existing.into())
}

async fn apply_writes(txn: &DatabaseTransaction, writes: Vec<Write>) -> AppResult<Vec<ChangeEvent>> {
    let mut events = Vec::with_capacity(writes.len());

    for write in writes {
        let event = match write {
            Write::Insert { collection, id, body } => ChangeEvent {
                collection,
                id,
                kind: ChangeKind::Upserted,
                document: insert_row(txn, collection, id, body).await?,
            },
            Write::Update { collection, id, expected_version, body } => ChangeEvent {
                collection,
                id,
                kind: ChangeKind::Upserted,
                document: update_row(txn, collection, id, expected_version, body).await?,
            },
            Write::Delete { collection, id, expected_version } => ChangeEvent {
                collection,
                id,
                kind: ChangeKind::Removed,
                document: delete_row(txn, collection, id, Some(expected_version)).await?,
            },
        };
        events.push(event);
    }

    Ok(events)
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>> {
        let row = DocumentEntity::find_by_id(key(collection, id))
            .one(&self.db)
            .await?;

        Ok(row.map(Document::from))
    }

    async fn put(
        &self,
        collection: Collection,
        id: Uuid,
        body: Value,
        merge: bool,
    ) -> AppResult<Document> {
        let document = self
            .in_transaction(move |txn| {
                Box::pin(async move {
                    let existing = DocumentEntity::find_by_id(key(collection, id))
                        .one(txn)
                        .await
                        .map_err(transaction_error)?;

                    match existing {
                        Some(row) => {
                            let version = u64::try_from(row.version).unwrap_or_default();
                            let mut next = row.body;
                            if merge {
                                merge_into(&mut next, body);
                            } else {
                                next = body;
                            }
                            update_row(txn, collection, id, version, next).await
                        }
                        None => insert_row(txn, collection, id, body).await,
                    }
                })
            })
            .await?;

        self.feed.publish([ChangeEvent {
            collection,
            id,
            kind: ChangeKind::Upserted,
            document: document.clone(),
        }]);
        Ok(document)
    }

    async fn add(&self, collection: Collection, body: Value) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.commit(vec![Write::Insert { collection, id, body }]).await?;
        Ok(id)
    }

    async fn remove(&self, collection: Collection, id: Uuid) -> AppResult<()> {
        let document = self
            .in_transaction(move |txn| Box::pin(delete_row(txn, collection, id, None)))
            .await?;

        self.feed.publish([ChangeEvent {
            collection,
            id,
            kind: ChangeKind::Removed,
            document,
        }]);
        Ok(())
    }

    async fn query(&self, collection: Collection, filter: Filter) -> AppResult<Vec<Document>> {
        let rows = select_documents(collection, &filter).all(&self.db).await?;

        Ok(rows
            .into_iter()
            .map(Document::from)
            .filter(|doc| filter.matches(&doc.body))
            .collect())
    }

    async fn commit(&self, writes: Vec<Write>) -> AppResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let events = self
            .in_transaction(move |txn| Box::pin(apply_writes(txn, writes)))
            .await?;

        self.feed.publish(events);
        Ok(())
    }

    fn subscribe(&self, collection: Collection, filter: Filter) -> Subscription {
        self.feed.subscribe(collection, filter)
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn query_pushes_clauses_into_sql() {
        let filter = Filter::all().eq("email", "plant@acme.example");

        let sql = select_documents(Collection::Users, &filter)
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("body @> "));
        assert!(sql.contains("plant@acme.example"));
        assert!(sql.contains("'users'"));
        assert!(sql.contains("ORDER BY"));
    }

    #[test]
    fn unfiltered_query_scans_collection() {
        let sql = select_documents(Collection::Reviews, &Filter::all())
            .build(DbBackend::Postgres)
            .to_string();

        assert!(!sql.contains("@>"));
        assert!(sql.contains("'reviews'"));
    }
}

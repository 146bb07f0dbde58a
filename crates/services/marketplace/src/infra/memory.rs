//! Single-process document store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{AppError, AppResult};

use super::store::{
    merge_into, ChangeEvent, ChangeFeed, ChangeKind, Collection, Document, DocumentStore, Filter,
    Subscription, Write,
};

/// Insertion-ordered documents per collection
#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Collection, BTreeMap<Uuid, Stored>>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    document: Document,
}

impl Tables {
    fn get(&self, collection: Collection, id: Uuid) -> Option<&Stored> {
        self.rows.get(&collection).and_then(|table| table.get(&id))
    }

    fn upsert(&mut self, collection: Collection, document: Document) {
        let seq = match self.get(collection, document.id) {
            Some(existing) => existing.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.rows
            .entry(collection)
            .or_default()
            .insert(document.id, Stored { seq, document });
    }

    fn delete(&mut self, collection: Collection, id: Uuid) -> Option<Document> {
        self.rows
            .get_mut(&collection)
            .and_then(|table| table.remove(&id))
            .map(|stored| stored.document)
    }

    /// Check every write against current versions, including earlier writes
    /// of the same batch, before anything is applied.
    fn validate(&self, writes: &[Write]) -> AppResult<()> {
        let mut staged: HashMap<(Collection, Uuid), Option<u64>> = HashMap::new();

        for write in writes {
            let key = (write.collection(), write.id());
            let current = match staged.get(&key) {
                Some(version) => *version,
                None => self.get(key.0, key.1).map(|s| s.document.version),
            };

            let next = match (write, current) {
                (Write::Insert { collection, id, .. }, Some(_)) => {
                    return Err(AppError::conflict(format!(
                        "{} record {} already exists",
                        collection, id
                    )));
                }
                (Write::Insert { .. }, None) => Some(1),
                (Write::Update { collection, .. } | Write::Delete { collection, .. }, None) => {
                    return Err(AppError::not_found(collection.to_string()));
                }
                (Write::Update { expected_version, .. }, Some(version))
                | (Write::Delete { expected_version, .. }, Some(version))
                    if *expected_version != version =>
                {
                    return Err(AppError::StaleWrite);
                }
                (Write::Update { .. }, Some(version)) => Some(version + 1),
                (Write::Delete { .. }, Some(_)) => None,
            };
            staged.insert(key, next);
        }

        Ok(())
    }

    fn apply(&mut self, writes: Vec<Write>) -> Vec<ChangeEvent> {
        let mut events = Vec::with_capacity(writes.len());

        for write in writes {
            match write {
                Write::Insert { collection, id, body } => {
                    let document = Document { id, version: 1, body };
                    self.upsert(collection, document.clone());
                    events.push(ChangeEvent { collection, id, kind: ChangeKind::Upserted, document });
                }
                Write::Update { collection, id, expected_version, body } => {
                    let document = Document { id, version: expected_version + 1, body };
                    self.upsert(collection, document.clone());
                    events.push(ChangeEvent { collection, id, kind: ChangeKind::Upserted, document });
                }
                Write::Delete { collection, id, .. } => {
                    if let Some(document) = self.delete(collection, id) {
                        events.push(ChangeEvent { collection, id, kind: ChangeKind::Removed, document });
                    }
                }
            }
        }

        events
    }
}

/// Document store held in memory behind an async RwLock.
///
/// Used by tests, demos and the gateway's in-memory mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>> {
        let tables = self.tables.read().await;
        Ok(tables.get(collection, id).map(|s| s.document.clone()))
    }

    async fn put(
        &self,
        collection: Collection,
        id: Uuid,
        body: Value,
        merge: bool,
    ) -> AppResult<Document> {
        let document = {
            let mut tables = self.tables.write().await;
            let document = match tables.get(collection, id) {
                Some(existing) => {
                    let mut next = existing.document.body.clone();
                    if merge {
                        merge_into(&mut next, body);
                    } else {
                        next = body;
                    }
                    Document { id, version: existing.document.version + 1, body: next }
                }
                None => Document { id, version: 1, body },
            };
            tables.upsert(collection, document.clone());
            document
        };

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
            .tables
            .write()
            .await
            .delete(collection, id)
            .ok_or_else(|| AppError::not_found(collection.to_string()))?;

        self.feed.publish([ChangeEvent { collection, id, kind: ChangeKind::Removed, document }]);
        Ok(())
    }

    async fn query(&self, collection: Collection, filter: Filter) -> AppResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&Stored> = tables
            .rows
            .get(&collection)
            .map(|table| table.values().filter(|s| filter.matches(&s.document.body)).collect())
            .unwrap_or_default();
        matched.sort_by_key(|s| s.seq);

        Ok(matched.into_iter().map(|s| s.document.clone()).collect())
    }

    async fn commit(&self, writes: Vec<Write>) -> AppResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let events = {
            let mut tables = self.tables.write().await;
            tables.validate(&writes)?;
            tables.apply(writes)
        };

        self.feed.publish(events);
        Ok(())
    }

    fn subscribe(&self, collection: Collection, filter: Filter) -> Subscription {
        self.feed.subscribe(collection, filter)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

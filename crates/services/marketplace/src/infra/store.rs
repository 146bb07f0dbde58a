//! Document persistence contract.
//!
//! Every record lives in a [`Collection`] as a JSON [`Document`] carrying a
//! version that is bumped on each write. Read-modify-write callers build a
//! batch of [`Write`]s from the versions they read and hand it to
//! [`DocumentStore::commit`], which applies all of them or none.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use common::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Buffered change events per feed before slow subscribers start lagging
const CHANGE_FEED_CAPACITY: usize = 1024;

/// Persistence partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Requests,
    Offers,
    Contracts,
    Notifications,
    Reviews,
    EmailClaims,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Requests,
        Collection::Offers,
        Collection::Contracts,
        Collection::Notifications,
        Collection::Reviews,
        Collection::EmailClaims,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Requests => "requests",
            Collection::Offers => "offers",
            Collection::Contracts => "contracts",
            Collection::Notifications => "notifications",
            Collection::Reviews => "reviews",
            Collection::EmailClaims => "email_claims",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored record with its optimistic-concurrency token
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub version: u64,
    pub body: Value,
}

/// One step of an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a record; fails if the id is taken
    Insert {
        collection: Collection,
        id: Uuid,
        body: Value,
    },
    /// Replace a record read at `expected_version`
    Update {
        collection: Collection,
        id: Uuid,
        expected_version: u64,
        body: Value,
    },
    /// Delete a record read at `expected_version`
    Delete {
        collection: Collection,
        id: Uuid,
        expected_version: u64,
    },
}

impl Write {
    pub fn collection(&self) -> Collection {
        match self {
            Write::Insert { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Write::Insert { id, .. } | Write::Update { id, .. } | Write::Delete { id, .. } => *id,
        }
    }
}

/// Conjunction of top-level field equality clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Filter matching every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a `field == value` clause
    pub fn eq(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.clauses.push((field.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The clauses as one JSON object, for stores that match by containment.
    /// `None` when the filter matches everything.
    pub fn as_containment(&self) -> Option<Value> {
        if self.clauses.is_empty() {
            return None;
        }
        let object = self
            .clauses
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect::<serde_json::Map<String, Value>>();
        Some(Value::Object(object))
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| body.get(field) == Some(expected))
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those of `target`.
/// A non-object on either side replaces the target outright.
pub fn merge_into(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Removed,
}

/// Pushed to subscribers after a write is durable.
/// For removals `document` holds the last stored state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: Uuid,
    pub kind: ChangeKind,
    pub document: Document,
}

/// In-process fan-out of change events
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            // Nobody listening is not an error
            let _ = self.tx.send(event);
        }
    }

    pub fn subscribe(&self, collection: Collection, filter: Filter) -> Subscription {
        Subscription {
            collection,
            filter,
            rx: self.tx.subscribe(),
        }
    }
}

/// Live view over one collection. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    filter: Filter,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Next matching event, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.collection == self.collection
                        && self.filter.matches(&event.document.body)
                    {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        collection = %self.collection,
                        skipped,
                        "Subscriber lagged behind the change feed"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Persistence collaborator used by every service.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>>;

    /// Upsert without a version check; `merge` shallow-merges into the stored body
    async fn put(&self, collection: Collection, id: Uuid, body: Value, merge: bool)
        -> AppResult<Document>;

    /// Insert under a fresh id
    async fn add(&self, collection: Collection, body: Value) -> AppResult<Uuid>;

    /// Delete by id; absent ids are `NotFound`
    async fn remove(&self, collection: Collection, id: Uuid) -> AppResult<()>;

    /// All documents of a collection matching the filter, oldest first
    async fn query(&self, collection: Collection, filter: Filter) -> AppResult<Vec<Document>>;

    /// Apply a batch atomically. Any version mismatch fails the whole batch
    /// with `StaleWrite`; a taken insert id fails it with `Conflict`.
    async fn commit(&self, writes: Vec<Write>) -> AppResult<()>;

    /// Push delivery of future changes
    fn subscribe(&self, collection: Collection, filter: Filter) -> Subscription;

    /// Check the backend is reachable
    async fn ping(&self) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_is_a_conjunction() {
        let body = json!({ "receiverId": "a", "read": false, "kind": "info" });

        assert!(Filter::all().matches(&body));
        assert!(Filter::all().eq("receiverId", "a").eq("read", false).matches(&body));
        assert!(!Filter::all().eq("receiverId", "a").eq("read", true).matches(&body));
        assert!(!Filter::all().eq("missing", "a").matches(&body));
    }

    #[test]
    fn containment_object_holds_every_clause() {
        assert_eq!(Filter::all().as_containment(), None);
        assert_eq!(
            Filter::all().eq("receiverId", "a").eq("read", false).as_containment(),
            Some(json!({ "receiverId": "a", "read": false }))
        );
    }

    #[test]
    fn merge_overwrites_top_level_keys_only() {
        let mut target = json!({ "name": "Acme", "features": { "a": true, "b": true } });
        merge_into(&mut target, json!({ "features": { "a": false }, "status": "banned" }));

        assert_eq!(
            target,
            json!({ "name": "Acme", "features": { "a": false }, "status": "banned" })
        );
    }

    #[tokio::test]
    async fn subscription_skips_other_collections_and_filtered_documents() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe(Collection::Notifications, Filter::all().eq("receiverId", "a"));

        let event = |collection, receiver: &str| ChangeEvent {
            collection,
            id: Uuid::new_v4(),
            kind: ChangeKind::Upserted,
            document: Document {
                id: Uuid::new_v4(),
                version: 1,
                body: json!({ "receiverId": receiver }),
            },
        };

        let wanted = event(Collection::Notifications, "a");
        feed.publish(vec![
            event(Collection::Requests, "a"),
            event(Collection::Notifications, "b"),
            wanted.clone(),
        ]);

        assert_eq!(sub.next().await, Some(wanted));
    }
}

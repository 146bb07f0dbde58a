//! Typed access to a collection of the document store.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use common::{AppResult, OptionExt};
use domain::{Contract, EmailClaim, Notification, Offer, Request, Review, User};

use crate::infra::{Collection, Document, DocumentStore, Filter, Write};

/// Entity persisted as one document per id
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;
    /// Name used in not-found errors
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    const LABEL: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Request {
    const COLLECTION: Collection = Collection::Requests;
    const LABEL: &'static str = "Request";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Offer {
    const COLLECTION: Collection = Collection::Offers;
    const LABEL: &'static str = "Offer";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Contract {
    const COLLECTION: Collection = Collection::Contracts;
    const LABEL: &'static str = "Contract";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Notification {
    const COLLECTION: Collection = Collection::Notifications;
    const LABEL: &'static str = "Notification";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const LABEL: &'static str = "Review";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for EmailClaim {
    const COLLECTION: Collection = Collection::EmailClaims;
    const LABEL: &'static str = "Email claim";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A record together with the version it was read at
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.record
    }
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T> DerefMut for Versioned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.record
    }
}

/// Repository over one collection, (de)serialising with serde_json
pub struct Records<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Records<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Records<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn decode(document: Document) -> AppResult<Versioned<T>> {
        Ok(Versioned {
            version: document.version,
            record: serde_json::from_value(document.body)?,
        })
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<T>> {
        Ok(self.find_versioned(id).await?.map(Versioned::into_inner))
    }

    pub async fn find_versioned(&self, id: Uuid) -> AppResult<Option<Versioned<T>>> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Fetch a record that must exist
    pub async fn require(&self, id: Uuid) -> AppResult<Versioned<T>> {
        self.find_versioned(id).await?.ok_or_not_found(T::LABEL)
    }

    /// Every record of the collection, oldest first
    pub async fn list(&self) -> AppResult<Vec<T>> {
        self.query(Filter::all()).await
    }

    /// Records whose top-level `field` equals `value`, oldest first
    pub async fn where_eq(&self, field: &str, value: impl Serialize) -> AppResult<Vec<T>> {
        self.query(Filter::all().eq(field, value)).await
    }

    pub async fn where_eq_versioned(
        &self,
        field: &str,
        value: impl Serialize,
    ) -> AppResult<Vec<Versioned<T>>> {
        self.store
            .query(T::COLLECTION, Filter::all().eq(field, value))
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    async fn query(&self, filter: Filter) -> AppResult<Vec<T>> {
        self.store
            .query(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|doc| Self::decode(doc).map(Versioned::into_inner))
            .collect()
    }

    pub async fn insert(&self, record: &T) -> AppResult<()> {
        self.store.commit(vec![Self::insert_write(record)?]).await
    }

    /// Write back a record read with `find_versioned`
    pub async fn update(&self, record: &Versioned<T>) -> AppResult<()> {
        self.store.commit(vec![Self::update_write(record)?]).await
    }

    pub fn insert_write(record: &T) -> AppResult<Write> {
        Ok(Write::Insert {
            collection: T::COLLECTION,
            id: record.id(),
            body: serde_json::to_value(record)?,
        })
    }

    pub fn update_write(record: &Versioned<T>) -> AppResult<Write> {
        Ok(Write::Update {
            collection: T::COLLECTION,
            id: record.id(),
            expected_version: record.version,
            body: serde_json::to_value(&record.record)?,
        })
    }

    pub fn delete_write(record: &Versioned<T>) -> Write {
        Write::Delete {
            collection: T::COLLECTION,
            id: record.id(),
            expected_version: record.version,
        }
    }
}

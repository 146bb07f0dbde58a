//! Infrastructure layer - persistence collaborators.

mod db;
mod memory;
pub mod sql;
pub mod store;

pub use db::{Database, MigrateAction, MigrationState};
pub use memory::MemoryStore;
pub use sql::{Migrator, SqlStore};
pub use store::{
    ChangeEvent, ChangeFeed, ChangeKind, Collection, Document, DocumentStore, Filter,
    Subscription, Write,
};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MockDocumentStore;

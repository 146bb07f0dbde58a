//! Relational persistence for the document store.

pub mod entity;
pub mod migrations;
mod store;

pub use migrations::Migrator;
pub use store::SqlStore;

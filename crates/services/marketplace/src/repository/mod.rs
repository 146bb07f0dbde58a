//! Repository layer for data access.

mod records;

pub use records::{Record, Records, Versioned};

//! Storage layer abstractions for quiver.
//!
//! This module provides a trait-based abstraction over the record store,
//! allowing different backends to be used (e.g., redb, mock for testing).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Collection                               │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │    RecordStore      │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                         ▲                                    │
//! │                         │                                    │
//! │                  ┌──────┴──────┐                            │
//! │                  │  RedbStore  │                            │
//! │                  └─────────────┘                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The record store is the **source of truth**. Indexes hold derived
//! copies of embeddings only and are rebuilt from `list_all()` whenever
//! they are attached to a collection.

pub mod redb;
pub mod schema;

pub use self::redb::RedbStore;
pub use schema::{DatabaseMetadata, SCHEMA_VERSION};

use std::path::Path;

use crate::error::Result;
use crate::record::Record;
use crate::types::RecordId;

/// Record store trait for quiver.
///
/// This trait defines the contract that any storage backend must implement.
/// The primary implementation is [`RedbStore`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow the collection to be
/// shared across threads. The engine handles internal synchronization.
pub trait RecordStore: Send + Sync {
    /// Returns the database metadata.
    fn metadata(&self) -> &DatabaseMetadata;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`QuiverError::DuplicateId`](crate::QuiverError::DuplicateId)
    /// if a record with the same id already exists. The store is unchanged
    /// in that case.
    fn insert(&self, record: &Record) -> Result<()>;

    /// Saves a record, overwriting any existing value (upsert).
    ///
    /// Used by the update path after a partial update has been applied.
    fn save(&self, record: &Record) -> Result<()>;

    /// Retrieves a record by id.
    ///
    /// Returns `None` if no record with the given id exists.
    fn get(&self, id: RecordId) -> Result<Option<Record>>;

    /// Deletes a record by id.
    ///
    /// Returns `true` if the record existed and was deleted,
    /// `false` if no record with the given id was found.
    fn delete(&self, id: RecordId) -> Result<bool>;

    /// Returns every record in the store.
    ///
    /// Used as the snapshot source when an index is attached.
    fn list_all(&self) -> Result<Vec<Record>>;

    /// Returns true if a record with the given id exists.
    fn contains(&self, id: RecordId) -> Result<bool>;

    /// Returns the number of records in the store.
    fn len(&self) -> Result<u64>;

    /// Returns true if the store holds no records.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the path to the database file, if applicable.
    fn path(&self) -> Option<&Path>;

    /// Closes the store, flushing any pending writes.
    ///
    /// This method consumes the store. After calling `close()`, the store
    /// cannot be used.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens a record store inside the given data directory.
///
/// This is a convenience function that creates the directory if needed and
/// opens a [`RedbStore`] at `{data_dir}/quiver.redb`. For more control,
/// use `RedbStore::open()` directly.
pub fn open_store(data_dir: impl AsRef<Path>) -> Result<Box<dyn RecordStore>> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir)?;

    let store = RedbStore::open(data_dir.join("quiver.redb"))?;
    Ok(Box::new(store))
}

//! redb storage engine implementation.
//!
//! This module provides the primary record store backend for quiver using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//! - Zero external dependencies (pure Rust)
//!
//! Each record is stored as an individual JSON document keyed by its UUID
//! bytes, so the on-disk payloads stay tool-inspectable.

use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info, instrument};

use super::schema::{DatabaseMetadata, METADATA_TABLE, RECORDS_TABLE, SCHEMA_VERSION};
use super::RecordStore;
use crate::error::{QuiverError, Result, StorageError};
use crate::record::Record;
use crate::types::RecordId;

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// redb record store wrapper.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`RecordStore`] for use with a collection.
///
/// # Thread Safety
///
/// `RedbStore` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStore {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,
}

impl RedbStore {
    /// Opens or creates a record store at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// If it exists, its schema version is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use quiver::storage::RedbStore;
    ///
    /// let store = RedbStore::open("./data/quiver.redb")?;
    /// ```
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening record store");

        let db = Self::create_database(path)?;

        if db_exists {
            Self::open_existing(db, path.to_path_buf())
        } else {
            Self::initialize_new(db, path.to_path_buf())
        }
    }

    /// Creates the redb database with appropriate settings.
    fn create_database(path: &Path) -> Result<Database> {
        let db = Database::builder().create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    fn initialize_new(db: Database, path: PathBuf) -> Result<Self> {
        info!("Initializing new record store");

        let metadata = DatabaseMetadata::new();

        // Create all tables and write metadata in a single transaction
        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes =
                serde_json::to_vec(&metadata).map_err(StorageError::from)?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            let _ = write_txn.open_table(RECORDS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(schema_version = SCHEMA_VERSION, "Record store initialized");

        Ok(Self { db, metadata, path })
    }

    /// Opens and validates an existing database.
    fn open_existing(db: Database, path: PathBuf) -> Result<Self> {
        info!("Opening existing record store");

        let read_txn = db.begin_read().map_err(StorageError::from)?;
        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            serde_json::from_slice::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };
        drop(read_txn);

        if metadata.schema_version != SCHEMA_VERSION {
            return Err(QuiverError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        // Update last_opened_at timestamp
        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes =
                serde_json::to_vec(&metadata).map_err(StorageError::from)?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            "Record store opened successfully"
        );

        Ok(Self { db, metadata, path })
    }

    /// Writes a record's JSON document, overwriting any existing value.
    fn write_record(&self, record: &Record) -> Result<()> {
        let json = serde_json::to_vec(record).map_err(StorageError::from)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            table.insert(record.id.as_bytes(), json.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        Ok(())
    }
}

impl RecordStore for RedbStore {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    fn insert(&self, record: &Record) -> Result<()> {
        let json = serde_json::to_vec(record).map_err(StorageError::from)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            let exists = table.get(record.id.as_bytes())?.is_some();
            if exists {
                // Abort without committing; the open transaction is dropped.
                return Err(QuiverError::DuplicateId(record.id));
            }
            table.insert(record.id.as_bytes(), json.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        Ok(())
    }

    fn save(&self, record: &Record) -> Result<()> {
        self.write_record(record)
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(RECORDS_TABLE)?;

        match table.get(id.as_bytes())? {
            Some(guard) => {
                let record: Record =
                    serde_json::from_slice(guard.value()).map_err(StorageError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, id: RecordId) -> Result<bool> {
        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        let removed = {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            let guard = table.remove(id.as_bytes())?;
            guard.is_some()
        };
        write_txn.commit().map_err(StorageError::from)?;

        Ok(removed)
    }

    fn list_all(&self) -> Result<Vec<Record>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(RECORDS_TABLE)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: Record =
                serde_json::from_slice(value.value()).map_err(StorageError::from)?;
            records.push(record);
        }

        Ok(records)
    }

    fn contains(&self, id: RecordId) -> Result<bool> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.get(id.as_bytes())?.is_some())
    }

    fn len(&self) -> Result<u64> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.len()?)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing record store");

        // redb flushes on drop; dropping explicitly keeps the intent visible
        drop(self.db);

        Ok(())
    }
}

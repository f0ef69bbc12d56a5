//! Collection facade: a record store bound to a set of named indexes.
//!
//! The [`Collection`] routes every record mutation to the store first (the
//! source of truth) and then fans the lifecycle event out to each attached
//! index in attach order. Queries name an index by its [`IndexKind`] tag;
//! the collection dispatches the search and joins the ranked ids back
//! against the store.
//!
//! # Thread Safety
//!
//! `Collection` is `Send + Sync` and can be shared across threads using
//! `Arc`. Mutations are serialised per collection by an internal mutex
//! held across the store write and the index broadcast, so the stream of
//! events each index observes forms a total order consistent with store
//! writes. Searches never take that mutex: they clone the index handle
//! under a short read lock and run against the index's own reader-writer
//! guard.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{NotFoundError, QuiverError, Result};
use crate::index::{
    BruteForceCosineIndex, Index, IndexKind, IvfIndex, NswIndex, SearchResult,
};
use crate::record::{
    validate_new_record, validate_record_update, NewRecord, Record, RecordUpdate,
};
use crate::storage::{open_store, RecordStore};
use crate::types::{MetadataValue, RecordId};

/// A search result joined with its record: the ranked id enriched with the
/// stored content and metadata.
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Id of the matching record.
    pub id: RecordId,
    /// The record's content at join time.
    pub content: String,
    /// Cosine similarity between the query and the record's vector.
    pub score: f32,
    /// The record's metadata at join time.
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// A record store bound to a set of named vector indexes.
///
/// # Ownership
///
/// The collection exclusively owns its attached indexes and its store
/// handle. Indexes hold derived copies of record vectors only; dropping
/// or re-attaching an index never loses data.
pub struct Collection {
    /// Record store (source of truth).
    store: Box<dyn RecordStore>,

    /// Embedding provider shared with every attached index.
    embedding: Arc<dyn EmbeddingProvider>,

    /// Attached indexes in attach order. Same-tag attach replaces the
    /// entry in place, keeping the slot's broadcast position.
    indexes: RwLock<Vec<(IndexKind, Arc<dyn Index>)>>,

    /// Serialises mutations (store write + index broadcast).
    write_lock: Mutex<()>,

    /// Configuration used to open this collection.
    config: Config,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self.index_kinds();
        f.debug_struct("Collection")
            .field("config", &self.config)
            .field("indexes", &kinds)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Opens a collection with the store rooted at `config.data_dir`.
    ///
    /// The directory is created if it doesn't exist. No indexes are
    /// attached yet; call [`attach_index`](Self::attach_index) or
    /// [`attach_default_indexes`](Self::attach_default_indexes).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (see
    /// [`Config::validate`]) or the store cannot be opened.
    #[instrument(skip(config, embedding), fields(data_dir = %config.data_dir.display()))]
    pub fn open(config: Config, embedding: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config.validate().map_err(QuiverError::from)?;

        info!("Opening collection");
        let store = open_store(&config.data_dir)?;

        Ok(Self::new(store, embedding, config))
    }

    /// Creates a collection over an already-open store.
    ///
    /// Useful for tests and for alternative [`RecordStore`] backends.
    pub fn new(
        store: Box<dyn RecordStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            embedding,
            indexes: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
            config,
        }
    }

    /// Returns a reference to the collection configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Closes the collection, flushing the store.
    ///
    /// Indexes are in-memory derived structures and simply dropped; they
    /// are rebuilt from the store the next time they are attached.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing collection");
        self.store.close()
    }

    // =========================================================================
    // Index lifecycle
    // =========================================================================

    /// Attaches an index, immediately rebuilding it from a snapshot of all
    /// records.
    ///
    /// Attaching a second index with the same tag replaces the prior one;
    /// the slot keeps its original broadcast position. The rebuild runs
    /// under the collection's mutation lock, so the snapshot is consistent
    /// with the event stream the index will observe afterwards.
    #[instrument(skip(self, index), fields(kind = %index.kind()))]
    pub fn attach_index(&self, index: Arc<dyn Index>) -> Result<()> {
        let kind = index.kind();

        let _guard = self.mutation_guard()?;

        let snapshot = self.store.list_all()?;
        index.rebuild(&snapshot)?;

        let mut indexes = self.write_indexes()?;
        match indexes.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => {
                warn!(kind = %kind, "Replacing previously attached index");
                slot.1 = index;
            }
            None => indexes.push((kind, index)),
        }

        info!(kind = %kind, records = snapshot.len(), "Index attached");
        Ok(())
    }

    /// Attaches the three stock indexes (cosine, ivf, nsw) configured from
    /// this collection's [`Config`].
    pub fn attach_default_indexes(&self) -> Result<()> {
        self.attach_index(Arc::new(BruteForceCosineIndex::new(self.embedding.clone())))?;
        self.attach_index(Arc::new(IvfIndex::new(
            self.embedding.clone(),
            self.config.ivf,
        )))?;
        self.attach_index(Arc::new(NswIndex::new(
            self.embedding.clone(),
            self.config.nsw,
        )))?;
        Ok(())
    }

    /// Detaches the index with the given tag.
    ///
    /// Returns `true` if an index was detached, `false` if the tag was not
    /// attached.
    #[instrument(skip(self))]
    pub fn detach_index(&self, kind: IndexKind) -> Result<bool> {
        let mut indexes = self.write_indexes()?;
        let before = indexes.len();
        indexes.retain(|(k, _)| *k != kind);
        Ok(indexes.len() < before)
    }

    /// Returns the tags of the attached indexes in attach order.
    pub fn index_kinds(&self) -> Vec<IndexKind> {
        self.indexes
            .read()
            .map(|indexes| indexes.iter().map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Record CRUD
    // =========================================================================

    /// Adds a new record with an engine-assigned id.
    ///
    /// When no embedding is supplied the content is embedded through the
    /// collection's provider before anything is written. The record is
    /// persisted first, then broadcast to every attached index in attach
    /// order.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`](crate::ValidationError) if input is invalid
    /// - [`QuiverError::Embedding`] if the provider fails (nothing stored)
    pub fn add_record(&self, new: NewRecord) -> Result<Record> {
        validate_new_record(&new)?;

        // Embed before taking the mutation lock; a slow provider should
        // not stall unrelated mutations.
        let mut new = new;
        if new.embedding.is_none() {
            new.embedding = Some(self.embedding.embed(&new.content)?);
        }

        self.insert_record(Record::new(new))
    }

    /// Inserts a fully-formed record, keeping its caller-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`QuiverError::DuplicateId`] if the id already exists; the
    /// store and the indexes are unchanged in that case.
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub fn insert_record(&self, record: Record) -> Result<Record> {
        let _guard = self.mutation_guard()?;

        // Store first (source of truth), then fan out
        self.store.insert(&record)?;
        self.broadcast_add(&record)?;

        info!(id = %record.id, "Record added");
        Ok(record)
    }

    /// Retrieves a record by id.
    ///
    /// Returns `None` if no record with the given id exists.
    pub fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        self.store.get(id)
    }

    /// Returns every record in the collection.
    pub fn list_records(&self) -> Result<Vec<Record>> {
        self.store.list_all()
    }

    /// Returns true if a record with the given id exists.
    pub fn contains_record(&self, id: RecordId) -> Result<bool> {
        self.store.contains(id)
    }

    /// Returns the number of records in the collection.
    pub fn len(&self) -> Result<u64> {
        self.store.len()
    }

    /// Returns true if the collection holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    /// Applies a partial update to a record.
    ///
    /// `id` and `created_at` never change; `updated_at` is bumped. When
    /// the content changes and the update carries no explicit embedding,
    /// the new content is re-embedded so the replacement vector reaches
    /// every attached index. Each index observes the update as a
    /// `remove` followed by an `add`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`](crate::ValidationError) if updated values are invalid
    /// - [`NotFoundError::Record`] if the record doesn't exist
    #[instrument(skip(self, update))]
    pub fn update_record(&self, id: RecordId, update: RecordUpdate) -> Result<Record> {
        validate_record_update(&update)?;

        let _guard = self.mutation_guard()?;

        let mut record = self
            .store
            .get(id)?
            .ok_or_else(|| QuiverError::from(NotFoundError::record(id)))?;

        // Content changed without a replacement vector: re-embed
        let mut update = update;
        if let Some(ref content) = update.content {
            if update.embedding.is_none() && *content != record.content {
                update.embedding = Some(self.embedding.embed(content)?);
            }
        }

        record.apply(update);
        self.store.save(&record)?;

        // Each index sees remove + add so stale vectors and edges go away
        let indexes = self.read_indexes()?;
        for (kind, index) in indexes.iter() {
            index.remove(id)?;
            if let Err(e) = index.add(&record) {
                warn!(kind = %kind, id = %id, error = %e, "Index rejected updated record");
                return Err(e);
            }
        }
        drop(indexes);

        info!(id = %id, "Record updated");
        Ok(record)
    }

    /// Permanently deletes a record.
    ///
    /// Indexes observe the removal before the store delete, mirroring the
    /// attach-time rebuild contract: an index never references an id the
    /// store has already forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Record`] if the record doesn't exist.
    #[instrument(skip(self))]
    pub fn delete_record(&self, id: RecordId) -> Result<()> {
        let _guard = self.mutation_guard()?;

        let indexes = self.read_indexes()?;
        for (_, index) in indexes.iter() {
            index.remove(id)?;
        }
        drop(indexes);

        if !self.store.delete(id)? {
            return Err(QuiverError::from(NotFoundError::record(id)));
        }

        info!(id = %id, "Record deleted");
        Ok(())
    }

    // =========================================================================
    // Search dispatch
    // =========================================================================

    /// Searches the collection through the named index.
    ///
    /// The ranked `(id, score)` list from the index is joined against the
    /// store; results whose record has vanished between ranking and join
    /// are silently dropped.
    ///
    /// # Errors
    ///
    /// - [`QuiverError::UnknownIndex`] if no index with the tag is attached
    /// - [`QuiverError::Embedding`] if the query cannot be embedded
    #[instrument(skip(self, query))]
    pub fn search(&self, kind: IndexKind, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        // A blank query matches nothing; not an error
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        // Clone the handle under a short read lock; the search itself runs
        // against the index's own guard
        let index = {
            let indexes = self.read_indexes()?;
            indexes
                .iter()
                .find(|(tag, _)| *tag == kind)
                .map(|(_, index)| index.clone())
        }
        .ok_or_else(|| QuiverError::UnknownIndex(kind.to_string()))?;

        let ranked = index.search(query, k)?;
        self.join_results(ranked)
    }

    /// Joins ranked ids with their records, dropping vanished ones.
    fn join_results(&self, ranked: Vec<SearchResult>) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::with_capacity(ranked.len());
        for result in ranked {
            match self.store.get(result.id)? {
                Some(record) => hits.push(SearchHit {
                    id: record.id,
                    content: record.content,
                    score: result.score,
                    metadata: record.metadata,
                }),
                None => {
                    debug!(id = %result.id, "Record vanished between ranking and join");
                }
            }
        }
        Ok(hits)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Broadcasts an add event to every attached index in attach order.
    fn broadcast_add(&self, record: &Record) -> Result<()> {
        let indexes = self.read_indexes()?;
        for (kind, index) in indexes.iter() {
            if let Err(e) = index.add(record) {
                warn!(kind = %kind, id = %record.id, error = %e, "Index rejected record");
                return Err(e);
            }
        }
        Ok(())
    }

    fn mutation_guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| QuiverError::index("Collection mutation lock poisoned"))
    }

    fn read_indexes(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, Vec<(IndexKind, Arc<dyn Index>)>>> {
        self.indexes
            .read()
            .map_err(|_| QuiverError::index("Collection index list lock poisoned"))
    }

    fn write_indexes(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Vec<(IndexKind, Arc<dyn Index>)>>> {
        self.indexes
            .write()
            .map_err(|_| QuiverError::index("Collection index list lock poisoned"))
    }

    // =========================================================================
    // Test helpers
    // =========================================================================

    /// Returns a reference to the record store for integration testing.
    ///
    /// This method is intentionally hidden from documentation. It provides
    /// test-only access to the storage layer (e.g. to make a record vanish
    /// behind the indexes' back). Production code should use the public
    /// Collection API.
    #[doc(hidden)]
    #[inline]
    pub fn store_for_test(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

// Collection is auto Send + Sync: Box<dyn RecordStore>, Arc<dyn
// EmbeddingProvider>, and the guarded index list are all Send + Sync.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, StubEmbedding};
    use tempfile::tempdir;

    fn open_collection() -> (Collection, Arc<StubEmbedding>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let provider = Arc::new(StubEmbedding::new(3));
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Default::default()
        };
        let collection = Collection::open(config, provider.clone()).unwrap();
        (collection, provider, dir)
    }

    fn new_record(provider: &StubEmbedding, content: &str, vector: Vec<f32>) -> NewRecord {
        provider.set(content, vector.clone());
        NewRecord {
            content: content.to_string(),
            embedding: Some(vector),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_validates_config() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(StubEmbedding::new(3));
        let config = Config {
            data_dir: dir.path().join("data"),
            ivf: crate::config::IvfConfig {
                n_clusters: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = Collection::open(config, provider);
        assert!(result.is_err());
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_attach_rebuilds_from_snapshot() {
        let (collection, provider, _dir) = open_collection();

        // Records first, index later: attach must pick them up
        collection
            .add_record(new_record(&provider, "alpha", vec![1.0, 0.0, 0.0]))
            .unwrap();
        collection
            .add_record(new_record(&provider, "beta", vec![0.0, 1.0, 0.0]))
            .unwrap();

        collection
            .attach_index(Arc::new(BruteForceCosineIndex::new(provider.clone())))
            .unwrap();

        let hits = collection.search(IndexKind::Cosine, "alpha", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "alpha");
    }

    #[test]
    fn test_attach_same_tag_replaces() {
        let (collection, provider, _dir) = open_collection();
        collection
            .attach_index(Arc::new(BruteForceCosineIndex::new(provider.clone())))
            .unwrap();
        collection
            .attach_index(Arc::new(BruteForceCosineIndex::new(provider.clone())))
            .unwrap();

        assert_eq!(collection.index_kinds(), vec![IndexKind::Cosine]);
    }

    #[test]
    fn test_search_unknown_index() {
        let (collection, provider, _dir) = open_collection();
        provider.set("q", vec![1.0, 0.0, 0.0]);

        let err = collection.search(IndexKind::Nsw, "q", 5).unwrap_err();
        assert!(err.is_unknown_index());
    }

    #[test]
    fn test_detach_index() {
        let (collection, provider, _dir) = open_collection();
        collection
            .attach_index(Arc::new(BruteForceCosineIndex::new(provider.clone())))
            .unwrap();

        assert!(collection.detach_index(IndexKind::Cosine).unwrap());
        assert!(!collection.detach_index(IndexKind::Cosine).unwrap());
        assert!(collection.index_kinds().is_empty());
    }

    #[test]
    fn test_add_broadcasts_to_all_indexes() {
        let (collection, provider, _dir) = open_collection();
        collection.attach_default_indexes().unwrap();

        collection
            .add_record(new_record(&provider, "shared", vec![1.0, 0.0, 0.0]))
            .unwrap();

        for kind in [IndexKind::Cosine, IndexKind::Ivf, IndexKind::Nsw] {
            let hits = collection.search(kind, "shared", 1).unwrap();
            assert_eq!(hits.len(), 1, "index {} missed the broadcast", kind);
            assert_eq!(hits[0].content, "shared");
        }
    }

    #[test]
    fn test_insert_duplicate_id_rejected() {
        let (collection, provider, _dir) = open_collection();
        provider.set("dup", vec![1.0, 0.0, 0.0]);
        let record = chunk("dup", vec![1.0, 0.0, 0.0]);

        collection.insert_record(record.clone()).unwrap();
        let err = collection.insert_record(record).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(collection.len().unwrap(), 1);
    }

    #[test]
    fn test_add_embeds_when_vector_missing() {
        let (collection, provider, _dir) = open_collection();
        provider.set("needs embedding", vec![0.0, 0.0, 1.0]);

        let record = collection
            .add_record(NewRecord {
                content: "needs embedding".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(record.embedding, Some(vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_add_fails_when_provider_fails() {
        let (collection, _provider, _dir) = open_collection();

        let err = collection
            .add_record(NewRecord {
                content: "unregistered".to_string(),
                ..Default::default()
            })
            .unwrap_err();

        assert!(err.is_embedding());
        assert!(collection.is_empty().unwrap());
    }

    #[test]
    fn test_update_reembeds_on_content_change() {
        let (collection, provider, _dir) = open_collection();
        collection.attach_default_indexes().unwrap();

        let record = collection
            .add_record(new_record(&provider, "old text", vec![1.0, 0.0, 0.0]))
            .unwrap();

        provider.set("new text", vec![0.0, 1.0, 0.0]);
        let updated = collection
            .update_record(
                record.id,
                RecordUpdate {
                    content: Some("new text".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.embedding, Some(vec![0.0, 1.0, 0.0]));
        assert_eq!(updated.created_at, record.created_at);

        // The new vector reaches every index
        for kind in collection.index_kinds() {
            let hits = collection.search(kind, "new text", 1).unwrap();
            assert_eq!(hits[0].id, record.id);
            assert!((hits[0].score - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_update_missing_record() {
        let (collection, _provider, _dir) = open_collection();
        let err = collection
            .update_record(
                RecordId::new(),
                RecordUpdate {
                    content: Some("anything".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_removes_from_store_and_indexes() {
        let (collection, provider, _dir) = open_collection();
        collection.attach_default_indexes().unwrap();

        let keep = collection
            .add_record(new_record(&provider, "keep", vec![1.0, 0.0, 0.0]))
            .unwrap();
        let gone = collection
            .add_record(new_record(&provider, "gone", vec![0.9, 0.1, 0.0]))
            .unwrap();

        collection.delete_record(gone.id).unwrap();

        assert!(collection.get_record(gone.id).unwrap().is_none());
        for kind in collection.index_kinds() {
            let hits = collection.search(kind, "gone", 5).unwrap();
            assert!(hits.iter().all(|h| h.id != gone.id));
            assert!(hits.iter().any(|h| h.id == keep.id));
        }
    }

    #[test]
    fn test_delete_missing_record() {
        let (collection, _provider, _dir) = open_collection();
        let err = collection.delete_record(RecordId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_search_drops_vanished_records() {
        let (collection, provider, _dir) = open_collection();
        collection
            .attach_index(Arc::new(BruteForceCosineIndex::new(provider.clone())))
            .unwrap();

        let record = collection
            .add_record(new_record(&provider, "ghost", vec![1.0, 0.0, 0.0]))
            .unwrap();

        // Delete behind the indexes' back: the id is still ranked but the
        // join must drop it
        collection.store_for_test().delete(record.id).unwrap();

        let hits = collection.search(IndexKind::Cosine, "ghost", 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_collection_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Collection>();
    }
}

//! Inverted File (IVF) index: k-means partitioned approximate search.
//!
//! The vector space is divided into `n_clusters` partitions by seeded
//! k-means. Each stored vector belongs to exactly one cluster. A query is
//! routed to its `nprobe` nearest centroids by Euclidean distance and only
//! the members of those clusters are ranked by cosine similarity, the
//! engine's uniform metric. The centroid routing is a coarse locality
//! filter, which is why the two metrics differ.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::IvfConfig;
use crate::distance::{cosine_similarity, euclidean_distance};
use crate::embedding::EmbeddingProvider;
use crate::error::{QuiverError, Result, ValidationError};
use crate::record::Record;
use crate::types::{Embedding, RecordId};

use super::kmeans::KMeans;
use super::{sort_results, Index, IndexKind, SearchResult};

/// Fixed seed for k-means training, so a rebuild over the same snapshot
/// reproduces the same partitioning.
const KMEANS_SEED: u64 = 42;

/// Approximate k-NN index over k-means partitions.
///
/// # Thread Safety
///
/// State is guarded by `std::sync::RwLock`: searches share a read guard,
/// mutations take the write guard. The query is embedded before the guard
/// is acquired.
pub struct IvfIndex {
    provider: Arc<dyn EmbeddingProvider>,
    config: IvfConfig,
    state: RwLock<IvfState>,
}

#[derive(Default)]
struct IvfState {
    /// Trained partitioner. `None` until the first rebuild or add.
    kmeans: Option<KMeans>,

    /// cluster id → member record ids. BTreeMap so scans run in cluster-id
    /// order. Emptied clusters keep their entry (and their centroid).
    clusters: BTreeMap<usize, Vec<RecordId>>,

    /// id → stored vector.
    vectors: HashMap<RecordId, Embedding>,

    /// Dimension shared by every stored vector. Set by the first insert.
    dimension: Option<usize>,
}

impl IvfState {
    /// Drops `id` from whichever cluster member list holds it.
    ///
    /// Scans clusters in id order and removes the first occurrence only;
    /// referential consistency guarantees there is at most one.
    fn remove_membership(&mut self, id: RecordId) {
        for members in self.clusters.values_mut() {
            if let Some(pos) = members.iter().position(|&m| m == id) {
                members.remove(pos);
                break;
            }
        }
    }

    fn check_dimension(&mut self, embedding: &[f32]) -> Result<()> {
        match self.dimension {
            Some(d) if d != embedding.len() => Err(QuiverError::Validation(
                ValidationError::dimension_mismatch(d, embedding.len()),
            )),
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(embedding.len());
                Ok(())
            }
        }
    }
}

impl IvfIndex {
    /// Creates a new empty, untrained index.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: IvfConfig) -> Self {
        Self {
            provider,
            config,
            state: RwLock::new(IvfState::default()),
        }
    }

    /// Returns true once a partitioner has been trained.
    pub fn is_trained(&self) -> bool {
        self.state
            .read()
            .map(|s| s.kmeans.is_some())
            .unwrap_or(false)
    }

    /// Returns the number of trained centroids.
    pub fn cluster_count(&self) -> usize {
        self.state
            .read()
            .map(|s| s.kmeans.as_ref().map_or(0, |k| k.len()))
            .unwrap_or(0)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, IvfState>> {
        self.state
            .write()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, IvfState>> {
        self.state
            .read()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }
}

impl Index for IvfIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Ivf
    }

    fn rebuild(&self, snapshot: &[Record]) -> Result<()> {
        let mut state = self.write_state()?;
        state.kmeans = None;
        state.clusters.clear();
        state.vectors.clear();
        state.dimension = None;

        // Collect well-embedded records; the first one pins the dimension
        let mut ids = Vec::new();
        let mut embeddings: Vec<Embedding> = Vec::new();
        for record in snapshot {
            let Some(ref embedding) = record.embedding else {
                warn!(id = %record.id, "Record has no embedding, skipping during rebuild");
                continue;
            };
            match state.dimension {
                None => state.dimension = Some(embedding.len()),
                Some(d) if d != embedding.len() => {
                    warn!(
                        id = %record.id,
                        expected = d,
                        got = embedding.len(),
                        "Record embedding has wrong dimension, skipping during rebuild"
                    );
                    continue;
                }
                Some(_) => {}
            }
            ids.push(record.id);
            embeddings.push(embedding.clone());
        }

        if ids.is_empty() {
            // Nothing to train on; the index stays empty and untrained
            return Ok(());
        }

        let k = self.config.n_clusters.min(embeddings.len());
        let kmeans = KMeans::train(&embeddings, k, KMEANS_SEED);

        for (id, embedding) in ids.into_iter().zip(embeddings) {
            let cluster = kmeans.predict(&embedding);
            state.clusters.entry(cluster).or_default().push(id);
            state.vectors.insert(id, embedding);
        }
        state.kmeans = Some(kmeans);

        debug!(
            vectors = state.vectors.len(),
            clusters = state.clusters.len(),
            "Rebuilt IVF index"
        );
        Ok(())
    }

    /// Adds a single record's vector.
    ///
    /// If the index is untrained this installs a trivial one-centroid
    /// partitioner seeded by the vector. Otherwise the vector is routed to
    /// its nearest existing centroid without re-training, so centroids
    /// drift out of alignment under long sequences of incremental adds.
    /// Callers that mutate heavily should periodically trigger a full
    /// `rebuild`.
    fn add(&self, record: &Record) -> Result<()> {
        let Some(ref embedding) = record.embedding else {
            warn!(id = %record.id, "Cannot add record to index: no embedding present");
            return Ok(());
        };

        let mut state = self.write_state()?;
        state.check_dimension(embedding)?;

        // Re-adding an existing id replaces the prior vector and its
        // cluster membership
        if state.vectors.contains_key(&record.id) {
            state.remove_membership(record.id);
        }

        let cluster = match state.kmeans.as_ref() {
            Some(kmeans) => kmeans.predict(embedding),
            None => {
                // Untrained: install a trivial one-centroid partitioner
                // seeded by this vector. It routes everything to cluster 0.
                state.kmeans = Some(KMeans::from_centroids(vec![embedding.clone()]));
                0
            }
        };
        state.clusters.entry(cluster).or_default().push(record.id);
        state.vectors.insert(record.id, embedding.clone());

        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<()> {
        let mut state = self.write_state()?;
        if !state.vectors.contains_key(&id) {
            return Ok(());
        }

        // Empty clusters are retained; their centroid is unchanged
        state.remove_membership(id);
        state.vectors.remove(&id);
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        // Embed before taking the read guard so a suspended provider call
        // never blocks writers.
        let query_vec = self.provider.embed(query)?;

        let state = self.read_state()?;
        let Some(ref kmeans) = state.kmeans else {
            return Ok(Vec::new());
        };
        if state.vectors.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(d) = state.dimension {
            if query_vec.len() != d {
                return Err(QuiverError::Validation(
                    ValidationError::dimension_mismatch(d, query_vec.len()),
                ));
            }
        }

        // Route: Euclidean distance to every centroid, probe the nearest
        let n_probe = self.config.nprobe.min(kmeans.len());
        let mut centroid_dists: Vec<(usize, f32)> = kmeans
            .centroids()
            .iter()
            .enumerate()
            .map(|(cluster, centroid)| (cluster, euclidean_distance(&query_vec, centroid)))
            .collect();
        centroid_dists.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        // Rank: cosine similarity against the actual vectors of the union
        let mut results = Vec::new();
        for &(cluster, _) in centroid_dists.iter().take(n_probe) {
            let Some(members) = state.clusters.get(&cluster) else {
                continue;
            };
            for id in members {
                if let Some(vector) = state.vectors.get(id) {
                    results.push(SearchResult {
                        id: *id,
                        score: cosine_similarity(&query_vec, vector),
                    });
                }
            }
        }

        sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.state.read().map(|s| s.vectors.len()).unwrap_or(0)
    }
}

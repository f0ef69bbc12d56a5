//! Navigable Small World (NSW) graph index.
//!
//! Each node is wired to its nearest neighbors by cosine similarity and
//! queries walk the graph greedily from an arbitrary entry point. Insertion
//! installs edges symmetrically, so out-degree grows unbounded over the
//! life of the index; no pruning is applied. The `ef_construction`
//! parameter is accepted and stored but the greedy construction only needs
//! the out-degree target `n_neighbors`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::NswConfig;
use crate::distance::{cosine_similarity, l2_norm};
use crate::embedding::EmbeddingProvider;
use crate::error::{QuiverError, Result, ValidationError};
use crate::record::Record;
use crate::types::{Embedding, RecordId};

use super::{sort_results, Index, IndexKind, SearchResult};

/// Approximate k-NN index over a proximity graph.
///
/// # Thread Safety
///
/// State is guarded by `std::sync::RwLock`: searches share a read guard,
/// mutations take the write guard. The query is embedded before the guard
/// is acquired.
pub struct NswIndex {
    provider: Arc<dyn EmbeddingProvider>,
    config: NswConfig,
    state: RwLock<NswState>,
}

#[derive(Default)]
struct NswState {
    /// id → stored vector.
    vectors: HashMap<RecordId, Embedding>,

    /// id → out-neighbor set.
    graph: HashMap<RecordId, HashSet<RecordId>>,

    /// Dimension shared by every stored vector. Set by the first insert.
    dimension: Option<usize>,
}

impl NswState {
    /// Returns the ids of the `m` nearest stored vectors to `embedding`,
    /// excluding `exclude` itself. Zero-norm stored vectors are skipped.
    /// Ties break on id ordinal.
    fn nearest_neighbors(
        &self,
        exclude: RecordId,
        embedding: &[f32],
        m: usize,
    ) -> Vec<RecordId> {
        let mut scored: Vec<SearchResult> = self
            .vectors
            .iter()
            .filter(|(id, other)| **id != exclude && l2_norm(other) != 0.0)
            .map(|(id, other)| SearchResult {
                id: *id,
                score: cosine_similarity(embedding, other),
            })
            .collect();
        sort_results(&mut scored);
        scored.truncate(m);
        scored.into_iter().map(|r| r.id).collect()
    }

    /// Detaches a node: discards reverse edges held by its out-neighbors
    /// and drops its adjacency entry and vector.
    fn detach(&mut self, id: RecordId) {
        if let Some(neighbors) = self.graph.remove(&id) {
            for neighbor in neighbors {
                if let Some(out) = self.graph.get_mut(&neighbor) {
                    out.remove(&id);
                }
            }
        }
        self.vectors.remove(&id);
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

impl NswIndex {
    /// Creates a new empty index.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: NswConfig) -> Self {
        Self {
            provider,
            config,
            state: RwLock::new(NswState::default()),
        }
    }

    /// Returns the out-degree of a node, or `None` if it is not present.
    pub fn out_degree(&self, id: RecordId) -> Option<usize> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.graph.get(&id).map(|n| n.len()))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, NswState>> {
        self.state
            .write()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, NswState>> {
        self.state
            .read()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }
}

impl Index for NswIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Nsw
    }

    fn rebuild(&self, snapshot: &[Record]) -> Result<()> {
        let mut state = self.write_state()?;
        state.vectors.clear();
        state.graph.clear();
        state.dimension = None;

        // First pass: collect every well-embedded vector
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
            state.vectors.insert(record.id, embedding.clone());
        }

        // Second pass: wire each node to its nearest neighbors. Back-edges
        // are not installed here; symmetric installation is an insert-time
        // behavior only.
        let m = self.config.n_neighbors;
        let ids: Vec<RecordId> = state.vectors.keys().copied().collect();
        for id in ids {
            let Some(embedding) = state.vectors.get(&id).cloned() else {
                continue;
            };
            let neighbors = state.nearest_neighbors(id, &embedding, m);
            state.graph.insert(id, neighbors.into_iter().collect());
        }

        debug!(nodes = state.graph.len(), "Rebuilt NSW graph");
        Ok(())
    }

    fn add(&self, record: &Record) -> Result<()> {
        let Some(ref embedding) = record.embedding else {
            warn!(id = %record.id, "Cannot add record to index: no embedding present");
            return Ok(());
        };

        let mut state = self.write_state()?;
        state.check_dimension(embedding)?;

        // Re-adding a live id recomputes its edges from scratch
        if state.vectors.contains_key(&record.id) {
            state.detach(record.id);
        }

        state.vectors.insert(record.id, embedding.clone());

        let neighbors = state.nearest_neighbors(record.id, embedding, self.config.n_neighbors);
        state
            .graph
            .insert(record.id, neighbors.iter().copied().collect());

        // Symmetric edge installation; neighbor out-degree grows unbounded
        for neighbor in neighbors {
            if let Some(out) = state.graph.get_mut(&neighbor) {
                out.insert(record.id);
            }
        }

        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<()> {
        let mut state = self.write_state()?;
        state.detach(id);
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        // Embed before taking the read guard so a suspended provider call
        // never blocks writers.
        let query_vec = self.provider.embed(query)?;

        let state = self.read_state()?;
        if state.vectors.is_empty() || l2_norm(&query_vec) == 0.0 {
            return Ok(Vec::new());
        }
        if let Some(d) = state.dimension {
            if query_vec.len() != d {
                return Err(QuiverError::Validation(
                    ValidationError::dimension_mismatch(d, query_vec.len()),
                ));
            }
        }

        // Arbitrary entry point: any element of the adjacency map
        let Some((&entry, _)) = state.graph.iter().next() else {
            return Ok(Vec::new());
        };

        let mut visited: HashSet<RecordId> = HashSet::new();
        visited.insert(entry);

        let entry_score = state
            .vectors
            .get(&entry)
            .map(|v| cosine_similarity(&query_vec, v))
            .unwrap_or(0.0);
        let mut candidates: Vec<SearchResult> = vec![SearchResult {
            id: entry,
            score: entry_score,
        }];
        let mut results: Vec<SearchResult> = Vec::new();

        while let Some(current) = pop_best(&mut candidates) {
            results.push(current);

            // Explore unvisited out-neighbors of the chosen node
            if let Some(neighbors) = state.graph.get(&current.id) {
                for &neighbor in neighbors {
                    if !visited.insert(neighbor) {
                        continue;
                    }
                    // Dangling edges to departed nodes are skipped
                    if let Some(vector) = state.vectors.get(&neighbor) {
                        candidates.push(SearchResult {
                            id: neighbor,
                            score: cosine_similarity(&query_vec, vector),
                        });
                    }
                }
            }

            // Greedy stop: enough results and no remaining candidate beats
            // the one just taken
            if results.len() >= k {
                let best_remaining = candidates
                    .iter()
                    .map(|c| c.score)
                    .fold(f32::NEG_INFINITY, f32::max);
                if best_remaining < current.score {
                    break;
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

/// Removes and returns the highest-scoring candidate, breaking score ties
/// on id ordinal.
fn pop_best(candidates: &mut Vec<SearchResult>) -> Option<SearchResult> {
    if candidates.is_empty() {
        return None;
    }
    let mut best = 0;
    for i in 1..candidates.len() {
        let ordering = candidates[i]
            .score
            .total_cmp(&candidates[best].score)
            .then(candidates[best].id.cmp(&candidates[i].id));
        if ordering == std::cmp::Ordering::Greater {
            best = i;
        }
    }
    Some(candidates.swap_remove(best))
}

//! Exact brute-force cosine similarity index.
//!
//! The simplest of the three variants: a flat `id → vector` map scanned in
//! full on every query. O(N·D) per search, exact top-k. The other indexes
//! trade recall for speed; this one is the reference ranking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::distance::{cosine_similarity, l2_norm};
use crate::embedding::EmbeddingProvider;
use crate::error::{QuiverError, Result, ValidationError};
use crate::record::Record;
use crate::types::{Embedding, RecordId};

use super::{sort_results, Index, IndexKind, SearchResult};

/// Exact k-NN index using a dense cosine scan.
///
/// # Thread Safety
///
/// State is guarded by `std::sync::RwLock`: searches share a read guard,
/// mutations take the write guard. The query is embedded before the guard
/// is acquired.
pub struct BruteForceCosineIndex {
    provider: Arc<dyn EmbeddingProvider>,
    state: RwLock<BruteState>,
}

#[derive(Debug, Default)]
struct BruteState {
    /// id → stored vector.
    vectors: HashMap<RecordId, Embedding>,

    /// Dimension shared by every stored vector. Set by the first insert.
    dimension: Option<usize>,
}

impl BruteForceCosineIndex {
    /// Creates a new empty index using the given embedding provider for
    /// query texts.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(BruteState::default()),
        }
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, BruteState>> {
        self.state
            .write()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, BruteState>> {
        self.state
            .read()
            .map_err(|_| QuiverError::index("Index state lock poisoned"))
    }
}

impl Index for BruteForceCosineIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Cosine
    }

    fn rebuild(&self, snapshot: &[Record]) -> Result<()> {
        let mut state = self.write_state()?;
        state.vectors.clear();
        state.dimension = None;

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

        debug!(vectors = state.vectors.len(), "Rebuilt brute-force index");
        Ok(())
    }

    fn add(&self, record: &Record) -> Result<()> {
        let Some(ref embedding) = record.embedding else {
            warn!(id = %record.id, "Cannot add record to index: no embedding present");
            return Ok(());
        };

        let mut state = self.write_state()?;
        if let Some(d) = state.dimension {
            if embedding.len() != d {
                return Err(QuiverError::Validation(
                    ValidationError::dimension_mismatch(d, embedding.len()),
                ));
            }
        } else {
            state.dimension = Some(embedding.len());
        }

        // Re-adding an existing id replaces the prior vector
        state.vectors.insert(record.id, embedding.clone());
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<()> {
        let mut state = self.write_state()?;
        state.vectors.remove(&id);
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

        let mut results: Vec<SearchResult> = state
            .vectors
            .iter()
            .filter(|(_, vector)| l2_norm(vector) != 0.0)
            .map(|(&id, vector)| SearchResult {
                id,
                score: cosine_similarity(&query_vec, vector),
            })
            .collect();

        sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.state.read().map(|s| s.vectors.len()).unwrap_or(0)
    }
}

//! Shared helpers for integration tests: a table-backed embedding stub
//! and collection constructors.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use quiver::embedding::EmbeddingProvider;
use quiver::{Collection, Config, Embedding, NewRecord, QuiverError, Record, Result};
use tempfile::TempDir;

/// Embedding provider backed by an explicit text → vector table.
///
/// Tests register the exact vectors they want; unknown texts fail the way
/// an unreachable provider would.
pub struct StubEmbedding {
    entries: RwLock<HashMap<String, Embedding>>,
    dimension: usize,
}

impl StubEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
        }
    }

    pub fn set(&self, text: &str, vector: Embedding) {
        self.entries
            .write()
            .unwrap()
            .insert(text.to_string(), vector);
    }
}

impl EmbeddingProvider for StubEmbedding {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let entries = self.entries.read().unwrap();
        texts
            .iter()
            .map(|text| {
                entries
                    .get(*text)
                    .cloned()
                    .ok_or_else(|| QuiverError::embedding(format!("no stub vector for '{}'", text)))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Opens a collection over a temp directory with the given embedding
/// dimension. No indexes attached.
pub fn open_collection(dimension: usize) -> (Collection, Arc<StubEmbedding>, TempDir) {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(StubEmbedding::new(dimension));
    let config = Config {
        data_dir: dir.path().join("data"),
        ..Default::default()
    };
    let collection = Collection::open(config, provider.clone()).unwrap();
    (collection, provider, dir)
}

/// Builds a record input, registering the content → vector mapping with
/// the provider so index queries for the same content resolve.
pub fn seeded_record(provider: &StubEmbedding, content: &str, vector: Embedding) -> NewRecord {
    provider.set(content, vector.clone());
    NewRecord {
        content: content.to_string(),
        embedding: Some(vector),
        ..Default::default()
    }
}

/// Builds a standalone record with the given content and embedding.
pub fn chunk(content: &str, embedding: Embedding) -> Record {
    Record::new(NewRecord {
        content: content.to_string(),
        embedding: Some(embedding),
        ..Default::default()
    })
}

/// Deterministic embedding derived from a seed.
/// Vectors with close seeds produce similar embeddings (smooth sin curve).
pub fn make_embedding(seed: u64, dim: usize) -> Embedding {
    (0..dim)
        .map(|i| (seed as f32 * 0.1 + i as f32 * 0.01).sin())
        .collect()
}

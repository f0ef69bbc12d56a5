//! Shared helpers for unit tests: a table-backed embedding stub and record
//! constructors. Compiled only for `cfg(test)`.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::embedding::EmbeddingProvider;
use crate::error::{QuiverError, Result};
use crate::record::{NewRecord, Record};
use crate::types::Embedding;

/// Embedding provider backed by an explicit text → vector table.
///
/// Tests register the exact vectors they want; unknown texts fail the way
/// an unreachable provider would, so accidental lookups surface loudly.
pub(crate) struct StubEmbedding {
    entries: RwLock<HashMap<String, Embedding>>,
    dimension: usize,
}

impl StubEmbedding {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
        }
    }

    pub(crate) fn set(&self, text: &str, vector: Embedding) {
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

/// Builds a record with the given content and embedding.
pub(crate) fn chunk(content: &str, embedding: Embedding) -> Record {
    Record::new(NewRecord {
        content: content.to_string(),
        embedding: Some(embedding),
        metadata: BTreeMap::new(),
    })
}

/// Builds a record without an embedding.
pub(crate) fn chunk_without_embedding(content: &str) -> Record {
    Record::new(NewRecord {
        content: content.to_string(),
        embedding: None,
        metadata: BTreeMap::new(),
    })
}

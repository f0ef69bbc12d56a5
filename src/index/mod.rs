//! Vector index abstractions for similarity search.
//!
//! This module provides a trait-based abstraction over the three index
//! variants quiver ships:
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │           Index trait            │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┼──────────────┬───────────────┐
//!    │ BruteForceCosine     │  IvfIndex     │  NswIndex
//!    │ (exact dense scan)   │  (clustered)  │  (proximity graph)
//!    └──────────────────────┴───────────────┘
//! ```
//!
//! All three rank with cosine similarity and are fed by the same record
//! lifecycle events. The record store is the **source of truth**; an index
//! is a derived, rebuildable structure reconstructed from a snapshot when
//! it is attached to a collection.

mod brute;
mod ivf;
mod kmeans;
mod nsw;

pub use brute::BruteForceCosineIndex;
pub use ivf::IvfIndex;
pub use nsw::NswIndex;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QuiverError, Result};
use crate::record::Record;
use crate::types::RecordId;

/// Symbolic tag identifying an index variant on a collection.
///
/// Used to attach, detach, and dispatch queries to a specific index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact brute-force cosine scan.
    Cosine,
    /// Inverted File (k-means partitioned) approximate index.
    Ivf,
    /// Navigable Small World graph index.
    Nsw,
}

impl IndexKind {
    /// Returns the lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Ivf => "ivf",
            Self::Nsw => "nsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = QuiverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "ivf" => Ok(Self::Ivf),
            "nsw" => Ok(Self::Nsw),
            other => Err(QuiverError::UnknownIndex(other.to_string())),
        }
    }
}

/// A ranked search result: a record id with its cosine similarity to the
/// query. Scores are surfaced unclamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchResult {
    /// Id of the matching record.
    pub id: RecordId,
    /// Cosine similarity between the query and the record's vector.
    pub score: f32,
}

/// Vector index trait.
///
/// Implementations must be `Send + Sync` for use inside a collection.
///
/// All methods take `&self` and use interior mutability: each index guards
/// its state with an `RwLock` so searches run concurrently while `add`,
/// `remove`, and `rebuild` are exclusive with both readers and each other.
/// `search` embeds the query text *before* acquiring its read guard, so a
/// suspended embedding call never blocks writers.
pub trait Index: Send + Sync {
    /// Returns the symbolic tag of this index variant.
    fn kind(&self) -> IndexKind;

    /// Discards all state and reconstructs the index from a snapshot.
    ///
    /// Records without a usable embedding are skipped with a warning.
    fn rebuild(&self, snapshot: &[Record]) -> Result<()>;

    /// Adds a single record's vector to the index.
    ///
    /// A record without an embedding is a logged no-op. Re-adding an
    /// existing id replaces the prior vector. A vector whose dimension
    /// differs from the index's fails with `DimensionMismatch` and leaves
    /// the index unchanged.
    fn add(&self, record: &Record) -> Result<()>;

    /// Removes a record's vector from the index.
    ///
    /// Missing ids are silently tolerated.
    fn remove(&self, id: RecordId) -> Result<()>;

    /// Embeds the query text and returns the top `k` records ranked by
    /// cosine similarity, descending.
    ///
    /// An empty index or a zero-norm query vector yields an empty result
    /// list, never an error.
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;

    /// Returns the number of vectors currently held.
    fn len(&self) -> usize;

    /// Returns true if the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorts results by score descending, breaking ties on id ordinal so that
/// equal-scoring results rank deterministically.
pub(crate) fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
}

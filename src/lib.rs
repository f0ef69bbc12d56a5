//! # quiver
//!
//! Embedded multi-index vector search engine for text chunk collections.
//!
//! quiver stores text chunks with their embedding vectors in a persistent
//! record store and serves top-k similarity queries through three
//! interchangeable indexes: an exact brute-force cosine scan, an Inverted
//! File (IVF) clustered index, and a Navigable Small World (NSW) proximity
//! graph. Query text is mapped to a vector by an external embedding
//! provider; cosine similarity is the uniform ranking metric.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quiver::{Collection, Config, IndexKind, NewRecord};
//! use quiver::embedding::RestEmbedding;
//!
//! // Open a collection and attach the three stock indexes
//! let provider = Arc::new(RestEmbedding::new(endpoint, "embed-v4", 1536));
//! let collection = Collection::open(Config::from_env(), provider)?;
//! collection.attach_default_indexes()?;
//!
//! // Add a chunk; the provider embeds the content
//! collection.add_record(NewRecord {
//!     content: "The sky above the port was the color of television".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // Query through the IVF index
//! let hits = collection.search(IndexKind::Ivf, "television sky", 5)?;
//!
//! collection.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Record store
//!
//! The record store is the **source of truth**: every record persists as
//! an individual JSON document keyed by its UUID. Indexes hold derived
//! copies of vectors only and are never persisted; attaching an index
//! rebuilds it from a snapshot of the store.
//!
//! ### Indexes
//!
//! All three variants share one capability set: `rebuild`, `add`,
//! `remove`, `search`. Mutations fan out from the collection to every
//! attached index in attach order; queries name a single index by its
//! [`IndexKind`] tag.
//!
//! ## Thread Safety
//!
//! [`Collection`] is `Send + Sync` and can be shared across threads using
//! `Arc`. Each index enforces a reader-writer discipline internally:
//! searches run concurrently, mutations are exclusive. Collection-level
//! mutations are serialised so every index observes the same event order.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod collection;
mod config;
mod distance;
mod error;
mod record;
mod types;

pub mod embedding;
pub mod storage;

/// Vector index module: the brute-force, IVF, and NSW variants.
pub mod index;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main collection interface
pub use collection::{Collection, SearchHit};

// Configuration
pub use config::{Config, IvfConfig, NswConfig, DATA_DIR_ENV};

// Error handling
pub use error::{NotFoundError, QuiverError, Result, StorageError, ValidationError};

// Core types
pub use types::{Embedding, MetadataValue, RecordId, Timestamp};

// Records
pub use record::{NewRecord, Record, RecordUpdate};

// Indexes
pub use index::{BruteForceCosineIndex, Index, IndexKind, IvfIndex, NswIndex, SearchResult};

// Storage (for advanced users)
pub use storage::DatabaseMetadata;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common quiver usage.
///
/// ```rust
/// use quiver::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collection::{Collection, SearchHit};
    pub use crate::config::Config;
    pub use crate::error::{QuiverError, Result};
    pub use crate::index::IndexKind;
    pub use crate::record::{NewRecord, Record, RecordUpdate};
    pub use crate::types::{RecordId, Timestamp};
}

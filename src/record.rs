//! Type definitions and validation for records.
//!
//! A **record** is the unit of indexed content in quiver: a text chunk
//! with an optional embedding vector and free-form metadata. Records live
//! in the record store (the source of truth); indexes hold derived copies
//! of the embedding only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Embedding, MetadataValue, RecordId, Timestamp};

/// Maximum content size in bytes (100 KB).
pub const MAX_CONTENT_SIZE: usize = 100 * 1024;

// ============================================================================
// Record: the full stored record
// ============================================================================

/// A stored record: a text chunk with its embedding and metadata.
///
/// Records are persisted as individual JSON documents keyed by UUID.
/// The embedding is optional: records without one are stored and served
/// normally but are skipped by every index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier (UUID v7, time-ordered). Immutable.
    pub id: RecordId,

    /// The chunk text.
    pub content: String,

    /// Embedding vector, if one has been computed for the content.
    pub embedding: Option<Embedding>,

    /// Free-form metadata carried through search results.
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Creation time. Immutable.
    pub created_at: Timestamp,

    /// Last mutation time. Bumped on every update.
    pub updated_at: Timestamp,
}

impl Record {
    /// Constructs a record from its parts, stamping both timestamps with
    /// the current time.
    pub fn new(new: NewRecord) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            content: new.content,
            embedding: new.embedding,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update, bumping `updated_at`.
    ///
    /// `id` and `created_at` are never touched. Fields left `None` in the
    /// update keep their current value.
    pub fn apply(&mut self, update: RecordUpdate) {
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(embedding) = update.embedding {
            self.embedding = Some(embedding);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        self.updated_at = Timestamp::now();
    }
}

// ============================================================================
// NewRecord / RecordUpdate: input types
// ============================================================================

/// Input for creating a record.
///
/// The engine assigns the id and timestamps. When `embedding` is `None`
/// the collection embeds `content` through its provider before storing.
#[derive(Clone, Debug, Default)]
pub struct NewRecord {
    /// The chunk text.
    pub content: String,

    /// Pre-computed embedding. Leave `None` to have the collection embed
    /// the content.
    pub embedding: Option<Embedding>,

    /// Free-form metadata.
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// Partial update for a record.
///
/// Only `Some` fields are applied. When `content` changes and no explicit
/// `embedding` accompanies it, the collection re-embeds the new content.
#[derive(Clone, Debug, Default)]
pub struct RecordUpdate {
    /// Replacement content.
    pub content: Option<String>,

    /// Replacement embedding.
    pub embedding: Option<Embedding>,

    /// Replacement metadata map (replaces the whole map, not merged).
    pub metadata: Option<BTreeMap<String, MetadataValue>>,
}

impl RecordUpdate {
    /// Returns true if the update carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.embedding.is_none() && self.metadata.is_none()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validates input for a new record.
///
/// Checks content bounds and, when an embedding is supplied, that it is
/// non-empty and contains only finite values.
pub fn validate_new_record(new: &NewRecord) -> Result<(), ValidationError> {
    validate_content(&new.content)?;
    if let Some(ref embedding) = new.embedding {
        validate_embedding_values(embedding)?;
    }
    Ok(())
}

/// Validates a partial update.
pub fn validate_record_update(update: &RecordUpdate) -> Result<(), ValidationError> {
    if let Some(ref content) = update.content {
        validate_content(content)?;
    }
    if let Some(ref embedding) = update.embedding {
        validate_embedding_values(embedding)?;
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::required_field("content"));
    }
    if content.len() > MAX_CONTENT_SIZE {
        return Err(ValidationError::content_too_large(
            content.len(),
            MAX_CONTENT_SIZE,
        ));
    }
    Ok(())
}

fn validate_embedding_values(embedding: &[f32]) -> Result<(), ValidationError> {
    if embedding.is_empty() {
        return Err(ValidationError::invalid_field(
            "embedding",
            "must not be empty",
        ));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::invalid_field(
            "embedding",
            "must contain only finite values",
        ));
    }
    Ok(())
}

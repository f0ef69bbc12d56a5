//! Configuration types for quiver.
//!
//! The [`Config`] struct controls engine behavior:
//! - Where the record store lives on disk (`data_dir`, or the `DATA_DIR`
//!   environment variable via [`Config::from_env`])
//! - IVF index parameters ([`IvfConfig`])
//! - NSW index parameters ([`NswConfig`])
//!
//! # Example
//! ```rust
//! use quiver::{Config, IvfConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Customize the IVF partitioning
//! let config = Config {
//!     ivf: IvfConfig {
//!         n_clusters: 32,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Environment variable naming the record store root directory.
///
/// Read once by [`Config::from_env`]; later changes to the process
/// environment have no effect on an opened collection.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Engine configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use quiver::Config;
///
/// let config = Config {
///     data_dir: "./my-data".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory for the record store.
    ///
    /// The store file is created inside this directory. Default: `./data`.
    pub data_dir: PathBuf,

    /// IVF index parameters.
    pub ivf: IvfConfig,

    /// NSW index parameters.
    pub nsw: NswConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            ivf: IvfConfig::default(),
            nsw: NswConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config with the data directory taken from the `DATA_DIR`
    /// environment variable, falling back to `./data` when unset.
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically when a collection is opened. You can also call
    /// this explicitly to check configuration up front.
    ///
    /// # Errors
    /// Returns `ValidationError` if any index parameter is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ivf.n_clusters == 0 {
            return Err(ValidationError::invalid_field(
                "ivf.n_clusters",
                "must be greater than 0",
            ));
        }
        if self.ivf.nprobe == 0 {
            return Err(ValidationError::invalid_field(
                "ivf.nprobe",
                "must be greater than 0",
            ));
        }
        if self.nsw.n_neighbors == 0 {
            return Err(ValidationError::invalid_field(
                "nsw.n_neighbors",
                "must be greater than 0",
            ));
        }
        if self.nsw.ef_construction == 0 {
            return Err(ValidationError::invalid_field(
                "nsw.ef_construction",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Configuration for the IVF (Inverted File) index.
///
/// Controls the trade-off between partition granularity and query breadth.
/// Coarser partitions (fewer clusters) increase recall at the cost of
/// scanning more candidates per probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfConfig {
    /// Target number of k-means partitions.
    ///
    /// The effective count is capped at the number of indexed vectors.
    /// Default: 100
    pub n_clusters: usize,

    /// Number of clusters probed per query.
    ///
    /// The effective count is capped at the number of trained centroids.
    /// Default: 3
    pub nprobe: usize,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            n_clusters: 100,
            nprobe: 3,
        }
    }
}

/// Configuration for the NSW (Navigable Small World) index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NswConfig {
    /// Out-degree target at construction (the M parameter).
    ///
    /// Each node is wired to its `n_neighbors` nearest neighbors when it
    /// is inserted. Default: 5
    pub n_neighbors: usize,

    /// Candidate-list size during construction.
    ///
    /// Accepted and stored; the current greedy construction only requires
    /// `n_neighbors`. Reserved for a bounded-candidate-list upgrade.
    /// Default: 100
    pub ef_construction: usize,
}

impl Default for NswConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            ef_construction: 100,
        }
    }
}

//! Configuration for the sync service.
//!
//! # Example
//!
//! ```
//! use person_search_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.batch_size, 100);
//! assert_eq!(config.bulk_max_operations, 10_000);
//!
//! // Tuned config
//! let config = SyncConfig {
//!     batch_size: 500,
//!     bulk_flush_ms: 1_000,
//!     flush_after_batch: true,
//!     ..Default::default()
//! };
//! assert_eq!(config.batch_config().flush_ms, 1_000);
//! ```

use serde::Deserialize;

use crate::batching::BatchConfig;

/// Configuration for the sync service.
///
/// All fields have defaults; a host process can deserialize a partial
/// document and get a complete config.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Persons generated per `save_batch` call during population
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Bulk indexer count threshold
    #[serde(default = "default_bulk_max_operations")]
    pub bulk_max_operations: usize,

    /// Bulk indexer time threshold, measured from the last flush
    #[serde(default = "default_bulk_flush_ms")]
    pub bulk_flush_ms: u64,

    /// Flush the indexer after every `save_batch`/`upsert` and report
    /// flush failures to the caller
    #[serde(default)]
    pub flush_after_batch: bool,

    /// Page size of `search_all`
    #[serde(default = "default_search_all_limit")]
    pub search_all_limit: usize,
}

fn default_batch_size() -> usize { 100 }
fn default_bulk_max_operations() -> usize { 10_000 }
fn default_bulk_flush_ms() -> u64 { 5_000 }
fn default_search_all_limit() -> usize { 10_000 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            bulk_max_operations: default_bulk_max_operations(),
            bulk_flush_ms: default_bulk_flush_ms(),
            flush_after_batch: false,
            search_all_limit: default_search_all_limit(),
        }
    }
}

impl SyncConfig {
    /// Thresholds for the bulk indexer's batcher. Both are at least 1.
    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            flush_ms: self.bulk_flush_ms.max(1),
            flush_count: self.bulk_max_operations.max(1),
        }
    }
}

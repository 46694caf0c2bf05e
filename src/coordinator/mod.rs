// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync service coordinator.
//!
//! The [`SyncService`] ties the components together:
//! - record store (ground truth)
//! - bulk indexer projecting every write into the search index
//! - query builder and search gateway for the read path
//! - the batched population job and its progress counter
//!
//! # Consistency
//!
//! Every write goes to the record store first and is then enqueued for the
//! index. The two are not transactional: the index lags the store until the
//! bulk indexer flushes, and a crash between the two leaves the index stale
//! for those documents until they are written again or the index is
//! repopulated. Reads from the index may not yet reflect recent writes.
//!
//! # Lifecycle
//!
//! ```text
//! Created → Starting → Running → ShuttingDown → Stopped
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use person_search_sync::{
//!     InMemoryRecordStore, InMemorySearchGateway, Person, SyncConfig, SyncService,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let service = SyncService::new(
//!     SyncConfig::default(),
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(InMemorySearchGateway::new()),
//! );
//! service.start().await.unwrap();
//!
//! let saved = service.upsert(7, Person::new("Joe Smith")).await.unwrap();
//! assert_eq!(saved.id, Some(7));
//!
//! service.flush().await.unwrap();
//! let found = service.search("joe", None, None, 0, 10).await.unwrap();
//! assert_eq!(found.total, 1);
//!
//! service.shutdown().await.unwrap();
//! # }
//! ```

mod types;
mod lifecycle;
mod write_api;
mod populate;
mod search_api;
mod maintenance;

pub use types::{PopulationResult, QueryTimings, ServiceState, SyncError};

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::gateway::SearchGateway;
use crate::indexer::{BulkIndexer, IndexerStats};
use crate::storage::RecordStore;

/// Live state of the population job, readable without locks.
pub(super) struct PopulationState {
    running: AtomicBool,
    processed: AtomicU64,
    /// Run start, nanoseconds after `base`
    started_at_nanos: AtomicU64,
    base: Instant,
}

impl PopulationState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            started_at_nanos: AtomicU64::new(0),
            base: Instant::now(),
        }
    }
}

/// Dual-write coordinator between the record store and the search index.
///
/// `Send + Sync`; share it behind an `Arc` between request handlers.
/// [`SyncService::spawn_populate`] needs that `Arc`.
pub struct SyncService {
    pub(super) config: SyncConfig,
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) gateway: Arc<dyn SearchGateway>,
    pub(super) indexer: BulkIndexer,
    pub(super) state: watch::Sender<ServiceState>,
    pub(super) state_rx: watch::Receiver<ServiceState>,
    pub(super) population: PopulationState,
}

impl SyncService {
    /// Create the service and its bulk indexer. Must be called inside a
    /// Tokio runtime.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn SearchGateway>,
    ) -> Self {
        let indexer = BulkIndexer::new(gateway.clone(), config.batch_config());
        let (state, state_rx) = watch::channel(ServiceState::Created);
        Self {
            config,
            store,
            gateway,
            indexer,
            state,
            state_rx,
            population: PopulationState::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ServiceState> {
        self.state_rx.clone()
    }

    /// Bulk indexer counters
    #[must_use]
    pub fn indexer_stats(&self) -> IndexerStats {
        self.indexer.stats()
    }

    /// Push every pending index operation to the engine and wait.
    pub async fn flush(&self) -> Result<(), SyncError> {
        self.indexer.flush().await.map_err(SyncError::from)
    }

    pub(super) fn set_state(&self, state: ServiceState) {
        crate::metrics::set_service_state(&state.to_string());
        let _ = self.state.send(state);
    }
}

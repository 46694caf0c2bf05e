//! Maintenance: wiping both sides and comparing full-scan timings.

use std::time::Instant;
use tracing::{error, info};

use crate::metrics;

use super::{QueryTimings, SyncError, SyncService};

impl SyncService {
    /// Delete every record from the store, then every document from the
    /// index.
    ///
    /// Buffered index operations are flushed first so none of them lands
    /// after the wipe. If the index cannot be cleared the store stays
    /// cleared and `IndexUnavailable` is returned.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<(), SyncError> {
        if let Err(e) = self.indexer.flush().await {
            // Those operations targeted documents about to be wiped anyway
            info!(error = %e, "Pending index operations failed before clear");
        }

        self.store.delete_all().await?;

        if let Err(e) = self.gateway.delete_all().await {
            error!(error = %e, "Record store cleared but search index was not");
            metrics::record_error("index", "delete_all", "unavailable");
            return Err(e.into());
        }

        info!("Record store and search index cleared");
        Ok(())
    }

    /// Time a full scan of the store against a full scan of the index.
    #[tracing::instrument(skip(self))]
    pub async fn measure_query_performance(&self) -> Result<QueryTimings, SyncError> {
        let start = Instant::now();
        let stored = self.store.find_all().await?;
        let store_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let indexed = self.search_all().await?;
        let index_ms = start.elapsed().as_millis() as u64;

        let timings = QueryTimings {
            store_ms,
            store_count: stored.len(),
            index_ms,
            index_count: indexed.hits.len(),
        };
        info!(?timings, "Full-scan timings");
        Ok(timings)
    }
}

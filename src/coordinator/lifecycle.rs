//! Service lifecycle: index bootstrap and shutdown.

use std::time::Instant;
use tracing::{error, info};

use super::{ServiceState, SyncError, SyncService};

impl SyncService {
    /// Bootstrap the search index (create if absent) and start serving.
    ///
    /// Idempotent: an existing index is left alone. On failure the service
    /// stays in `Created` and `start` may be called again.
    #[tracing::instrument(skip(self), fields(created))]
    pub async fn start(&self) -> Result<(), SyncError> {
        let started = Instant::now();
        self.set_state(ServiceState::Starting);

        match self.gateway.ensure_index().await {
            Ok(created) => {
                tracing::Span::current().record("created", created);
                crate::metrics::record_index_created(created);
                self.set_state(ServiceState::Running);
                info!(
                    created,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Sync service running"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Search index bootstrap failed");
                crate::metrics::record_error("index", "ensure_index", "unavailable");
                self.set_state(ServiceState::Created);
                Err(e.into())
            }
        }
    }

    /// Final flush of the bulk indexer, then refuse further writes.
    ///
    /// The service is `Stopped` afterwards even if the final flush failed;
    /// that failure is returned.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        if self.state() == ServiceState::Stopped {
            return Ok(());
        }
        info!("Sync service shutting down...");
        self.set_state(ServiceState::ShuttingDown);

        let result = self.indexer.close().await;
        self.set_state(ServiceState::Stopped);

        match &result {
            Ok(()) => info!(stats = ?self.indexer.stats(), "Sync service stopped"),
            Err(e) => error!(error = %e, "Final flush failed during shutdown"),
        }
        result.map_err(SyncError::from)
    }
}

//! Write path: persist to the record store, then project into the index.

use std::time::Instant;
use tracing::debug;

use crate::gateway::BulkOperation;
use crate::indexer::IndexError;
use crate::metrics;
use crate::person::{Person, PersonId};

use super::{SyncError, SyncService};

impl SyncService {
    /// Canonical record from the store.
    pub async fn get(&self, id: PersonId) -> Result<Person, SyncError> {
        let _timer = metrics::LatencyTimer::new("store", "get");
        self.store
            .find_by_id(id)
            .await?
            .ok_or(SyncError::NotFound(id))
    }

    /// Create or partially update the person at `id`.
    ///
    /// An existing record gets every non-null field of `incoming` merged
    /// onto it (address merged field by field); its id never changes. A
    /// missing record is created from `incoming` with its id set to `id`.
    /// The persisted version is what gets indexed. If the store write fails
    /// nothing is enqueued.
    #[tracing::instrument(skip(self, incoming))]
    pub async fn upsert(&self, id: PersonId, incoming: Person) -> Result<Person, SyncError> {
        let start = Instant::now();

        let person = match self.store.find_by_id(id).await? {
            Some(mut stored) => {
                stored.merge_from(&incoming);
                stored
            }
            None => Person { id: Some(id), ..incoming },
        };

        let saved = self.store.save(person).await.inspect_err(|e| {
            metrics::record_error("store", "upsert", "backend");
            debug!(error = %e, "Upsert not persisted, nothing enqueued");
        })?;
        self.indexer.enqueue_upsert(&saved)?;

        if self.config.flush_after_batch {
            self.flush().await?;
        }

        metrics::record_operation("store", "upsert", true);
        metrics::record_latency("store", "upsert", start.elapsed());
        Ok(saved)
    }

    /// Delete from the store, then from the index. `None` is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Option<PersonId>) -> Result<(), SyncError> {
        let Some(id) = id else {
            debug!("Delete without id ignored");
            return Ok(());
        };

        self.store.delete_by_id(id).await?;
        self.indexer.enqueue_delete(id)?;
        metrics::record_operation("store", "delete", true);
        Ok(())
    }

    /// Persist persons in one store call, then enqueue one index operation
    /// per persisted person. Returns the persisted persons, ids assigned.
    ///
    /// With `flush_after_batch` the indexer is flushed before returning and
    /// a flush failure is returned; the store writes are kept either way.
    #[tracing::instrument(skip(self, persons), fields(count = persons.len()))]
    pub async fn save_batch(&self, persons: Vec<Person>) -> Result<Vec<Person>, SyncError> {
        if persons.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let saved = self.store.save_all(persons).await?;
        let operations = saved
            .iter()
            .map(|p| BulkOperation::index(p).ok_or(IndexError::MissingId))
            .collect::<Result<Vec<_>, _>>()?;
        self.indexer.enqueue_batch(operations)?;

        if self.config.flush_after_batch {
            self.flush().await?;
        }

        metrics::record_operation("store", "save_batch", true);
        metrics::record_latency("store", "save_batch", start.elapsed());
        debug!(saved = saved.len(), "Batch persisted and enqueued");
        Ok(saved)
    }
}

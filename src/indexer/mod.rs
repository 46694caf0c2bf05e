// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk indexer.
//!
//! Buffers index/delete operations and ships them to the search engine in
//! bulk requests. A batch is cut when the buffer reaches the count threshold,
//! when the flush interval has elapsed since the last flush, on an explicit
//! [`BulkIndexer::flush`], or on [`BulkIndexer::close`].
//!
//! ```text
//! enqueue_* ──lock──► HybridBatcher ──(threshold / flush / close)──► mpsc
//!                                                                   │
//!                         timer ──► worker ◄────────────────────────┘
//!                                     │
//!                                     ▼
//!                           SearchGateway::bulk_apply
//! ```
//!
//! Batches are cut under the buffer lock and sent to a single worker task
//! in the same critical section, so they reach the engine in enqueue order
//! and no operation is flushed twice or dropped.
//!
//! Delivery is at-least-once with no automatic re-enqueue: a failed batch is
//! reported (to the `flush` caller, or in [`IndexerStats`] for automatic
//! flushes) and the index stays stale for those documents until they are
//! written again.

mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::batching::{BatchConfig, FlushBatch, FlushReason, HybridBatcher};
use crate::gateway::{BulkOperation, GatewayError, SearchGateway};
use crate::person::{Person, PersonId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Bulk request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{failed} of {total} bulk operations failed: {first_error}")]
    PartialBulkFailure {
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// Person handed to the indexer was never persisted
    #[error("Cannot index a person without id")]
    MissingId,

    #[error("Bulk indexer is closed")]
    Closed,
}

/// Snapshot of indexer counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexerStats {
    /// Buffered operations not yet cut into a batch
    pub pending: usize,
    /// Batches fully accepted by the engine
    pub flushes: u64,
    /// Operations the engine accepted
    pub operations_flushed: u64,
    /// Batches that failed entirely or partially
    pub failed_flushes: u64,
    pub last_error: Option<String>,
}

pub(crate) enum Command {
    /// Automatic flush; failures only show up in stats
    Batch(FlushBatch<BulkOperation>),
    /// Explicit flush; `None` acts as a barrier behind earlier batches
    Flush {
        batch: Option<FlushBatch<BulkOperation>>,
        reply: oneshot::Sender<Result<(), IndexError>>,
    },
    /// Final flush, then the worker exits
    Shutdown {
        batch: Option<FlushBatch<BulkOperation>>,
        reply: Option<oneshot::Sender<Result<(), IndexError>>>,
    },
}

struct Buffer {
    batcher: HybridBatcher<BulkOperation>,
    closed: bool,
}

#[derive(Default)]
struct Counters {
    flushes: AtomicU64,
    operations_flushed: AtomicU64,
    failed_flushes: AtomicU64,
    last_error: Mutex<Option<String>>,
}

pub(crate) struct Shared {
    buffer: Mutex<Buffer>,
    tx: mpsc::UnboundedSender<Command>,
    counters: Counters,
}

impl Shared {
    fn send(&self, command: Command) -> Result<(), IndexError> {
        self.tx.send(command).map_err(|_| IndexError::Closed)
    }

    /// Cut a time-triggered batch if one is due. Called by the worker timer.
    fn dispatch_due(&self) {
        let mut buffer = self.buffer.lock();
        if buffer.closed {
            return;
        }
        match buffer.batcher.take_if_ready() {
            Some(batch) => {
                crate::metrics::set_pending_operations(0);
                let _ = self.send(Command::Batch(batch));
            }
            None if buffer.batcher.deadline() <= tokio::time::Instant::now() => {
                buffer.batcher.reset_timer();
            }
            None => {}
        }
    }

    fn record_success(&self, operations: usize) {
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.counters
            .operations_flushed
            .fetch_add(operations as u64, Ordering::Relaxed);
    }

    fn record_failure(&self, accepted: usize, error: &IndexError) {
        self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
        self.counters
            .operations_flushed
            .fetch_add(accepted as u64, Ordering::Relaxed);
        *self.counters.last_error.lock() = Some(error.to_string());
    }
}

/// Batched, ordered writer from the record store to the search index.
///
/// Must be created inside a Tokio runtime; it spawns its flush worker.
pub struct BulkIndexer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BulkIndexer {
    pub fn new(gateway: Arc<dyn SearchGateway>, config: BatchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer {
                batcher: HybridBatcher::new(config.clone()),
                closed: false,
            }),
            tx,
            counters: Counters::default(),
        });

        let handle = tokio::spawn(worker::run(shared.clone(), gateway, rx));
        info!(
            flush_count = config.flush_count,
            flush_ms = config.flush_ms,
            "Bulk indexer started"
        );

        Self {
            shared,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queue an index operation for a persisted person.
    pub fn enqueue_upsert(&self, person: &Person) -> Result<(), IndexError> {
        let op = BulkOperation::index(person).ok_or(IndexError::MissingId)?;
        self.enqueue_batch(std::iter::once(op))
    }

    /// Queue a delete operation.
    pub fn enqueue_delete(&self, id: PersonId) -> Result<(), IndexError> {
        self.enqueue_batch(std::iter::once(BulkOperation::delete(id)))
    }

    /// Queue operations in order. Never waits on the engine; the only error
    /// is a closed indexer, in which case nothing is queued.
    pub fn enqueue_batch(
        &self,
        operations: impl IntoIterator<Item = BulkOperation>,
    ) -> Result<(), IndexError> {
        let mut buffer = self.shared.buffer.lock();
        if buffer.closed {
            return Err(IndexError::Closed);
        }

        for op in operations {
            if buffer.batcher.push(op) == Some(FlushReason::Count) {
                if let Some(batch) = buffer.batcher.force_flush_with_reason(FlushReason::Count) {
                    debug!(operations = batch.items.len(), "Count threshold reached");
                    self.shared.send(Command::Batch(batch))?;
                }
            }
        }

        crate::metrics::set_pending_operations(buffer.batcher.len());
        Ok(())
    }

    /// Submit everything buffered and wait for the outcome.
    ///
    /// Also waits for automatic batches cut before this call, so on return
    /// every operation enqueued earlier has been submitted. Only the outcome
    /// of this call's own batch is returned. An empty buffer issues no
    /// bulk request.
    pub async fn flush(&self) -> Result<(), IndexError> {
        let (reply, outcome) = oneshot::channel();
        {
            let mut buffer = self.shared.buffer.lock();
            if buffer.closed {
                return Err(IndexError::Closed);
            }
            let batch = buffer.batcher.force_flush();
            crate::metrics::set_pending_operations(0);
            self.shared.send(Command::Flush { batch, reply })?;
        }
        outcome.await.map_err(|_| IndexError::Closed)?
    }

    /// Final flush, then stop the worker. Later calls return `Ok(())`.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) -> Result<(), IndexError> {
        let outcome = {
            let mut buffer = self.shared.buffer.lock();
            if buffer.closed {
                return Ok(());
            }
            buffer.closed = true;
            let (reply, outcome) = oneshot::channel();
            let batch = buffer.batcher.force_flush_with_reason(FlushReason::Shutdown);
            self.shared.send(Command::Shutdown {
                batch,
                reply: Some(reply),
            })?;
            outcome
        };

        let result = outcome.await.map_err(|_| IndexError::Closed)?;

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!(stats = ?self.stats(), "Bulk indexer closed");
        result
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.buffer.lock().closed
    }

    #[must_use]
    pub fn stats(&self) -> IndexerStats {
        let counters = &self.shared.counters;
        IndexerStats {
            pending: self.shared.buffer.lock().batcher.len(),
            flushes: counters.flushes.load(Ordering::Relaxed),
            operations_flushed: counters.operations_flushed.load(Ordering::Relaxed),
            failed_flushes: counters.failed_flushes.load(Ordering::Relaxed),
            last_error: counters.last_error.lock().clone(),
        }
    }
}

impl Drop for BulkIndexer {
    // Dropped without close(): hand the remainder to the worker and let it exit
    fn drop(&mut self) {
        let mut buffer = self.shared.buffer.lock();
        if !buffer.closed {
            buffer.closed = true;
            let batch = buffer.batcher.force_flush_with_reason(FlushReason::Shutdown);
            let _ = self.shared.send(Command::Shutdown { batch, reply: None });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemorySearchGateway;
    use std::time::Duration;

    fn person(id: PersonId, name: &str) -> Person {
        let mut p = Person::new(name);
        p.id = Some(id);
        p
    }

    fn setup(flush_count: usize, flush_ms: u64) -> (Arc<InMemorySearchGateway>, BulkIndexer) {
        let gateway = Arc::new(InMemorySearchGateway::new());
        let indexer = BulkIndexer::new(gateway.clone(), BatchConfig { flush_ms, flush_count });
        (gateway, indexer)
    }

    /// Let the worker drain its channel
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_flush_empty_buffer_issues_no_request() {
        let (gateway, indexer) = setup(10, 5_000);

        indexer.flush().await.unwrap();

        assert_eq!(gateway.bulk_request_count(), 0);
        assert_eq!(indexer.stats().flushes, 0);
    }

    #[tokio::test]
    async fn test_explicit_flush_submits_everything() {
        let (gateway, indexer) = setup(100, 5_000);

        indexer.enqueue_upsert(&person(1, "Joe Smith")).unwrap();
        indexer.enqueue_upsert(&person(2, "France Gall")).unwrap();
        assert_eq!(indexer.stats().pending, 2);

        indexer.flush().await.unwrap();

        assert_eq!(gateway.bulk_request_sizes(), vec![2]);
        assert_eq!(gateway.len(), 2);
        let stats = indexer.stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.operations_flushed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_threshold_cuts_exact_batch() {
        let (gateway, indexer) = setup(10_000, 5_000);

        let ops: Vec<_> = (1..=10_001).map(BulkOperation::delete).collect();
        indexer.enqueue_batch(ops).unwrap();
        assert_eq!(indexer.stats().pending, 1);

        settle().await;

        assert_eq!(gateway.bulk_request_sizes(), vec![10_000]);
        assert_eq!(indexer.stats().pending, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_before_interval() {
        let (gateway, indexer) = setup(100, 5_000);

        indexer.enqueue_delete(1).unwrap();
        indexer.enqueue_delete(2).unwrap();

        tokio::time::advance(Duration::from_millis(4_999)).await;
        settle().await;
        assert_eq!(gateway.bulk_request_count(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(gateway.bulk_request_sizes(), vec![2]);
        assert_eq!(indexer.stats().pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_counts_from_last_flush() {
        let (gateway, indexer) = setup(100, 5_000);

        tokio::time::advance(Duration::from_millis(3_000)).await;
        indexer.enqueue_delete(1).unwrap();
        indexer.flush().await.unwrap();

        indexer.enqueue_delete(2).unwrap();
        tokio::time::advance(Duration::from_millis(4_000)).await;
        settle().await;
        assert_eq!(gateway.bulk_request_count(), 1);

        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle().await;
        assert_eq!(gateway.bulk_request_sizes(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_flush_waits_for_earlier_batches_in_order() {
        let (gateway, indexer) = setup(2, 5_000);

        indexer.enqueue_upsert(&person(7, "Marie")).unwrap();
        indexer.enqueue_delete(7).unwrap();
        indexer.enqueue_upsert(&person(8, "Marco")).unwrap();
        indexer.flush().await.unwrap();

        assert_eq!(gateway.bulk_request_sizes(), vec![2, 1]);
        assert!(gateway.document("7").is_none());
        assert!(gateway.document("8").is_some());
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let (gateway, indexer) = setup(100, 5_000);
        gateway.reject_id("2");

        indexer.enqueue_upsert(&person(1, "a")).unwrap();
        indexer.enqueue_upsert(&person(2, "b")).unwrap();
        let err = indexer.flush().await.unwrap_err();

        assert!(matches!(err, IndexError::PartialBulkFailure { failed: 1, total: 2, .. }));
        let stats = indexer.stats();
        assert_eq!(stats.failed_flushes, 1);
        assert_eq!(stats.operations_flushed, 1);
        assert!(stats.last_error.unwrap().contains("rejected"));

        // Not re-enqueued
        indexer.flush().await.unwrap();
        assert_eq!(gateway.bulk_request_count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_engine_never_fails_enqueue() {
        let (gateway, indexer) = setup(2, 5_000);
        gateway.set_available(false);

        indexer.enqueue_delete(1).unwrap();
        indexer.enqueue_delete(2).unwrap();
        indexer.enqueue_delete(3).unwrap();

        // Automatic batch failed quietly; explicit flush reports its own failure
        let err = indexer.flush().await.unwrap_err();
        assert!(matches!(err, IndexError::Gateway(GatewayError::Unavailable(_))));
        let stats = indexer.stats();
        assert_eq!(stats.failed_flushes, 2);
        assert_eq!(stats.flushes, 0);
    }

    #[tokio::test]
    async fn test_close_flushes_and_rejects_later_writes() {
        let (gateway, indexer) = setup(100, 5_000);

        indexer.enqueue_upsert(&person(1, "a")).unwrap();
        indexer.close().await.unwrap();

        assert_eq!(gateway.len(), 1);
        assert!(indexer.is_closed());
        assert_eq!(indexer.enqueue_delete(1), Err(IndexError::Closed));
        assert_eq!(indexer.flush().await, Err(IndexError::Closed));
        assert_eq!(indexer.close().await, Ok(()));
    }

    #[tokio::test]
    async fn test_upsert_without_id_is_refused() {
        let (_gateway, indexer) = setup(100, 5_000);
        assert_eq!(
            indexer.enqueue_upsert(&Person::new("nobody")),
            Err(IndexError::MissingId)
        );
        assert_eq!(indexer.stats().pending, 0);
    }
}

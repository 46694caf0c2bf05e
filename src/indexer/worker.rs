// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Flush worker: the single task that talks to the engine.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Command, IndexError, Shared};
use crate::batching::FlushBatch;
use crate::gateway::{BulkOperation, SearchGateway};

pub(super) async fn run(
    shared: Arc<Shared>,
    gateway: Arc<dyn SearchGateway>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        let deadline = shared.buffer.lock().batcher.deadline();

        tokio::select! {
            biased;

            command = rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Batch(batch) => {
                        // Outcome already counted and logged
                        let _ = submit(&shared, gateway.as_ref(), batch).await;
                    }
                    Command::Flush { batch, reply } => {
                        let result = submit_opt(&shared, gateway.as_ref(), batch).await;
                        let _ = reply.send(result);
                    }
                    Command::Shutdown { batch, reply } => {
                        let result = submit_opt(&shared, gateway.as_ref(), batch).await;
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                        break;
                    }
                }
            }

            _ = sleep_until(deadline) => shared.dispatch_due(),
        }
    }
    debug!("Bulk indexer worker stopped");
}

async fn submit_opt(
    shared: &Shared,
    gateway: &dyn SearchGateway,
    batch: Option<FlushBatch<BulkOperation>>,
) -> Result<(), IndexError> {
    match batch {
        Some(batch) => submit(shared, gateway, batch).await,
        None => Ok(()),
    }
}

async fn submit(
    shared: &Shared,
    gateway: &dyn SearchGateway,
    batch: FlushBatch<BulkOperation>,
) -> Result<(), IndexError> {
    let batch_id = Uuid::new_v4();
    let total = batch.items.len();
    let reason = batch.reason.as_str();
    let start = Instant::now();
    debug!(%batch_id, total, reason, "Submitting bulk batch");

    let (accepted, result) = match gateway.bulk_apply(&batch.items).await {
        Ok(response) if response.has_errors() => {
            let failed = response.failed();
            crate::metrics::record_bulk_item_failures(failed);
            let error = IndexError::PartialBulkFailure {
                failed,
                total,
                first_error: response.first_error().unwrap_or_default().to_string(),
            };
            (total - failed, Err(error))
        }
        Ok(_) => (total, Ok(())),
        Err(e) => (0, Err(IndexError::Gateway(e))),
    };

    crate::metrics::record_flush(reason, total, start.elapsed(), result.is_ok());
    match &result {
        Ok(()) => {
            shared.record_success(accepted);
            debug!(%batch_id, total, "Bulk batch accepted");
        }
        Err(e) => {
            shared.record_failure(accepted, e);
            crate::metrics::record_error("index", "bulk", reason);
            warn!(%batch_id, total, accepted, reason, error = %e, "Bulk batch failed");
        }
    }
    result
}

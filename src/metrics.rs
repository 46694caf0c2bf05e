// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for person-search-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `person_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `component`: store, index
//! - `operation`: get, upsert, delete, save_batch, search, ...
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

fn status(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// Record a completed service operation
pub fn record_operation(component: &str, operation: &str, success: bool) {
    counter!(
        "person_sync_operations_total",
        "component" => component.to_string(),
        "operation" => operation.to_string(),
        "status" => status(success)
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(component: &str, operation: &str, duration: Duration) {
    histogram!(
        "person_sync_operation_seconds",
        "component" => component.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an error with category for alerting
pub fn record_error(component: &str, operation: &str, error_type: &str) {
    counter!(
        "person_sync_errors_total",
        "component" => component.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// BULK INDEXER
// ═══════════════════════════════════════════════════════════════════════════

/// Set operations buffered and not yet handed to the flush worker
pub fn set_pending_operations(count: usize) {
    gauge!("person_sync_bulk_pending_operations").set(count as f64);
}

/// Record a bulk flush attempt
pub fn record_flush(reason: &str, operations: usize, duration: Duration, success: bool) {
    counter!(
        "person_sync_bulk_flushes_total",
        "reason" => reason.to_string(),
        "status" => status(success)
    )
    .increment(1);
    histogram!("person_sync_bulk_flush_seconds").record(duration.as_secs_f64());
    histogram!("person_sync_bulk_batch_size").record(operations as f64);
}

/// Record operations the engine refused inside an otherwise accepted bulk request
pub fn record_bulk_item_failures(count: usize) {
    counter!("person_sync_bulk_item_failures_total").increment(count as u64);
}

// ═══════════════════════════════════════════════════════════════════════════
// POPULATION
// ═══════════════════════════════════════════════════════════════════════════

pub fn set_population_processed(count: u64) {
    gauge!("person_sync_population_processed").set(count as f64);
}

/// Record a finished population run
pub fn record_population(total: u64, duration: Duration) {
    counter!("person_sync_population_runs_total").increment(1);
    counter!("person_sync_population_persons_total").increment(total);
    histogram!("person_sync_population_seconds").record(duration.as_secs_f64());
}

// ═══════════════════════════════════════════════════════════════════════════
// SEARCH
// ═══════════════════════════════════════════════════════════════════════════

/// Record a search query execution
pub fn record_search_query(kind: &str, success: bool) {
    counter!(
        "person_sync_search_queries_total",
        "kind" => kind.to_string(),
        "status" => status(success)
    )
    .increment(1);
}

/// Record search total hit count
pub fn record_search_results(total: u64) {
    histogram!("person_sync_search_results").record(total as f64);
}

/// Record index creation
pub fn record_index_created(created: bool) {
    counter!(
        "person_sync_index_bootstrap_total",
        "created" => if created { "true" } else { "false" }
    )
    .increment(1);
}

/// Set service state (counts transitions)
pub fn set_service_state(state: &str) {
    counter!(
        "person_sync_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    component: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.component, self.operation, self.start.elapsed());
    }
}

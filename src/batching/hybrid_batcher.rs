// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hybrid batching for bulk index writes.
//!
//! The [`HybridBatcher`] collects items and hands them out in batches when
//! either threshold is reached: item count, or time since the last flush.
//!
//! Time is read from [`tokio::time::Instant`], so a paused test runtime
//! drives the time threshold deterministically.
//!
//! # Example
//!
//! ```
//! use person_search_sync::batching::{BatchConfig, FlushReason, HybridBatcher};
//!
//! let config = BatchConfig { flush_ms: 5_000, flush_count: 2 };
//! let mut batcher: HybridBatcher<&str> = HybridBatcher::new(config);
//!
//! assert!(batcher.push("a").is_none());
//! assert_eq!(batcher.push("b"), Some(FlushReason::Count));
//!
//! let batch = batcher.take_if_ready().unwrap();
//! assert_eq!(batch.items, vec!["a", "b"]);
//! assert!(batcher.is_empty());
//! ```

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Batch flush trigger reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Time threshold reached
    Time,
    /// Item count threshold reached
    Count,
    /// Manual flush requested
    Manual,
    /// Shutdown flush
    Shutdown,
}

impl FlushReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Time => "time",
            FlushReason::Count => "count",
            FlushReason::Manual => "manual",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

/// Configuration for hybrid batching
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Flush after this many milliseconds since the last flush
    pub flush_ms: u64,
    /// Flush after this many items
    pub flush_count: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_ms: 5_000,
            flush_count: 10_000,
        }
    }
}

/// A batch of items ready for flush
#[derive(Debug)]
pub struct FlushBatch<T> {
    pub items: Vec<T>,
    pub reason: FlushReason,
}

/// A batch of items pending flush
#[derive(Debug)]
pub struct Batch<T> {
    pub items: Vec<T>,
    /// Last flush (or creation); the time threshold counts from here
    pub started_at: Instant,
}

impl<T> Batch<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn take(&mut self) -> Vec<T> {
        self.started_at = Instant::now();
        std::mem::take(&mut self.items)
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hybrid batcher that flushes based on time or count thresholds.
/// Whichever threshold is hit first triggers the flush.
pub struct HybridBatcher<T> {
    config: BatchConfig,
    batch: Batch<T>,
}

impl<T> HybridBatcher<T> {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            batch: Batch::new(),
        }
    }

    /// Never zero, so the worker's timer cannot fire in a tight loop
    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.flush_ms.max(1))
    }

    /// Add an item to the batch, returns flush reason if threshold hit
    pub fn push(&mut self, item: T) -> Option<FlushReason> {
        self.batch.push(item);
        (self.batch.len() >= self.config.flush_count).then_some(FlushReason::Count)
    }

    /// Check if time threshold exceeded
    #[must_use]
    pub fn should_flush_time(&self) -> bool {
        !self.batch.is_empty() && self.batch.age() >= self.interval()
    }

    /// When the time threshold falls due
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.batch.started_at + self.interval()
    }

    /// Restart the time threshold without flushing. Used when the timer
    /// fires on an empty batch.
    pub fn reset_timer(&mut self) {
        self.batch.started_at = Instant::now();
    }

    /// Take the batch if any threshold is ready
    pub fn take_if_ready(&mut self) -> Option<FlushBatch<T>> {
        let reason = if self.batch.len() >= self.config.flush_count {
            Some(FlushReason::Count)
        } else if self.should_flush_time() {
            Some(FlushReason::Time)
        } else {
            None
        };

        reason.map(|r| {
            let items = self.batch.take();
            debug!(count = items.len(), reason = r.as_str(), "Batch taken for flush");
            FlushBatch { items, reason: r }
        })
    }

    /// Force flush regardless of thresholds (for manual flush or shutdown)
    pub fn force_flush(&mut self) -> Option<FlushBatch<T>> {
        self.force_flush_with_reason(FlushReason::Manual)
    }

    /// Force flush with a specific reason. Resets the timer even when empty.
    pub fn force_flush_with_reason(&mut self, reason: FlushReason) -> Option<FlushBatch<T>> {
        if self.batch.is_empty() {
            self.reset_timer();
            return None;
        }
        Some(FlushBatch {
            items: self.batch.take(),
            reason,
        })
    }

    /// Check if batch is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Get current batch stats: item count and age
    #[must_use]
    pub fn stats(&self) -> (usize, Duration) {
        (self.batch.len(), self.batch.age())
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Count/time threshold buffering.

pub mod hybrid_batcher;

pub use hybrid_batcher::{Batch, BatchConfig, FlushBatch, FlushReason, HybridBatcher};

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search engine client seam.
//!
//! [`SearchGateway`] is the only way the rest of the crate talks to the
//! search engine. Implementations:
//!
//! - [`InMemorySearchGateway`]: evaluates queries in process
//! - [`RetryingGateway`]: wraps another gateway and retries transient failures

pub mod traits;
pub mod memory;
pub mod retrying;

pub use traits::{
    BulkItemOutcome, BulkOperation, BulkResponse, GatewayError, SearchGateway, SearchHit,
    SearchResponse,
};
pub use memory::InMemorySearchGateway;
pub use retrying::RetryingGateway;

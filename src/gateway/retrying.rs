// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry decorator for a [`SearchGateway`].
//!
//! Only [`GatewayError::Unavailable`] is retried. A rejected request fails
//! on the first attempt, as do per-item bulk failures (they come back inside
//! an `Ok` response).

use async_trait::async_trait;

use super::traits::{BulkOperation, BulkResponse, GatewayError, SearchGateway, SearchResponse};
use crate::resilience::{retry_when, RetryConfig};
use crate::search::SearchRequest;

pub struct RetryingGateway<G> {
    inner: G,
    query_retry: RetryConfig,
    bulk_retry: RetryConfig,
}

impl<G: SearchGateway> RetryingGateway<G> {
    /// Wrap `inner` with the query and bulk presets
    pub fn new(inner: G) -> Self {
        Self::with_config(inner, RetryConfig::query(), RetryConfig::bulk())
    }

    pub fn with_config(inner: G, query_retry: RetryConfig, bulk_retry: RetryConfig) -> Self {
        Self {
            inner,
            query_retry,
            bulk_retry,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

fn transient(err: &GatewayError) -> bool {
    err.is_transient()
}

#[async_trait]
impl<G: SearchGateway> SearchGateway for RetryingGateway<G> {
    async fn ensure_index(&self) -> Result<bool, GatewayError> {
        retry_when("ensure_index", &self.query_retry, transient, || self.inner.ensure_index()).await
    }

    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, GatewayError> {
        retry_when("search", &self.query_retry, transient, || self.inner.execute(request)).await
    }

    async fn bulk_apply(&self, operations: &[BulkOperation]) -> Result<BulkResponse, GatewayError> {
        retry_when("bulk", &self.bulk_retry, transient, || self.inner.bulk_apply(operations)).await
    }

    async fn delete_all(&self) -> Result<(), GatewayError> {
        retry_when("delete_all", &self.query_retry, transient, || self.inner.delete_all()).await
    }

    async fn count_all(&self) -> Result<u64, GatewayError> {
        retry_when("count_all", &self.query_retry, transient, || self.inner.count_all()).await
    }
}

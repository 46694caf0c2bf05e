//! Search API for SyncService
//!
//! ```text
//! search(text, country, year)          advanced_search(name, country, city)
//!       │                                       │
//!       └──► person_queries → Query ◄───────────┘
//!                   │
//!                   ▼
//!     SearchRequest::faceted (aggregations + exact total)
//!                   │
//!                   ▼
//!          SearchGateway::execute
//! ```
//!
//! Results come from the index and may lag recent writes.

use std::time::Instant;
use tracing::{debug, warn};

use crate::gateway::SearchResponse;
use crate::metrics;
use crate::search::{build_advanced_query, build_simple_query, Query, SearchRequest};

use super::{SyncError, SyncService};

impl SyncService {
    /// Free-text search with optional country and decade facets.
    ///
    /// Blank `text` matches everything. `year` must be a 4-digit year and
    /// selects `[year, year + 10)`; anything else is `InvalidFilter`.
    pub async fn search(
        &self,
        text: &str,
        country: Option<&str>,
        year: Option<&str>,
        from: usize,
        size: usize,
    ) -> Result<SearchResponse, SyncError> {
        let query = build_simple_query(text, country, year)?;
        self.execute("simple", SearchRequest::faceted(query, from, size)).await
    }

    /// Per-field fuzzy search; blank fields add no constraint.
    pub async fn advanced_search(
        &self,
        name: Option<&str>,
        country: Option<&str>,
        city: Option<&str>,
        from: usize,
        size: usize,
    ) -> Result<SearchResponse, SyncError> {
        let query = build_advanced_query(name, country, city);
        self.execute("advanced", SearchRequest::faceted(query, from, size)).await
    }

    /// Every indexed document, up to `search_all_limit`.
    pub async fn search_all(&self) -> Result<SearchResponse, SyncError> {
        let request = SearchRequest::new(Query::match_all(), 0, self.config.search_all_limit);
        self.execute("all", request).await
    }

    async fn execute(&self, kind: &str, request: SearchRequest) -> Result<SearchResponse, SyncError> {
        let start = Instant::now();
        match self.gateway.execute(&request).await {
            Ok(response) => {
                metrics::record_search_query(kind, true);
                metrics::record_search_results(response.total);
                metrics::record_latency("index", "search", start.elapsed());
                debug!(
                    kind,
                    total = response.total,
                    returned = response.hits.len(),
                    "Search executed"
                );
                Ok(response)
            }
            Err(e) => {
                metrics::record_search_query(kind, false);
                warn!(kind, error = %e, "Search failed");
                Err(e.into())
            }
        }
    }
}

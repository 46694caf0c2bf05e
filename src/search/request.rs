// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use super::aggregations::{person_aggregations, Aggregation};
use super::query_builder::Query;

/// A complete search request: query, paging and aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Query,
    pub from: usize,
    pub size: usize,
    pub aggregations: Vec<Aggregation>,
    /// Count every hit instead of stopping at the engine's default cap
    pub track_total_hits: bool,
}

impl SearchRequest {
    /// Plain request without aggregations
    pub fn new(query: Query, from: usize, size: usize) -> Self {
        Self {
            query,
            from,
            size,
            aggregations: Vec::new(),
            track_total_hits: false,
        }
    }

    /// Request with the faceted person aggregations and exact hit counting
    pub fn faceted(query: Query, from: usize, size: usize) -> Self {
        Self {
            aggregations: person_aggregations(),
            track_total_hits: true,
            ..Self::new(query, from, size)
        }
    }
}

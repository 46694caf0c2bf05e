// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::person::{Person, PersonId};
use crate::search::{Aggregations, SearchRequest};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Engine unreachable or timed out; worth retrying
    #[error("Search engine unavailable: {0}")]
    Unavailable(String),
    /// Engine answered but refused the request
    #[error("Search engine rejected request: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Whether a retry could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// A pending index-or-delete action against the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BulkOperation {
    Index { id: String, document: Person },
    Delete { id: String },
}

impl BulkOperation {
    /// Index operation for a persisted person. `None` if the person has no id.
    pub fn index(person: &Person) -> Option<Self> {
        person.id_as_string().map(|id| BulkOperation::Index {
            id,
            document: person.clone(),
        })
    }

    pub fn delete(id: PersonId) -> Self {
        BulkOperation::Delete { id: id.to_string() }
    }

    /// Target document id
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. } | BulkOperation::Delete { id } => id,
        }
    }

    /// `"index"` or `"delete"`
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            BulkOperation::Index { .. } => "index",
            BulkOperation::Delete { .. } => "delete",
        }
    }
}

/// Outcome of one operation inside a bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
    pub id: String,
    pub action: &'static str,
    pub error: Option<String>,
}

/// Per-item outcomes of a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub items: Vec<BulkItemOutcome>,
}

impl BulkResponse {
    /// Every item succeeded
    pub fn all_ok(operations: &[BulkOperation]) -> Self {
        Self {
            items: operations
                .iter()
                .map(|op| BulkItemOutcome {
                    id: op.id().to_string(),
                    action: op.action(),
                    error: None,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.error.is_some())
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.error.is_some()).count()
    }

    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.items.iter().find_map(|item| item.error.as_deref())
    }
}

/// One matched document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub source: Person,
}

/// Hits in relevance order plus aggregation buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching documents (not just this page)
    pub total: u64,
    pub hits: Vec<SearchHit>,
    pub aggregations: Aggregations,
}

/// Opaque client for the search engine.
///
/// Transport, security and index schema are the implementation's concern;
/// the sync core only depends on these calls.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Create the index if it does not exist. Returns `true` if it was created.
    async fn ensure_index(&self) -> Result<bool, GatewayError>;

    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, GatewayError>;

    /// Apply operations in order. An `Err` means nothing is known to have
    /// been applied; per-item failures come back inside the response.
    async fn bulk_apply(&self, operations: &[BulkOperation]) -> Result<BulkResponse, GatewayError>;

    async fn delete_all(&self) -> Result<(), GatewayError>;

    async fn count_all(&self) -> Result<u64, GatewayError>;
}

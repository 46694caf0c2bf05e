//! Public types for the sync service.

use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::indexer::IndexError;
use crate::person::PersonId;
use crate::search::QueryError;
use crate::storage::StorageError;

/// Service lifecycle state.
///
/// Use [`super::SyncService::state()`] to check the current state or
/// [`super::SyncService::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Just created, index not yet bootstrapped
    Created,
    /// Ensuring the search index exists
    Starting,
    /// Running normally
    Running,
    /// Final flush in progress
    ShuttingDown,
    /// Indexer closed; writes are refused
    Stopped,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Starting => write!(f, "Starting"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Person {0} not found")]
    NotFound(PersonId),

    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Some operations of a bulk request were refused. Not retried.
    #[error("{failed} of {total} index operations failed")]
    PartialBulkFailure { failed: usize, total: usize },

    #[error(transparent)]
    Storage(StorageError),

    #[error("A population run is already in progress")]
    PopulationInProgress,

    #[error("Sync service is closed")]
    Closed,
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Storage(other),
        }
    }
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        SyncError::IndexUnavailable(err.to_string())
    }
}

impl From<QueryError> for SyncError {
    fn from(err: QueryError) -> Self {
        SyncError::InvalidFilter(err.to_string())
    }
}

impl From<IndexError> for SyncError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Gateway(e) => e.into(),
            IndexError::PartialBulkFailure { failed, total, .. } => {
                SyncError::PartialBulkFailure { failed, total }
            }
            // The store hands back persisted persons; a missing id is its fault
            IndexError::MissingId => SyncError::Storage(StorageError::Backend(
                "record store returned a person without id".into(),
            )),
            IndexError::Closed => SyncError::Closed,
        }
    }
}

/// Outcome (or live progress) of a population run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationResult {
    /// Milliseconds since the run started
    pub took_ms: u64,
    /// Persons per second
    pub rate: f64,
    /// Persons processed
    pub total: u64,
}

impl PopulationResult {
    /// `took_ms` is clamped to at least 1 ms for the rate.
    pub fn new(total: u64, took_ms: u64) -> Self {
        let rate = total as f64 * 1000.0 / took_ms.max(1) as f64;
        Self { took_ms, rate, total }
    }
}

/// Timings of a full scan of the store against a full scan of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryTimings {
    pub store_ms: u64,
    pub store_count: usize,
    pub index_ms: u64,
    pub index_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_display() {
        assert_eq!(format!("{}", ServiceState::Created), "Created");
        assert_eq!(format!("{}", ServiceState::Running), "Running");
        assert_eq!(format!("{}", ServiceState::Stopped), "Stopped");
    }

    #[test]
    fn test_population_rate() {
        let result = PopulationResult::new(1000, 500);
        assert_eq!(result.rate, 2000.0);

        // Zero elapsed time does not divide by zero
        let instant = PopulationResult::new(10, 0);
        assert_eq!(instant.took_ms, 0);
        assert_eq!(instant.rate, 10_000.0);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(SyncError::from(StorageError::NotFound(3)), SyncError::NotFound(3));
        assert_eq!(
            SyncError::from(IndexError::PartialBulkFailure {
                failed: 1,
                total: 5,
                first_error: "mapper_parsing_exception".into()
            }),
            SyncError::PartialBulkFailure { failed: 1, total: 5 }
        );
        assert!(matches!(
            SyncError::from(IndexError::Gateway(GatewayError::Unavailable("down".into()))),
            SyncError::IndexUnavailable(_)
        ));
        assert_eq!(SyncError::from(IndexError::Closed), SyncError::Closed);
    }
}

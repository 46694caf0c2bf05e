// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;

use crate::person::{Person, PersonId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Person {0} not found")]
    NotFound(PersonId),
    #[error("Record store backend error: {0}")]
    Backend(String),
}

/// Canonical keyed persistence for persons (ground truth).
///
/// The search index is always a projection of what this store holds; on any
/// divergence the store wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_id(&self, id: PersonId) -> Result<Option<Person>, StorageError>;

    /// Persist a collection in one call. Persons without an id get one
    /// assigned; the returned persons carry their persisted ids, in input order.
    async fn save_all(&self, persons: Vec<Person>) -> Result<Vec<Person>, StorageError>;

    /// Deleting a missing id is not an error.
    async fn delete_by_id(&self, id: PersonId) -> Result<(), StorageError>;

    async fn delete_all(&self) -> Result<(), StorageError>;

    async fn find_all(&self) -> Result<Vec<Person>, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    /// Single-entity save. Default implementation goes through [`save_all`](Self::save_all).
    async fn save(&self, person: Person) -> Result<Person, StorageError> {
        self.save_all(vec![person])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Backend("save returned no entity".into()))
    }
}

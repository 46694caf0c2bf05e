use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::person::{Person, PersonId};
use super::traits::{RecordStore, StorageError};

/// In-memory record store with sequence-based id assignment.
pub struct InMemoryRecordStore {
    data: DashMap<PersonId, Person>,
    next_id: AtomicI64,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Get current record count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn assign_id(&self, person: &mut Person) -> Result<PersonId, StorageError> {
        match person.id {
            Some(id) => {
                // Keep the sequence ahead of explicitly chosen ids.
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                Ok(id)
            }
            None => {
                let id = self
                    .next_id
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
                    .map_err(|_| StorageError::Backend("id sequence exhausted".into()))?;
                person.id = Some(id);
                Ok(id)
            }
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_by_id(&self, id: PersonId) -> Result<Option<Person>, StorageError> {
        Ok(self.data.get(&id).map(|r| r.value().clone()))
    }

    async fn save_all(&self, persons: Vec<Person>) -> Result<Vec<Person>, StorageError> {
        // Ids first, so a failed assignment stores nothing from the batch
        let mut saved = persons;
        for person in saved.iter_mut() {
            self.assign_id(person)?;
        }
        for person in &saved {
            if let Some(id) = person.id {
                self.data.insert(id, person.clone());
            }
        }
        Ok(saved)
    }

    async fn delete_by_id(&self, id: PersonId) -> Result<(), StorageError> {
        self.data.remove(&id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.data.clear();
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Person>, StorageError> {
        let mut all: Vec<Person> = self.data.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryRecordStore::new();
        assert!(store.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let store = InMemoryRecordStore::new();

        let saved = store
            .save_all(vec![Person::new("a"), Person::new("b")])
            .await
            .unwrap();

        assert_eq!(saved[0].id, Some(1));
        assert_eq!(saved[1].id, Some(2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_id_is_kept_and_sequence_skips_it() {
        let store = InMemoryRecordStore::new();
        let mut explicit = Person::new("explicit");
        explicit.id = Some(10);

        store.save(explicit).await.unwrap();
        let next = store.save(Person::new("next")).await.unwrap();

        assert!(store.find_by_id(10).await.unwrap().is_some());
        assert_eq!(next.id, Some(11));
    }

    #[tokio::test]
    async fn test_largest_explicit_id_exhausts_sequence() {
        let store = InMemoryRecordStore::new();
        let mut max = Person::new("max");
        max.id = Some(PersonId::MAX);

        store.save(max).await.unwrap();
        assert!(store.find_by_id(PersonId::MAX).await.unwrap().is_some());

        let err = store
            .save_all(vec![Person::new("a"), Person::new("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert_eq!(store.len(), 1);

        // Explicit ids still work
        let mut explicit = Person::new("explicit");
        explicit.id = Some(5);
        store.save(explicit).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let store = InMemoryRecordStore::new();
        assert!(store.find_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryRecordStore::new();
        let mut first = store.save(Person::new("v1")).await.unwrap();
        first.name = Some("v2".into());
        store.save(first.clone()).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.find_by_id(first.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_delete_and_delete_missing() {
        let store = InMemoryRecordStore::new();
        let saved = store.save(Person::new("gone")).await.unwrap();

        store.delete_by_id(saved.id.unwrap()).await.unwrap();
        assert!(store.is_empty());

        assert!(store.delete_by_id(12345).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_all_ordered_and_delete_all() {
        let store = InMemoryRecordStore::new();
        for i in 0..10 {
            store.save(Person::new(format!("p{}", i))).await.unwrap();
        }

        let all = store.find_all().await.unwrap();
        let ids: Vec<_> = all.iter().filter_map(|p| p.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        store.delete_all().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_saves_get_unique_ids() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryRecordStore::new());
        let mut handles = vec![];

        for batch in 0..10 {
            let store_clone = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    store_clone
                        .save(Person::new(format!("batch-{}-{}", batch, i)))
                        .await
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 100);
    }
}

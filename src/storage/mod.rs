//! Record store: the canonical copy of every person.

pub mod traits;
pub mod memory;

pub use memory::InMemoryRecordStore;
pub use traits::{RecordStore, StorageError};

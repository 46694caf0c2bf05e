//! # Person Search Sync
//!
//! Keeps a record store of persons and a search index in step, and serves
//! faceted search over the indexed copy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SyncService                          │
//! │  • get / upsert / delete / save_batch                      │
//! │  • populate (batched, progress counter)                    │
//! │  • search / advanced_search / search_all                   │
//! └─────────────────────────────────────────────────────────────┘
//!          │ write first                      │ then project
//!          ▼                                  ▼
//! ┌──────────────────────┐      ┌──────────────────────────────┐
//! │     RecordStore      │      │         BulkIndexer          │
//! │  • ground truth      │      │  • count / time thresholds   │
//! │  • id assignment     │      │  • single ordered worker     │
//! └──────────────────────┘      └──────────────────────────────┘
//!                                             │ bulk
//!                                             ▼
//!                               ┌──────────────────────────────┐
//!                               │        SearchGateway         │
//!                               │  • bulk / search / count     │
//!                               │  • retry decorator           │
//!                               └──────────────────────────────┘
//! ```
//!
//! The index is eventually consistent with the store: writes become
//! searchable once the bulk indexer flushes.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use person_search_sync::{
//!     InMemoryRecordStore, InMemorySearchGateway, RetryingGateway, SyncConfig, SyncService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = RetryingGateway::new(InMemorySearchGateway::new());
//!     let service = SyncService::new(
//!         SyncConfig::default(),
//!         Arc::new(InMemoryRecordStore::new()),
//!         Arc::new(gateway),
//!     );
//!     service.start().await.expect("index bootstrap failed");
//!
//!     let result = service.populate(1_000).await.expect("population failed");
//!     assert_eq!(result.total, 1_000);
//!     service.flush().await.expect("flush failed");
//!
//!     let page = service.search("", Some("France"), None, 0, 10).await.unwrap();
//!     assert!(page.total >= 1); // the "Joe Smith" seed lives in France
//!
//!     service.shutdown().await.unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: The [`SyncService`] orchestrator
//! - [`indexer`]: Batched, ordered writes to the index
//! - [`search`]: Query AST, person queries, aggregations, Elasticsearch DSL
//! - [`gateway`]: Search engine client seam
//! - [`storage`]: Record store seam
//! - [`batching`]: Count/time threshold buffer
//! - [`resilience`]: Retry logic

pub mod config;
pub mod person;
pub mod generator;
pub mod storage;
pub mod batching;
pub mod resilience;
pub mod search;
pub mod gateway;
pub mod indexer;
pub mod coordinator;
pub mod metrics;

pub use config::SyncConfig;
pub use coordinator::{PopulationResult, QueryTimings, ServiceState, SyncError, SyncService};
pub use person::{Address, GeoPoint, Person, PersonId};
pub use generator::PersonGenerator;
pub use storage::{InMemoryRecordStore, RecordStore, StorageError};
pub use gateway::{
    BulkOperation, BulkResponse, GatewayError, InMemorySearchGateway, RetryingGateway,
    SearchGateway, SearchHit, SearchResponse,
};
pub use indexer::{BulkIndexer, IndexError, IndexerStats};
pub use batching::{BatchConfig, FlushReason, HybridBatcher};
pub use resilience::RetryConfig;
pub use metrics::LatencyTimer;

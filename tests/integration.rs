//! Integration Tests for Person Search Sync
//!
//! End-to-end flows through the public API with the in-memory record store
//! and search gateway.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//! - `happy_*` - Normal operation: lifecycle, dual writes, population, search
//! - `batching_*` - Bulk indexer thresholds observed through the service

use std::sync::Arc;
use std::time::Duration;

use person_search_sync::search::{Bucket, ElasticsearchTranslator, SearchRequest};
use person_search_sync::{
    Address, InMemoryRecordStore, InMemorySearchGateway, Person, RecordStore, SearchGateway,
    ServiceState, SyncConfig, SyncError, SyncService,
};

struct Harness {
    store: Arc<InMemoryRecordStore>,
    gateway: Arc<InMemorySearchGateway>,
    service: Arc<SyncService>,
}

fn harness(config: SyncConfig) -> Harness {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(InMemorySearchGateway::new());
    let service = Arc::new(SyncService::new(config, store.clone(), gateway.clone()));
    Harness { store, gateway, service }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[tokio::test]
async fn happy_service_lifecycle() {
    init_tracing();
    let h = harness(SyncConfig::default());
    assert_eq!(h.service.state(), ServiceState::Created);

    h.service.start().await.unwrap();
    assert_eq!(h.service.state(), ServiceState::Running);

    h.service.upsert(1, Person::new("Joe Smith")).await.unwrap();
    h.service.shutdown().await.unwrap();

    // Shutdown flushed the pending write
    assert_eq!(h.gateway.len(), 1);
    assert_eq!(h.service.state(), ServiceState::Stopped);
    assert_eq!(
        h.service.upsert(2, Person::new("late")).await.map(|_| ()),
        Err(SyncError::Closed)
    );
}

#[tokio::test]
async fn happy_upsert_then_get_and_search() {
    let h = harness(SyncConfig::default());
    h.service.start().await.unwrap();

    let person = Person::new("France Gall")
        .with_gender("female")
        .with_address(Address {
            country: Some("Italy".into()),
            city: Some("Ischia".into()),
            countrycode: Some("IT".into()),
            ..Default::default()
        });
    h.service.upsert(42, person).await.unwrap();
    assert_eq!(h.service.get(42).await.unwrap().id, Some(42));

    // Not searchable until flushed
    let before = h.service.search("gall", None, None, 0, 10).await.unwrap();
    assert_eq!(before.total, 0);

    h.service.flush().await.unwrap();
    let after = h.service.search("gall", None, None, 0, 10).await.unwrap();
    assert_eq!(after.total, 1);
    assert_eq!(after.hits[0].id, "42");
    assert_eq!(after.hits[0].source.gender.as_deref(), Some("female"));
}

#[tokio::test]
async fn happy_partial_update_reaches_index() {
    let h = harness(SyncConfig::default());
    h.service
        .upsert(
            7,
            Person::new("Marie Dubois").with_address(Address {
                country: Some("France".into()),
                city: Some("Paris".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

    let patch = Person {
        address: Some(Address {
            city: Some("Lyon".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    h.service.upsert(7, patch).await.unwrap();
    h.service.flush().await.unwrap();

    let indexed = h.gateway.document("7").unwrap();
    assert_eq!(indexed.name.as_deref(), Some("Marie Dubois"));
    let address = indexed.address.unwrap();
    assert_eq!(address.city.as_deref(), Some("Lyon"));
    assert_eq!(address.country.as_deref(), Some("France"));
}

#[tokio::test]
async fn happy_population_with_background_polling() {
    let h = harness(SyncConfig {
        batch_size: 50,
        ..Default::default()
    });

    let handle = h.service.spawn_populate(500);
    let result = handle.await.unwrap().unwrap();

    assert_eq!(result.total, 500);
    assert_eq!(h.service.poll_progress().total, 500);
    assert_eq!(h.store.count().await.unwrap(), 500);

    h.service.flush().await.unwrap();
    assert_eq!(h.gateway.count_all().await.unwrap(), 500);

    // Seeds are searchable by name
    let joe = h.service.search("joe smith", None, None, 0, 5).await.unwrap();
    assert!(joe.hits.iter().any(|hit| hit.source.name.as_deref() == Some("Joe Smith")));
}

#[tokio::test]
async fn happy_faceted_aggregations_after_population() {
    let h = harness(SyncConfig::default());
    h.service.populate(300).await.unwrap();
    h.service.flush().await.unwrap();

    let response = h.service.search("", None, None, 0, 10).await.unwrap();
    assert_eq!(response.total, 300);
    assert_eq!(response.hits.len(), 10);

    let by_country = response.aggregations["by_country"].buckets();
    assert!(!by_country.is_empty() && by_country.len() <= 10);
    let counts: Vec<u64> = by_country.iter().map(|b| b.doc_count).collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));

    let by_year = response.aggregations["by_year"].buckets();
    assert_eq!(by_year.len(), 70);
    assert_eq!(by_year.iter().map(|b| b.doc_count).sum::<u64>(), 300);
    assert!(Bucket::find(by_year, "1940").is_some());
    assert!(Bucket::find(by_year, "2009").is_some());
}

#[tokio::test]
async fn happy_clear_all_then_repopulate() {
    let h = harness(SyncConfig::default());
    h.service.populate(20).await.unwrap();
    h.service.flush().await.unwrap();

    h.service.clear_all().await.unwrap();
    assert!(h.store.is_empty());
    assert!(h.gateway.is_empty());

    h.service.populate(10).await.unwrap();
    let timings = h.service.measure_query_performance().await.unwrap();
    assert_eq!(timings.store_count, 10);
    // Not flushed yet
    assert_eq!(timings.index_count, 0);
}

#[tokio::test]
async fn happy_request_renders_to_elasticsearch_dsl() {
    let request = SearchRequest::faceted(
        person_search_sync::search::build_simple_query("joe", Some("France"), Some("1975")).unwrap(),
        0,
        10,
    );
    let body = ElasticsearchTranslator::search_body(&request);

    assert_eq!(body["track_total_hits"], true);
    assert!(body["query"]["bool"]["must"].is_array());
    assert!(body["aggs"]["by_country"]["aggs"]["by_year"].is_object());
}

// =============================================================================
// Batching Through The Service
// =============================================================================

#[tokio::test(start_paused = true)]
async fn batching_count_threshold_flushes_without_explicit_flush() {
    let h = harness(SyncConfig {
        batch_size: 10,
        bulk_max_operations: 25,
        ..Default::default()
    });

    h.service.populate(60).await.unwrap();
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.gateway.bulk_request_sizes(), vec![25, 25]);
    assert_eq!(h.service.indexer_stats().pending, 10);
}

#[tokio::test(start_paused = true)]
async fn batching_interval_flushes_idle_writes() {
    let h = harness(SyncConfig {
        bulk_flush_ms: 1_000,
        ..Default::default()
    });

    h.service.upsert(1, Person::new("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_100)).await;

    assert_eq!(h.gateway.bulk_request_sizes(), vec![1]);
    assert_eq!(h.service.indexer_stats().flushes, 1);
}

#[tokio::test]
async fn batching_flush_after_batch_makes_writes_searchable() {
    let h = harness(SyncConfig {
        flush_after_batch: true,
        ..Default::default()
    });

    h.service.save_batch(vec![Person::new("Anna"), Person::new("Bruno")]).await.unwrap();
    assert_eq!(h.gateway.len(), 2);
    assert_eq!(h.service.indexer_stats().pending, 0);
}

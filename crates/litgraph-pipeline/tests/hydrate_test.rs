//! Stub hydration and cache-first fetch.

mod common;

use common::{full_work, minimal_work, Harness};
use litgraph_core::{Error, WorkStore};
use litgraph_pipeline::PipelineConfig;
use litgraph_providers::mock::{MockCitationProvider, MockPrimaryProvider};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_hydrate_empty_input_makes_no_calls() {
    let h = Harness::new();
    assert_eq!(h.pipeline.hydrator.hydrate_stubs(&[]).await.unwrap(), 0);
    assert_eq!(h.primary.total_calls(), 0);
}

#[tokio::test]
async fn test_hydrate_full_or_unknown_ids_makes_no_calls() {
    let h = Harness::new();
    h.pipeline
        .ingestor
        .ingest_work(&minimal_work("W1", "full"))
        .await
        .unwrap();

    let hydrated = h
        .pipeline
        .hydrator
        .hydrate_stubs(&ids(&["W1", "W404"]))
        .await
        .unwrap();
    assert_eq!(hydrated, 0);
    assert_eq!(h.primary.total_calls(), 0);
}

#[tokio::test]
async fn test_hydrate_upgrades_stubs() {
    let primary = MockPrimaryProvider::new()
        .with_work(full_work("W2", &[]))
        .with_work(minimal_work("W3", "Third"));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2", "W3", "W4"]))
        .await
        .unwrap();

    let hydrated = h
        .pipeline
        .hydrator
        .hydrate_stubs(&ids(&["W2", "https://openalex.org/W3", "W3", "W4", "W1"]))
        .await
        .unwrap();

    // W4 is unknown to the provider and stays a stub
    assert_eq!(hydrated, 2);
    assert_eq!(h.primary.call_count("batch_get_works"), 1);
    assert!(!h.store.work("W2").unwrap().is_stub);
    assert_eq!(h.store.work("W3").unwrap().title, "Third");
    assert!(h.store.work("W4").unwrap().is_stub);
}

#[tokio::test]
async fn test_hydrate_splits_into_provider_batches() {
    let refs: Vec<String> = (0..250).map(|i| format!("W{}", 1000 + i)).collect();
    let ref_strs: Vec<&str> = refs.iter().map(String::as_str).collect();
    let primary = refs
        .iter()
        .fold(MockPrimaryProvider::new(), |p, id| p.with_work(minimal_work(id, id)));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &ref_strs))
        .await
        .unwrap();

    let hydrated = h.pipeline.hydrator.hydrate_stubs(&refs).await.unwrap();
    assert_eq!(hydrated, 250);
    assert_eq!(h.primary.call_count("batch_get_works"), 3);
    assert!(h.store.filter_stub_ids(&refs).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_batch_is_skipped() {
    let refs: Vec<String> = (0..150).map(|i| format!("W{}", 2000 + i)).collect();
    let ref_strs: Vec<&str> = refs.iter().map(String::as_str).collect();
    let primary = refs
        .iter()
        .fold(MockPrimaryProvider::new(), |p, id| p.with_work(minimal_work(id, id)))
        .fail_batches_containing("W2000");
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &ref_strs))
        .await
        .unwrap();

    let hydrated = h.pipeline.hydrator.hydrate_stubs(&refs).await.unwrap();
    assert_eq!(hydrated, 50);
    assert_eq!(h.primary.call_count("batch_get_works"), 2);
    assert!(h.store.work("W2000").unwrap().is_stub);
    assert!(!h.store.work("W2149").unwrap().is_stub);
}

#[tokio::test]
async fn test_small_store_chunks_still_find_every_stub() {
    let primary = MockPrimaryProvider::new()
        .with_work(minimal_work("W2", "a"))
        .with_work(minimal_work("W3", "b"))
        .with_work(minimal_work("W4", "c"));
    let h = Harness::with(
        primary,
        MockCitationProvider::new(),
        PipelineConfig::default().with_store_in_chunk(1),
    );
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2", "W3", "W4"]))
        .await
        .unwrap();

    let hydrated = h
        .pipeline
        .hydrator
        .hydrate_stubs(&ids(&["W2", "W3", "W4"]))
        .await
        .unwrap();
    assert_eq!(hydrated, 3);
}

#[tokio::test]
async fn test_hydrate_pending_takes_oldest_stubs() {
    let primary = MockPrimaryProvider::new()
        .with_work(minimal_work("W2", "a"))
        .with_work(minimal_work("W3", "b"));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2", "W3"]))
        .await
        .unwrap();

    assert_eq!(h.pipeline.hydrator.hydrate_pending(Some(1)).await.unwrap(), 1);
    assert!(!h.store.work("W2").unwrap().is_stub);
    assert!(h.store.work("W3").unwrap().is_stub);

    assert_eq!(h.pipeline.hydrator.hydrate_pending(None).await.unwrap(), 1);
    assert!(h.store.list_stub_ids(10, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolvable_stub_does_not_block_newer_stubs() {
    // The provider never returns W2, so it stays a stub after every run.
    let primary = MockPrimaryProvider::new().with_work(minimal_work("W3", "b"));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2", "W3"]))
        .await
        .unwrap();

    assert_eq!(h.pipeline.hydrator.hydrate_pending(Some(1)).await.unwrap(), 0);
    assert_eq!(h.store.hydrate_attempts("W2"), Some(1));

    assert_eq!(h.pipeline.hydrator.hydrate_pending(Some(1)).await.unwrap(), 1);
    assert!(!h.store.work("W3").unwrap().is_stub);
    assert!(h.store.work("W2").unwrap().is_stub);
}

#[tokio::test]
async fn test_exhausted_stub_is_no_longer_selected() {
    let h = Harness::with(
        MockPrimaryProvider::new(),
        MockCitationProvider::new(),
        PipelineConfig::default().with_hydrate_max_attempts(2),
    );
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2"]))
        .await
        .unwrap();

    for _ in 0..3 {
        h.pipeline.hydrator.hydrate_pending(None).await.unwrap();
    }
    assert_eq!(h.primary.call_count("batch_get_works"), 2);
    assert_eq!(h.store.hydrate_attempts("W2"), Some(2));

    // Explicit requests still reach the provider.
    h.pipeline
        .hydrator
        .hydrate_stubs(&ids(&["W2"]))
        .await
        .unwrap();
    assert_eq!(h.primary.call_count("batch_get_works"), 3);
}

#[tokio::test]
async fn test_fetch_serves_full_record_from_store() {
    let h = Harness::new();
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &[]))
        .await
        .unwrap();

    let found = h
        .pipeline
        .fetcher
        .get_or_fetch_work("https://openalex.org/W1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.work.id, "W1");
    assert_eq!(found.authors[0].id, "A1");
    assert_eq!(found.topics[0].id, "T1");
    assert!(found.topics[0].is_primary);
    assert_eq!(h.primary.total_calls(), 0);
}

#[tokio::test]
async fn test_fetch_miss_ingests_and_rereads() {
    let primary = MockPrimaryProvider::new().with_work(full_work("W7", &["W8"]));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());

    let found = h
        .pipeline
        .fetcher
        .get_or_fetch_work("W7")
        .await
        .unwrap()
        .unwrap();
    assert!(!found.work.is_stub);
    assert_eq!(found.authors.len(), 2);
    assert_eq!(found.authors[1].position, 1);
    assert_eq!(h.primary.call_count("get_work"), 1);
    assert!(h.store.work("W8").unwrap().is_stub);

    h.pipeline.fetcher.get_or_fetch_work("W7").await.unwrap();
    assert_eq!(h.primary.call_count("get_work"), 1);
}

#[tokio::test]
async fn test_fetch_stub_goes_to_provider() {
    let primary = MockPrimaryProvider::new().with_work(minimal_work("W2", "Real Title"));
    let h = Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default());
    h.pipeline
        .ingestor
        .ingest_work(&full_work("W1", &["W2"]))
        .await
        .unwrap();

    let found = h
        .pipeline
        .fetcher
        .get_or_fetch_work("W2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.work.title, "Real Title");
    assert!(!found.work.is_stub);
}

#[tokio::test]
async fn test_fetch_unknown_is_none() {
    let h = Harness::new();
    assert!(h
        .pipeline
        .fetcher
        .get_or_fetch_work("W404")
        .await
        .unwrap()
        .is_none());
    assert_eq!(h.store.work_count(), 0);
}

#[tokio::test]
async fn test_fetch_provider_failure_propagates() {
    let h = Harness::new();
    h.primary.fail_operation("get_work");
    let err = h.pipeline.fetcher.get_or_fetch_work("W1").await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 503, .. }));
}

//! Cached search and saved-search replay.

mod common;

use chrono::{Duration, Utc};
use common::{full_work, minimal_work, Harness};
use litgraph_core::{Error, SearchRequest, SearchSort};
use litgraph_pipeline::PipelineConfig;
use litgraph_providers::mock::{MockCitationProvider, MockPrimaryProvider};
use uuid::Uuid;

fn harness_with_results() -> Harness {
    let primary = MockPrimaryProvider::new().with_search_results(
        vec![full_work("W1", &["W9"]), minimal_work("W2", "Second")],
        1234,
    );
    Harness::with(primary, MockCitationProvider::new(), PipelineConfig::default())
}

#[tokio::test]
async fn test_first_search_hits_provider_and_caches() {
    let h = harness_with_results();
    let results = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap();

    assert!(!results.from_cache);
    assert!(results.cache_id.is_some());
    assert_eq!(results.count, 1234);
    let ids: Vec<&str> = results.results.iter().map(|w| w.work.id.as_str()).collect();
    assert_eq!(ids, vec!["W1", "W2"]);
    assert_eq!(results.results[0].authors.len(), 2);
    assert!(h.store.work("W9").unwrap().is_stub);
}

#[tokio::test]
async fn test_repeat_search_served_from_cache() {
    let h = harness_with_results();
    let first = h
        .pipeline
        .search
        .search(&SearchRequest::new("Graph  Theory"))
        .await
        .unwrap();
    let second = h
        .pipeline
        .search
        .search(&SearchRequest::new(" graph theory "))
        .await
        .unwrap();

    assert!(second.from_cache);
    assert_eq!(second.cache_id, first.cache_id);
    assert_eq!(second.count, 1234);
    assert_eq!(second.results.len(), 2);
    assert_eq!(h.primary.call_count("search_works"), 1);
}

#[tokio::test]
async fn test_stale_entry_is_refreshed_in_place() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory");
    let first = h.pipeline.search.search(&req).await.unwrap();
    let cache_id = first.cache_id.unwrap();

    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::hours(4) - Duration::minutes(1));
    h.primary
        .set_search_results(vec![minimal_work("W3", "Fresh")], 1);

    let refreshed = h.pipeline.search.search(&req).await.unwrap();
    assert!(!refreshed.from_cache);
    assert_eq!(refreshed.cache_id, Some(cache_id));
    assert_eq!(refreshed.results[0].work.id, "W3");
    assert_eq!(h.primary.call_count("search_works"), 2);

    let entry = h.pipeline.search.cache().get(cache_id).await.unwrap().unwrap();
    assert_eq!(entry.work_ids, vec!["W3"]);
    assert_eq!(entry.result_count, 1);
}

#[tokio::test]
async fn test_entry_within_window_is_fresh() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory");
    let first = h.pipeline.search.search(&req).await.unwrap();
    h.store.set_cache_refreshed_at(
        first.cache_id.unwrap(),
        Utc::now() - Duration::hours(3) - Duration::minutes(59),
    );

    let again = h.pipeline.search.search(&req).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(h.primary.call_count("search_works"), 1);
}

#[tokio::test]
async fn test_filters_produce_distinct_entries() {
    let h = harness_with_results();
    let plain = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap();
    let filtered = h
        .pipeline
        .search
        .search(
            &SearchRequest::new("graph theory")
                .with_years(Some(2020), Some(2024))
                .with_sort(SearchSort::Newest),
        )
        .await
        .unwrap();

    assert_ne!(plain.cache_id, filtered.cache_id);
    assert_eq!(h.primary.call_count("search_works"), 2);
}

#[tokio::test]
async fn test_later_pages_bypass_cache() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory").with_page(2);
    let first = h.pipeline.search.search(&req).await.unwrap();
    let second = h.pipeline.search.search(&req).await.unwrap();

    assert!(first.cache_id.is_none());
    assert!(!second.from_cache);
    assert_eq!(second.page, 2);
    assert_eq!(h.primary.call_count("search_works"), 2);
}

#[tokio::test]
async fn test_search_provider_failure_propagates() {
    let h = harness_with_results();
    h.primary.fail_operation("search_works");
    let err = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap_err();
    assert!(err.is_upstream());
}

#[tokio::test]
async fn test_replay_unknown_entry_is_not_found() {
    let h = Harness::new();
    let err = h.pipeline.search.replay(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_replay_serves_cached_results() {
    let h = harness_with_results();
    let first = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap();

    let replayed = h.pipeline.search.replay(first.cache_id.unwrap()).await.unwrap();
    assert!(replayed.from_cache);
    assert_eq!(replayed.results.len(), 2);
    assert_eq!(h.primary.call_count("search_works"), 1);
}

#[tokio::test]
async fn test_replay_refreshes_stale_newest_entry() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory").with_sort(SearchSort::Newest);
    let cache_id = h.pipeline.search.search(&req).await.unwrap().cache_id.unwrap();

    // stale for page-1 search, still fresh for saved-search replay
    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::hours(5));
    let replayed = h.pipeline.search.replay(cache_id).await.unwrap();
    assert!(replayed.from_cache);
    assert_eq!(h.primary.call_count("search_works"), 1);

    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::hours(25));
    h.primary
        .set_search_results(vec![minimal_work("W5", "Newest")], 77);
    let replayed = h.pipeline.search.replay(cache_id).await.unwrap();
    assert!(!replayed.from_cache);
    assert_eq!(replayed.count, 77);
    assert_eq!(replayed.results[0].work.id, "W5");
    assert_eq!(h.primary.call_count("search_works"), 2);
}

#[tokio::test]
async fn test_replay_never_refreshes_relevance_entry() {
    let h = harness_with_results();
    let cache_id = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap()
        .cache_id
        .unwrap();
    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::days(30));

    let replayed = h.pipeline.search.replay(cache_id).await.unwrap();
    assert!(replayed.from_cache);
    assert_eq!(h.primary.call_count("search_works"), 1);
}

#[tokio::test]
async fn test_replay_serves_stale_results_when_refresh_fails() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory").with_sort(SearchSort::Newest);
    let cache_id = h.pipeline.search.search(&req).await.unwrap().cache_id.unwrap();
    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::hours(48));
    h.primary.fail_operation("search_works");

    let replayed = h.pipeline.search.replay(cache_id).await.unwrap();
    assert!(replayed.from_cache);
    assert_eq!(replayed.results.len(), 2);
}

#[tokio::test]
async fn test_non_default_page_size_bypasses_cache() {
    let h = Harness::with(
        MockPrimaryProvider::new().with_search_results(vec![minimal_work("W1", "Only")], 3),
        MockCitationProvider::new(),
        PipelineConfig::default(),
    );
    let mut small = SearchRequest::new("graph theory");
    small.per_page = 1;
    let first = h.pipeline.search.search(&small).await.unwrap();
    assert!(first.cache_id.is_none());

    h.primary.set_search_results(
        vec![
            minimal_work("W1", "Only"),
            minimal_work("W2", "Two"),
            minimal_work("W3", "Three"),
        ],
        3,
    );
    let mut large = SearchRequest::new("graph theory");
    large.per_page = 50;
    let second = h.pipeline.search.search(&large).await.unwrap();
    assert!(!second.from_cache);
    assert_eq!(second.per_page, 50);
    assert_eq!(second.results.len(), 3);

    let default = h
        .pipeline
        .search
        .search(&SearchRequest::new("graph theory"))
        .await
        .unwrap();
    assert!(!default.from_cache);
    assert!(default.cache_id.is_some());
    assert_eq!(h.primary.call_count("search_works"), 3);
}

#[tokio::test]
async fn test_out_of_range_year_is_rejected_before_provider() {
    let h = harness_with_results();
    for req in [
        SearchRequest::new("graph theory").with_years(Some(i32::MIN), None),
        SearchRequest::new("graph theory").with_years(None, Some(i32::MAX)),
    ] {
        let err = h.pipeline.search.search(&req).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
    assert_eq!(h.primary.total_calls(), 0);
}

#[tokio::test]
async fn test_stale_search_served_when_refresh_fails() {
    let h = harness_with_results();
    let req = SearchRequest::new("graph theory");
    let cache_id = h.pipeline.search.search(&req).await.unwrap().cache_id.unwrap();
    h.store
        .set_cache_refreshed_at(cache_id, Utc::now() - Duration::hours(5));
    h.primary.fail_operation("search_works");

    let stale = h.pipeline.search.search(&req).await.unwrap();
    assert!(stale.from_cache);
    assert_eq!(stale.cache_id, Some(cache_id));
    assert_eq!(stale.count, 1234);
    assert_eq!(stale.results.len(), 2);
    assert_eq!(h.primary.call_count("search_works"), 2);
}

//! HTTP-level tests for the OpenAlex client.

use litgraph_core::{Error, PrimaryProvider, SearchRequest, SearchSort};
use litgraph_providers::{OpenAlexClient, OpenAlexConfig};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, config: OpenAlexConfig) -> OpenAlexClient {
    OpenAlexClient::new(config.with_base_url(server.uri())).expect("client")
}

#[tokio::test]
async fn test_get_work_strips_prefix_and_sends_mailto() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/W2741809807"))
        .and(query_param("mailto", "ops@example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://openalex.org/W2741809807",
            "title": "The state of OA"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let openalex = client(
        &server,
        OpenAlexConfig::default().with_email("ops@example.org"),
    );
    let work = openalex
        .get_work("https://openalex.org/W2741809807")
        .await
        .unwrap()
        .expect("work present");
    assert_eq!(work.title.as_deref(), Some("The state of OA"));
}

#[tokio::test]
async fn test_get_work_not_found_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/W404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let openalex = client(&server, OpenAlexConfig::default());
    assert!(openalex.get_work("W404").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_work_server_error_is_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/W1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let openalex = client(&server, OpenAlexConfig::default());
    match openalex.get_work("W1").await {
        Err(Error::Upstream { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_sends_filters_sort_and_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("search", "protein folding"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "20"))
        .and(query_param(
            "filter",
            "publication_year:>2019,publication_year:<2025",
        ))
        .and(query_param("sort", "publication_date:desc"))
        .and(query_param("api_key", "k3y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "count": 4211, "page": 2, "per_page": 20 },
            "results": [{ "id": "https://openalex.org/W1" }, { "id": "https://openalex.org/W2" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let openalex = client(
        &server,
        OpenAlexConfig::default()
            .with_api_key("k3y")
            .with_email("ignored@example.org"),
    );
    let req = SearchRequest::new("protein folding")
        .with_page(2)
        .with_years(Some(2020), Some(2024))
        .with_sort(SearchSort::Newest);
    let page = openalex.search_works(&req).await.unwrap();

    assert_eq!(page.total_count, 4211);
    assert_eq!(page.results.len(), 2);
}

#[tokio::test]
async fn test_batch_uses_or_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "openalex:W1|W2|W3"))
        .and(query_param("per_page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "count": 2 },
            "results": [{ "id": "https://openalex.org/W1" }, { "id": "https://openalex.org/W3" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let openalex = client(&server, OpenAlexConfig::default());
    let ids = vec![
        "W1".to_string(),
        "https://openalex.org/W2".to_string(),
        "W3".to_string(),
    ];
    let works = openalex.batch_get_works(&ids).await.unwrap();
    assert_eq!(works.len(), 2);
}

#[tokio::test]
async fn test_batch_empty_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let openalex = client(&server, OpenAlexConfig::default());
    assert!(openalex.batch_get_works(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_over_limit_is_rejected() {
    let server = MockServer::start().await;
    let openalex = client(&server, OpenAlexConfig::default());
    let ids: Vec<String> = (0..101).map(|i| format!("W{i}")).collect();
    assert!(matches!(
        openalex.batch_get_works(&ids).await,
        Err(Error::InvalidInput(_))
    ));
}

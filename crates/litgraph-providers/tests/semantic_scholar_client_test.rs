//! HTTP-level tests for the Semantic Scholar client.

use litgraph_core::{CitationProvider, Error};
use litgraph_providers::{SemanticScholarClient, SemanticScholarConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, config: SemanticScholarConfig) -> SemanticScholarClient {
    SemanticScholarClient::new(config.with_base_url(server.uri())).expect("client")
}

#[tokio::test]
async fn test_references_map_to_openalex_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/openalex:W100"))
        .and(query_param("fields", "references.externalIds"))
        .and(header("x-api-key", "s2-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paperId": "abc",
            "references": [
                { "paperId": "r1", "externalIds": { "OpenAlex": "W1", "DOI": "10.1/a" } },
                { "paperId": "r2", "externalIds": { "DOI": "10.1/b" } },
                { "paperId": "r3", "externalIds": null },
                null,
                { "paperId": "r4", "externalIds": { "OpenAlex": "W4" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let s2 = client(&server, SemanticScholarConfig::default().with_api_key("s2-key"));
    let refs = s2.fetch_references("https://openalex.org/W100").await.unwrap();
    assert_eq!(refs, vec!["W1", "W4"]);
}

#[tokio::test]
async fn test_unknown_paper_yields_empty_lists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Paper not found" })))
        .mount(&server)
        .await;

    let s2 = client(&server, SemanticScholarConfig::default());
    assert!(s2.fetch_references("W9").await.unwrap().is_empty());
    assert!(s2.fetch_cited_by("W9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit_is_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let s2 = client(&server, SemanticScholarConfig::default());
    assert!(matches!(
        s2.fetch_references("W9").await,
        Err(Error::Upstream { status: 429, .. })
    ));
}

#[tokio::test]
async fn test_cited_by_paginates_until_short_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/openalex:W5/citations"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offset": 0,
            "next": 2,
            "data": [
                { "citingPaper": { "externalIds": { "OpenAlex": "W10" } } },
                { "citingPaper": { "externalIds": { "OpenAlex": "W11" } } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/openalex:W5/citations"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offset": 2,
            "data": [
                { "citingPaper": { "externalIds": { "MAG": "1" } } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let s2 = client(
        &server,
        SemanticScholarConfig::default().with_cited_by_paging(2, 100),
    );
    let citing = s2.fetch_cited_by("W5").await.unwrap();
    assert_eq!(citing, vec!["W10", "W11"]);
}

#[tokio::test]
async fn test_cited_by_stops_at_cap() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/openalex:W6/citations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": 999,
            "data": [
                { "citingPaper": { "externalIds": { "OpenAlex": "W1" } } },
                { "citingPaper": { "externalIds": { "OpenAlex": "W2" } } }
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let s2 = client(
        &server,
        SemanticScholarConfig::default().with_cited_by_paging(2, 3),
    );
    let citing = s2.fetch_cited_by("W6").await.unwrap();
    assert_eq!(citing.len(), 3);
}

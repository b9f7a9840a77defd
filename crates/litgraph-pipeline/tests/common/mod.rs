//! Shared fixtures for pipeline integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use litgraph_core::RawWork;
use litgraph_db::MemoryStore;
use litgraph_pipeline::{Pipeline, PipelineConfig};
use litgraph_providers::mock::{MockCitationProvider, MockPrimaryProvider};
use serde_json::{json, Value};

pub struct Harness {
    pub store: MemoryStore,
    pub primary: MockPrimaryProvider,
    pub citations: MockCitationProvider,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            MockPrimaryProvider::new(),
            MockCitationProvider::new(),
            PipelineConfig::default(),
        )
    }

    pub fn with(
        primary: MockPrimaryProvider,
        citations: MockCitationProvider,
        config: PipelineConfig,
    ) -> Self {
        let store = MemoryStore::new();
        let pipeline = Pipeline::new(
            Arc::new(store.clone()),
            Arc::new(primary.clone()),
            Arc::new(citations.clone()),
            config,
        );
        Self {
            store,
            primary,
            citations,
            pipeline,
        }
    }
}

pub fn raw(value: Value) -> RawWork {
    serde_json::from_value(value).expect("valid work payload")
}

/// A bare work with only an id and title.
pub fn minimal_work(id: &str, title: &str) -> RawWork {
    raw(json!({ "id": format!("https://openalex.org/{id}"), "title": title }))
}

/// A fully populated work referencing `references`.
pub fn full_work(id: &str, references: &[&str]) -> RawWork {
    let refs: Vec<String> = references
        .iter()
        .map(|r| format!("https://openalex.org/{r}"))
        .collect();
    raw(json!({
        "id": format!("https://openalex.org/{id}"),
        "title": format!("Work {id}"),
        "publication_year": 2021,
        "publication_date": "2021-06-01",
        "cited_by_count": 42,
        "type": "article",
        "abstract_inverted_index": { "Graphs": [0], "are": [1], "everywhere": [2] },
        "primary_location": {
            "is_oa": true,
            "pdf_url": "https://example.org/paper.pdf",
            "source": {
                "id": "https://openalex.org/S1",
                "display_name": "Journal of Graphs",
                "type": "journal",
                "apc_usd": { "value": 1500 }
            }
        },
        "open_access": { "is_oa": true },
        "authorships": [
            {
                "author": { "id": "https://openalex.org/A1", "display_name": "Ada Lovelace" },
                "is_corresponding": true,
                "institutions": [{ "id": "https://openalex.org/I1", "display_name": "Analytical U" }]
            },
            {
                "author": { "id": "https://openalex.org/A2", "display_name": "Charles Babbage" },
                "institutions": [{ "id": "https://openalex.org/I1", "display_name": "Analytical U" }]
            }
        ],
        "topics": [
            {
                "id": "https://openalex.org/T1",
                "display_name": "Graph Theory",
                "score": 0.97,
                "subfield": { "id": "https://openalex.org/subfields/2607", "display_name": "Discrete Mathematics" },
                "field": { "id": "https://openalex.org/fields/26", "display_name": "Mathematics" },
                "domain": { "id": "https://openalex.org/domains/3", "display_name": "Physical Sciences" }
            },
            {
                "id": "https://openalex.org/T2",
                "display_name": "Network Science",
                "score": 0.61,
                "subfield": { "id": "https://openalex.org/subfields/2607", "display_name": "Discrete Mathematics" },
                "field": { "id": "https://openalex.org/fields/26", "display_name": "Mathematics" },
                "domain": { "id": "https://openalex.org/domains/3", "display_name": "Physical Sciences" }
            }
        ],
        "grants": [
            { "funder": "https://openalex.org/F1", "funder_display_name": "NSF", "award_id": "CCF-1" },
            { "funder": "https://openalex.org/F1", "funder_display_name": "NSF", "award_id": "CCF-2" }
        ],
        "referenced_works": refs
    }))
}

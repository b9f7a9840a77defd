//! # litgraph-providers
//!
//! HTTP clients for the external bibliographic providers:
//!
//! - [`OpenAlexClient`]: primary provider for full work metadata and search
//! - [`SemanticScholarClient`]: secondary provider for the citation graph
//!
//! Both implement the provider traits from `litgraph-core` and are meant to be
//! constructed once and shared as `Arc<dyn …>`.

pub mod config;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openalex;
pub mod semantic_scholar;

pub use config::{OpenAlexConfig, SemanticScholarConfig};
pub use openalex::OpenAlexClient;
pub use semantic_scholar::SemanticScholarClient;

pub use litgraph_core::{CitationProvider, PrimaryProvider};

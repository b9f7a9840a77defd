//! # litgraph-core
//!
//! Core types, traits, and abstractions for the litgraph ingestion pipeline.
//!
//! This crate provides the normalized entity models, the typed provider
//! payload schemas, and the store/provider trait definitions that the other
//! litgraph crates depend on.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod payload;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use ids::{new_v7, normalize_id, OPENALEX_ID_PREFIX};
pub use models::*;
pub use payload::*;
pub use traits::*;

//! # litgraph-jobs
//!
//! Background worker for the litgraph pipeline.
//!
//! This crate provides:
//! - A bounded in-process job queue for fire-and-forget citation enrichment
//! - Scheduled stub hydration on a fixed interval
//! - Concurrent execution capped at `max_concurrent_jobs`
//! - Lifecycle notifications via broadcast channels
//!
//! ## Example
//!
//! ```ignore
//! use litgraph_jobs::{JobKind, WorkerBuilder, WorkerConfig};
//!
//! let handle = WorkerBuilder::for_pipeline(&pipeline)
//!     .with_config(WorkerConfig::from_env())
//!     .build()
//!     .await
//!     .start();
//!
//! handle.submit(JobKind::EnrichCitations { work_id: "W2741809807".into() })?;
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod worker;

pub use handler::{
    EnrichCitationsHandler, HydrateStubsHandler, Job, JobContext, JobHandler, JobKind, JobResult,
    JobType,
};
pub use worker::{JobSubmitter, JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

//! Structured logging schema and field name constants for litgraph.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query every subsystem the same way.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (ids, rows) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "pipeline", "db", "provider", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "ingestor", "hydrator", "enricher", "query_cache", "openalex"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "ingest_work", "hydrate_stubs", "enrich_citations"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Work id being operated on.
pub const WORK_ID: &str = "work_id";

/// Search cache entry id.
pub const CACHE_ID: &str = "cache_id";

/// Search query text.
pub const QUERY: &str = "query";

/// Ingestion phase name.
pub const PHASE: &str = "phase";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of ids requested.
pub const REQUESTED: &str = "requested";

/// Number of stub works hydrated.
pub const HYDRATED: &str = "hydrated";

// ─── Provider fields ───────────────────────────────────────────────────────

/// External provider name ("openalex", "semantic_scholar").
pub const PROVIDER: &str = "provider";

/// HTTP status returned by a provider.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

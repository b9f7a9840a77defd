//! Connection pool sizing for the work store.
//!
//! Ingestion holds one connection per open session for the whole write
//! sequence, so the pool must cover concurrent hydration batches plus the
//! request path.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use litgraph_core::{defaults::HYDRATE_CONCURRENCY, Error, Result};

/// Request path and job worker headroom on top of hydration sessions.
const BASE_CONNECTIONS: u32 = 7;

const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Pool configuration.
///
/// | Variable | Default |
/// |----------|---------|
/// | `DATABASE_MAX_CONNECTIONS` | 10 |
/// | `DATABASE_ACQUIRE_TIMEOUT_SECS` | 30 |
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a session waits for a free connection before failing.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: BASE_CONNECTIONS + HYDRATE_CONCURRENCY as u32,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            max_connections: parse("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(d.max_connections)
                .max(1),
            acquire_timeout: parse("DATABASE_ACQUIRE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.acquire_timeout),
            idle_timeout: d.idle_timeout,
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Open a pool against `database_url`.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database pool established"
    );
    Ok(pool)
}

//! Pipeline tuning.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HYDRATE_CONCURRENCY` | 3 |
//! | `STORE_IN_CHUNK` | 200 |
//! | `HYDRATE_BATCH_LIMIT` | 50 |
//! | `HYDRATE_MAX_ATTEMPTS` | 5 |
//! | `SEARCH_CACHE_MAX_AGE_HOURS` | 4 |
//! | `SAVED_SEARCH_MAX_AGE_HOURS` | 24 |
//! | `ENRICH_CLAIM_LEASE_SECS` | 600 |

use chrono::Duration;

use litgraph_core::defaults::{self, MAX_CACHE_AGE_HOURS, MAX_ENRICH_CLAIM_LEASE_SECS};

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Configuration shared by the pipeline components.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Provider batches fetched concurrently by the hydrator.
    pub hydrate_concurrency: usize,
    /// Maximum ids per store id-list lookup.
    pub store_in_chunk: usize,
    /// Stubs selected by one scheduled hydration run.
    pub hydrate_batch_limit: i64,
    /// Attempts after which a stub drops out of scheduled hydration.
    pub hydrate_max_attempts: i32,
    pub search_cache_max_age_hours: i64,
    pub saved_search_max_age_hours: i64,
    pub enrich_claim_lease_secs: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hydrate_concurrency: defaults::HYDRATE_CONCURRENCY,
            store_in_chunk: defaults::STORE_IN_CHUNK,
            hydrate_batch_limit: defaults::HYDRATE_BATCH_LIMIT,
            hydrate_max_attempts: defaults::HYDRATE_MAX_ATTEMPTS,
            search_cache_max_age_hours: defaults::SEARCH_CACHE_MAX_AGE_HOURS,
            saved_search_max_age_hours: defaults::SAVED_SEARCH_MAX_AGE_HOURS,
            enrich_claim_lease_secs: defaults::ENRICH_CLAIM_LEASE_SECS,
        }
    }
}

impl PipelineConfig {
    /// Load from environment, falling back to defaults. Zero counts are raised
    /// to 1 and windows are clamped to their accepted range.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            hydrate_concurrency: env_parse::<usize>("HYDRATE_CONCURRENCY")
                .unwrap_or(d.hydrate_concurrency)
                .max(1),
            store_in_chunk: env_parse::<usize>("STORE_IN_CHUNK")
                .unwrap_or(d.store_in_chunk)
                .max(1),
            hydrate_batch_limit: env_parse::<i64>("HYDRATE_BATCH_LIMIT")
                .unwrap_or(d.hydrate_batch_limit)
                .max(1),
            hydrate_max_attempts: env_parse::<i32>("HYDRATE_MAX_ATTEMPTS")
                .unwrap_or(d.hydrate_max_attempts)
                .max(1),
            search_cache_max_age_hours: env_parse::<i64>("SEARCH_CACHE_MAX_AGE_HOURS")
                .unwrap_or(d.search_cache_max_age_hours)
                .clamp(0, MAX_CACHE_AGE_HOURS),
            saved_search_max_age_hours: env_parse::<i64>("SAVED_SEARCH_MAX_AGE_HOURS")
                .unwrap_or(d.saved_search_max_age_hours)
                .clamp(0, MAX_CACHE_AGE_HOURS),
            enrich_claim_lease_secs: env_parse::<i64>("ENRICH_CLAIM_LEASE_SECS")
                .unwrap_or(d.enrich_claim_lease_secs)
                .clamp(1, MAX_ENRICH_CLAIM_LEASE_SECS),
        }
    }

    pub fn with_hydrate_concurrency(mut self, n: usize) -> Self {
        self.hydrate_concurrency = n.max(1);
        self
    }

    pub fn with_store_in_chunk(mut self, n: usize) -> Self {
        self.store_in_chunk = n.max(1);
        self
    }

    pub fn with_hydrate_batch_limit(mut self, n: i64) -> Self {
        self.hydrate_batch_limit = n.max(1);
        self
    }

    pub fn with_hydrate_max_attempts(mut self, n: i32) -> Self {
        self.hydrate_max_attempts = n.max(1);
        self
    }

    pub fn with_search_cache_max_age_hours(mut self, hours: i64) -> Self {
        self.search_cache_max_age_hours = hours.clamp(0, MAX_CACHE_AGE_HOURS);
        self
    }

    pub fn with_saved_search_max_age_hours(mut self, hours: i64) -> Self {
        self.saved_search_max_age_hours = hours.clamp(0, MAX_CACHE_AGE_HOURS);
        self
    }

    pub fn with_enrich_claim_lease_secs(mut self, secs: i64) -> Self {
        self.enrich_claim_lease_secs = secs.clamp(1, MAX_ENRICH_CLAIM_LEASE_SECS);
        self
    }

    pub fn enrich_claim_lease(&self) -> Duration {
        Duration::try_seconds(self.enrich_claim_lease_secs)
            .unwrap_or(Duration::seconds(MAX_ENRICH_CLAIM_LEASE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.hydrate_concurrency, 3);
        assert_eq!(config.store_in_chunk, 200);
        assert_eq!(config.search_cache_max_age_hours, 4);
        assert_eq!(config.saved_search_max_age_hours, 24);
        assert_eq!(config.enrich_claim_lease(), Duration::minutes(10));
    }

    #[test]
    fn test_builders_clamp_counts() {
        let config = PipelineConfig::default()
            .with_hydrate_concurrency(0)
            .with_store_in_chunk(0)
            .with_hydrate_batch_limit(-5);
        assert_eq!(config.hydrate_concurrency, 1);
        assert_eq!(config.store_in_chunk, 1);
        assert_eq!(config.hydrate_batch_limit, 1);
    }

    #[test]
    fn test_builders_clamp_windows() {
        let config = PipelineConfig::default()
            .with_search_cache_max_age_hours(i64::MAX)
            .with_saved_search_max_age_hours(-3)
            .with_enrich_claim_lease_secs(i64::MAX)
            .with_hydrate_max_attempts(0);
        assert_eq!(config.search_cache_max_age_hours, MAX_CACHE_AGE_HOURS);
        assert_eq!(config.saved_search_max_age_hours, 0);
        assert_eq!(
            config.enrich_claim_lease(),
            Duration::seconds(MAX_ENRICH_CLAIM_LEASE_SECS)
        );
        assert_eq!(config.hydrate_max_attempts, 1);
    }

    #[test]
    fn test_unclamped_lease_does_not_panic() {
        let config = PipelineConfig {
            enrich_claim_lease_secs: i64::MAX,
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.enrich_claim_lease(),
            Duration::seconds(MAX_ENRICH_CLAIM_LEASE_SECS)
        );
    }
}

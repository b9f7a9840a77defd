//! Search cache repository.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use litgraph_core::{new_v7, CreateSearchCacheRequest, Error, Result, SearchCacheEntry};

const CACHE_COLUMNS: &str =
    "id, query_hash, query, from_year, to_year, sort, work_ids, result_count, refreshed_at";

fn entry_from_row(row: &PgRow) -> SearchCacheEntry {
    SearchCacheEntry {
        id: row.get("id"),
        query_hash: row.get("query_hash"),
        query: row.get("query"),
        from_year: row.get("from_year"),
        to_year: row.get("to_year"),
        sort: row.get("sort"),
        work_ids: row.get("work_ids"),
        result_count: row.get("result_count"),
        refreshed_at: row.get("refreshed_at"),
    }
}

/// PostgreSQL repository for cached provider searches.
#[derive(Clone)]
pub struct PgSearchCacheRepository {
    pool: Pool<Postgres>,
}

impl PgSearchCacheRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_hash(&self, query_hash: &str) -> Result<Option<SearchCacheEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {CACHE_COLUMNS} FROM search_cache WHERE query_hash = $1"
        ))
        .bind(query_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(entry_from_row))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<SearchCacheEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {CACHE_COLUMNS} FROM search_cache WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(entry_from_row))
    }

    /// Insert an entry, or refresh the one already holding this hash.
    pub async fn insert(&self, req: CreateSearchCacheRequest) -> Result<SearchCacheEntry> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO search_cache (
                id, query_hash, query, from_year, to_year, sort, work_ids, result_count,
                refreshed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (query_hash) DO UPDATE SET
                work_ids = EXCLUDED.work_ids,
                result_count = EXCLUDED.result_count,
                refreshed_at = EXCLUDED.refreshed_at
            RETURNING {CACHE_COLUMNS}
            "#
        ))
        .bind(new_v7())
        .bind(&req.query_hash)
        .bind(&req.query)
        .bind(req.from_year)
        .bind(req.to_year)
        .bind(&req.sort)
        .bind(&req.work_ids)
        .bind(req.result_count)
        .bind(req.refreshed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(entry_from_row(&row))
    }

    pub async fn refresh(
        &self,
        id: Uuid,
        work_ids: &[String],
        result_count: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Result<SearchCacheEntry> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE search_cache
            SET work_ids = $2, result_count = $3, refreshed_at = $4
            WHERE id = $1
            RETURNING {CACHE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(work_ids)
        .bind(result_count)
        .bind(refreshed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(entry_from_row)
            .ok_or_else(|| Error::NotFound(format!("search cache entry {id}")))
    }
}

//! Work graph read repository.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use litgraph_core::defaults::STORE_IN_CHUNK;
use litgraph_core::{
    CitationNeighbors, ClaimOutcome, Error, Result, TopicLevel, Work, WorkAuthorSummary,
    WorkTopicSummary, WorkWithRelations,
};

/// Column list for `works` selects, in [`work_from_row`] order.
pub(crate) const WORK_COLUMNS: &str = "id, title, abstract, year, doi, cited_by_count, \
    publication_date, type, language, is_retracted, is_open_access, open_access_url, fwci, \
    counts_by_year, biblio, keywords, sustainable_development_goals, mesh, indexed_in, \
    related_work_ids, source_id, source_display_name, is_stub, citations_fetched, \
    created_at, updated_at";

pub(crate) fn work_from_row(row: &PgRow) -> Work {
    Work {
        id: row.get("id"),
        title: row.get("title"),
        abstract_text: row.get("abstract"),
        year: row.get("year"),
        doi: row.get("doi"),
        cited_by_count: row.get("cited_by_count"),
        publication_date: row.get("publication_date"),
        work_type: row.get("type"),
        language: row.get("language"),
        is_retracted: row.get("is_retracted"),
        is_open_access: row.get("is_open_access"),
        open_access_url: row.get("open_access_url"),
        fwci: row.get("fwci"),
        counts_by_year: row.get("counts_by_year"),
        biblio: row.get("biblio"),
        keywords: row.get("keywords"),
        sustainable_development_goals: row.get("sustainable_development_goals"),
        mesh: row.get("mesh"),
        indexed_in: row.get("indexed_in"),
        related_work_ids: row.get("related_work_ids"),
        source_id: row.get("source_id"),
        source_display_name: row.get("source_display_name"),
        is_stub: row.get("is_stub"),
        citations_fetched: row.get("citations_fetched"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL repository for reading works and managing enrichment claims.
#[derive(Clone)]
pub struct PgWorkRepository {
    pool: Pool<Postgres>,
}

impl PgWorkRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Work>> {
        let row = sqlx::query(&format!("SELECT {WORK_COLUMNS} FROM works WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(work_from_row))
    }

    /// Fetch works with authors and topics, preserving the order of `ids`.
    pub async fn get_with_relations(&self, ids: &[String]) -> Result<Vec<WorkWithRelations>> {
        let mut works: HashMap<String, WorkWithRelations> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(STORE_IN_CHUNK) {
            let rows = sqlx::query(&format!(
                "SELECT {WORK_COLUMNS} FROM works WHERE id = ANY($1)"
            ))
            .bind(chunk)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

            for row in &rows {
                let work = work_from_row(row);
                works.insert(
                    work.id.clone(),
                    WorkWithRelations {
                        work,
                        authors: Vec::new(),
                        topics: Vec::new(),
                    },
                );
            }

            let author_rows = sqlx::query(
                r#"
                SELECT wa.work_id, a.id, a.display_name, a.orcid, wa.position, wa.is_corresponding
                FROM work_authors wa
                JOIN authors a ON a.id = wa.author_id
                WHERE wa.work_id = ANY($1)
                ORDER BY wa.work_id, wa.position
                "#,
            )
            .bind(chunk)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

            for row in author_rows {
                let work_id: String = row.get("work_id");
                if let Some(entry) = works.get_mut(&work_id) {
                    entry.authors.push(WorkAuthorSummary {
                        id: row.get("id"),
                        display_name: row.get("display_name"),
                        orcid: row.get("orcid"),
                        position: row.get("position"),
                        is_corresponding: row.get("is_corresponding"),
                    });
                }
            }

            let topic_rows = sqlx::query(
                r#"
                SELECT wt.work_id, t.id, t.name, t.level, wt.score, wt.is_primary
                FROM work_topics wt
                JOIN topics t ON t.id = wt.topic_id
                WHERE wt.work_id = ANY($1)
                ORDER BY wt.work_id, wt.score DESC, t.id
                "#,
            )
            .bind(chunk)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

            for row in topic_rows {
                let work_id: String = row.get("work_id");
                let level: i16 = row.get("level");
                if let Some(entry) = works.get_mut(&work_id) {
                    entry.topics.push(WorkTopicSummary {
                        id: row.get("id"),
                        name: row.get("name"),
                        level: TopicLevel::try_from(level)?,
                        score: row.get("score"),
                        is_primary: row.get("is_primary"),
                    });
                }
            }
        }

        Ok(ids.iter().filter_map(|id| works.remove(id)).collect())
    }

    /// Return the subset of `ids` stored as stubs.
    pub async fn filter_stub_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut stubs = Vec::new();
        for chunk in ids.chunks(STORE_IN_CHUNK) {
            let rows = sqlx::query("SELECT id FROM works WHERE id = ANY($1) AND is_stub")
                .bind(chunk)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;
            stubs.extend(rows.into_iter().map(|r| r.get::<String, _>("id")));
        }
        Ok(stubs)
    }

    pub async fn list_stub_ids(&self, limit: i64, max_attempts: i32) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM works
            WHERE is_stub AND hydrate_attempts < $2
            ORDER BY hydrate_attempted_at NULLS FIRST, created_at, id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    pub async fn record_hydration_attempts(
        &self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut updated = 0;
        for chunk in ids.chunks(STORE_IN_CHUNK) {
            let result = sqlx::query(
                r#"
                UPDATE works
                SET hydrate_attempts = hydrate_attempts + 1, hydrate_attempted_at = $2
                WHERE id = ANY($1) AND is_stub
                "#,
            )
            .bind(chunk)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
            updated += result.rows_affected();
        }
        Ok(updated)
    }

    pub async fn citation_neighbors(&self, id: &str) -> Result<CitationNeighbors> {
        let references = sqlx::query(
            "SELECT cited_work_id FROM work_citations WHERE citing_work_id = $1 ORDER BY cited_work_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let cited_by = sqlx::query(
            "SELECT citing_work_id FROM work_citations WHERE cited_work_id = $1 ORDER BY citing_work_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(CitationNeighbors {
            references: references.into_iter().map(|r| r.get(0)).collect(),
            cited_by: cited_by.into_iter().map(|r| r.get(0)).collect(),
        })
    }

    /// Claim a work for enrichment with a single conditional update.
    ///
    /// Only one caller can move `citations_claimed_at` forward while the
    /// previous claim is within its lease.
    pub async fn claim_citation_fetch(
        &self,
        id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let expired_before = now - lease;
        let claimed = sqlx::query(
            r#"
            UPDATE works
            SET citations_claimed_at = $2
            WHERE id = $1
              AND NOT citations_fetched
              AND (citations_claimed_at IS NULL OR citations_claimed_at < $3)
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(expired_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if claimed.is_some() {
            debug!(subsystem = "db", component = "works", work_id = %id, "Enrichment claim taken");
            return Ok(ClaimOutcome::Claimed);
        }

        let state = sqlx::query("SELECT citations_fetched FROM works WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(match state {
            None => ClaimOutcome::NotFound,
            Some(row) if row.get::<bool, _>("citations_fetched") => ClaimOutcome::AlreadyFetched,
            Some(_) => ClaimOutcome::InProgress,
        })
    }

    pub async fn release_citation_claim(&self, id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE works SET citations_claimed_at = NULL WHERE id = $1 AND citations_claimed_at = $2",
        )
        .bind(id)
        .bind(claimed_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

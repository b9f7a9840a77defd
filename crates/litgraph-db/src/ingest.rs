//! Transactional ingestion session.
//!
//! Every write runs inside one PostgreSQL transaction that becomes visible
//! only on [`IngestSession::commit`]. Dropping the session rolls back.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};

use litgraph_core::defaults::STUB_TITLE;
use litgraph_core::{
    Author, AuthorInstitution, CitationEdge, Error, Funder, IngestSession, Institution, Result,
    Source, Topic, WorkAuthor, WorkFunder, WorkRecord, WorkTopic,
};

/// PostgreSQL implementation of [`IngestSession`].
pub struct PgIngestSession {
    tx: Transaction<'static, Postgres>,
}

impl PgIngestSession {
    pub async fn begin(pool: &Pool<Postgres>) -> Result<Self> {
        let tx = pool.begin().await.map_err(Error::Database)?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl IngestSession for PgIngestSession {
    async fn upsert_sources(&mut self, sources: &[Source]) -> Result<()> {
        let now = Utc::now();
        for source in sources {
            sqlx::query(
                r#"
                INSERT INTO sources (
                    id, name, type, issn, is_oa, homepage_url, host_organization_name,
                    apc_usd, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    type = EXCLUDED.type,
                    issn = EXCLUDED.issn,
                    is_oa = EXCLUDED.is_oa,
                    homepage_url = EXCLUDED.homepage_url,
                    host_organization_name = EXCLUDED.host_organization_name,
                    apc_usd = EXCLUDED.apc_usd,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&source.id)
            .bind(&source.name)
            .bind(&source.source_type)
            .bind(&source.issn)
            .bind(source.is_oa)
            .bind(&source.homepage_url)
            .bind(&source.host_organization_name)
            .bind(source.apc_usd)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_institutions(&mut self, institutions: &[Institution]) -> Result<()> {
        let now = Utc::now();
        for inst in institutions {
            sqlx::query(
                r#"
                INSERT INTO institutions (id, name, type, country_code, ror_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    type = EXCLUDED.type,
                    country_code = EXCLUDED.country_code,
                    ror_id = EXCLUDED.ror_id,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&inst.id)
            .bind(&inst.name)
            .bind(&inst.institution_type)
            .bind(&inst.country_code)
            .bind(&inst.ror_id)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_funders(&mut self, funders: &[Funder]) -> Result<()> {
        let now = Utc::now();
        for funder in funders {
            sqlx::query(
                r#"
                INSERT INTO funders (id, name, country_code, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    country_code = COALESCE(EXCLUDED.country_code, funders.country_code),
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&funder.id)
            .bind(&funder.name)
            .bind(&funder.country_code)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_topics(&mut self, topics: &[Topic]) -> Result<()> {
        let now = Utc::now();
        for topic in topics {
            sqlx::query(
                r#"
                INSERT INTO topics (
                    id, name, level, parent_topic_id, description, keywords, works_count,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    level = EXCLUDED.level,
                    parent_topic_id = COALESCE(EXCLUDED.parent_topic_id, topics.parent_topic_id),
                    description = COALESCE(EXCLUDED.description, topics.description),
                    keywords = COALESCE(EXCLUDED.keywords, topics.keywords),
                    works_count = GREATEST(EXCLUDED.works_count, topics.works_count),
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&topic.id)
            .bind(&topic.name)
            .bind(topic.level.as_i16())
            .bind(&topic.parent_topic_id)
            .bind(&topic.description)
            .bind(&topic.keywords)
            .bind(topic.works_count)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_authors(&mut self, authors: &[Author]) -> Result<()> {
        let now = Utc::now();
        for author in authors {
            sqlx::query(
                r#"
                INSERT INTO authors (id, display_name, orcid, cited_by_count, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                ON CONFLICT (id) DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    orcid = EXCLUDED.orcid,
                    cited_by_count = EXCLUDED.cited_by_count,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&author.id)
            .bind(&author.display_name)
            .bind(&author.orcid)
            .bind(author.cited_by_count)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_work(&mut self, work: &WorkRecord) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO works (
                id, title, abstract, year, doi, cited_by_count, publication_date, type,
                language, is_retracted, is_open_access, open_access_url, fwci, counts_by_year,
                biblio, keywords, sustainable_development_goals, mesh, indexed_in,
                related_work_ids, source_id, source_display_name, is_stub, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, FALSE, $23, $23
            )
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                abstract = EXCLUDED.abstract,
                year = EXCLUDED.year,
                doi = EXCLUDED.doi,
                cited_by_count = EXCLUDED.cited_by_count,
                publication_date = EXCLUDED.publication_date,
                type = EXCLUDED.type,
                language = EXCLUDED.language,
                is_retracted = EXCLUDED.is_retracted,
                is_open_access = EXCLUDED.is_open_access,
                open_access_url = EXCLUDED.open_access_url,
                fwci = EXCLUDED.fwci,
                counts_by_year = EXCLUDED.counts_by_year,
                biblio = EXCLUDED.biblio,
                keywords = EXCLUDED.keywords,
                sustainable_development_goals = EXCLUDED.sustainable_development_goals,
                mesh = EXCLUDED.mesh,
                indexed_in = EXCLUDED.indexed_in,
                related_work_ids = EXCLUDED.related_work_ids,
                source_id = EXCLUDED.source_id,
                source_display_name = EXCLUDED.source_display_name,
                is_stub = FALSE,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&work.id)
        .bind(&work.title)
        .bind(&work.abstract_text)
        .bind(work.year)
        .bind(&work.doi)
        .bind(work.cited_by_count)
        .bind(work.publication_date)
        .bind(&work.work_type)
        .bind(&work.language)
        .bind(work.is_retracted)
        .bind(work.is_open_access)
        .bind(&work.open_access_url)
        .bind(work.fwci)
        .bind(&work.counts_by_year)
        .bind(&work.biblio)
        .bind(&work.keywords)
        .bind(&work.sustainable_development_goals)
        .bind(&work.mesh)
        .bind(&work.indexed_in)
        .bind(&work.related_work_ids)
        .bind(&work.source_id)
        .bind(&work.source_display_name)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn upsert_work_authors(&mut self, links: &[WorkAuthor]) -> Result<()> {
        for link in links {
            sqlx::query(
                r#"
                INSERT INTO work_authors (work_id, author_id, position, is_corresponding)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (work_id, author_id) DO UPDATE SET
                    position = EXCLUDED.position,
                    is_corresponding = EXCLUDED.is_corresponding
                "#,
            )
            .bind(&link.work_id)
            .bind(&link.author_id)
            .bind(link.position)
            .bind(link.is_corresponding)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_work_topics(&mut self, links: &[WorkTopic]) -> Result<()> {
        for link in links {
            sqlx::query(
                r#"
                INSERT INTO work_topics (work_id, topic_id, score, is_primary)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (work_id, topic_id) DO UPDATE SET
                    score = EXCLUDED.score,
                    is_primary = EXCLUDED.is_primary
                "#,
            )
            .bind(&link.work_id)
            .bind(&link.topic_id)
            .bind(link.score)
            .bind(link.is_primary)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn upsert_work_funders(&mut self, links: &[WorkFunder]) -> Result<()> {
        for link in links {
            sqlx::query(
                r#"
                INSERT INTO work_funders (work_id, funder_id, award_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (work_id, funder_id) DO UPDATE SET award_id = EXCLUDED.award_id
                "#,
            )
            .bind(&link.work_id)
            .bind(&link.funder_id)
            .bind(&link.award_id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn insert_author_institutions(&mut self, links: &[AuthorInstitution]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        let authors: Vec<&str> = links.iter().map(|l| l.author_id.as_str()).collect();
        let institutions: Vec<&str> = links.iter().map(|l| l.institution_id.as_str()).collect();
        sqlx::query(
            r#"
            INSERT INTO author_institutions (author_id, institution_id)
            SELECT * FROM UNNEST($1::text[], $2::text[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&authors)
        .bind(&institutions)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn insert_stub_works(&mut self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO works (id, title, is_stub, created_at, updated_at)
            SELECT id, $2, TRUE, $3, $3 FROM UNNEST($1::text[]) AS t(id)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(ids)
        .bind(STUB_TITLE)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<u64> {
        if edges.is_empty() {
            return Ok(0);
        }
        let citing: Vec<&str> = edges.iter().map(|e| e.citing_work_id.as_str()).collect();
        let cited: Vec<&str> = edges.iter().map(|e| e.cited_work_id.as_str()).collect();
        let result = sqlx::query(
            r#"
            INSERT INTO work_citations (citing_work_id, cited_work_id)
            SELECT * FROM UNNEST($1::text[], $2::text[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&citing)
        .bind(&cited)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn mark_citations_fetched(&mut self, work_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE works
            SET citations_fetched = TRUE, citations_claimed_at = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(work_id)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(Error::Database)
    }
}

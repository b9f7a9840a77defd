//! Ordered, transactional ingestion of provider work payloads.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use litgraph_core::{
    CitationEdge, Error, IngestSession, RawWork, Result, TopicLevel, WorkAuthor, WorkFunder,
    WorkRecord, WorkStore, WorkTopic,
};

use crate::extract::{extract_authors, extract_funders, extract_source, extract_topics, extract_work};

/// Keep the first item per key, preserving order.
pub(crate) fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

fn phase_error(work_id: &str, phase: &'static str, err: Error) -> Error {
    Error::Ingestion {
        work_id: work_id.to_string(),
        phase,
        message: err.to_string(),
    }
}

/// Writes one provider work and everything it references.
///
/// Each work is written in one [`IngestSession`]: if any phase fails the
/// session is dropped uncommitted and nothing of that work is visible.
/// Replaying the same payload converges on the same rows.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn WorkStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn WorkStore>) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, raw),
        fields(subsystem = "pipeline", component = "ingestor", op = "ingest_work", work_id = %raw.id)
    )]
    pub async fn ingest_work(&self, raw: &RawWork) -> Result<WorkRecord> {
        let start = Instant::now();
        let work = extract_work(raw);
        if work.id.is_empty() {
            return Err(Error::InvalidInput("work payload has no id".to_string()));
        }

        let mut session = self.store.begin().await?;
        self.write_phases(session.as_mut(), raw, &work).await?;
        session
            .commit()
            .await
            .map_err(|e| phase_error(&work.id, "commit", e))?;

        debug!(
            work_id = %work.id,
            references = work.referenced_works.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Work ingested"
        );
        Ok(work)
    }

    async fn write_phases(
        &self,
        session: &mut dyn IngestSession,
        raw: &RawWork,
        work: &WorkRecord,
    ) -> Result<()> {
        let id = work.id.as_str();
        let authors = extract_authors(raw);
        let topics = extract_topics(raw);
        let funders = extract_funders(raw);

        if let Some(source) = extract_source(raw) {
            session
                .upsert_sources(std::slice::from_ref(&source))
                .await
                .map_err(|e| phase_error(id, "sources", e))?;
        }

        let institutions = dedup_by_key(authors.institutions, |i| i.id.clone());
        session
            .upsert_institutions(&institutions)
            .await
            .map_err(|e| phase_error(id, "institutions", e))?;

        session
            .upsert_funders(&funders.funders)
            .await
            .map_err(|e| phase_error(id, "funders", e))?;

        for level in TopicLevel::ALL {
            let nodes = dedup_by_key(
                topics
                    .topics
                    .iter()
                    .filter(|t| t.level == level)
                    .cloned()
                    .collect(),
                |t| t.id.clone(),
            );
            if nodes.is_empty() {
                continue;
            }
            session
                .upsert_topics(&nodes)
                .await
                .map_err(|e| phase_error(id, "topics", e))?;
        }

        let author_rows = dedup_by_key(authors.authors, |a| a.id.clone());
        session
            .upsert_authors(&author_rows)
            .await
            .map_err(|e| phase_error(id, "authors", e))?;

        session
            .upsert_work(work)
            .await
            .map_err(|e| phase_error(id, "work", e))?;

        let work_authors: Vec<WorkAuthor> = dedup_by_key(authors.positions, |p| p.author_id.clone())
            .into_iter()
            .map(|p| WorkAuthor {
                work_id: id.to_string(),
                author_id: p.author_id,
                position: p.position,
                is_corresponding: p.is_corresponding,
            })
            .collect();
        let work_topics: Vec<WorkTopic> = topics
            .work_topics
            .into_iter()
            .map(|t| WorkTopic {
                work_id: id.to_string(),
                topic_id: t.topic_id,
                score: t.score,
                is_primary: t.is_primary,
            })
            .collect();
        let work_funders: Vec<WorkFunder> = dedup_by_key(funders.awards, |a| a.funder_id.clone())
            .into_iter()
            .map(|a| WorkFunder {
                work_id: id.to_string(),
                funder_id: a.funder_id,
                award_id: a.award_id,
            })
            .collect();
        let affiliations = dedup_by_key(authors.author_institutions, |l| l.clone());

        session
            .upsert_work_authors(&work_authors)
            .await
            .map_err(|e| phase_error(id, "work_authors", e))?;
        session
            .upsert_work_topics(&work_topics)
            .await
            .map_err(|e| phase_error(id, "work_topics", e))?;
        session
            .upsert_work_funders(&work_funders)
            .await
            .map_err(|e| phase_error(id, "work_funders", e))?;
        session
            .insert_author_institutions(&affiliations)
            .await
            .map_err(|e| phase_error(id, "author_institutions", e))?;

        let referenced = dedup_by_key(work.referenced_works.clone(), |r| r.clone());
        if !referenced.is_empty() {
            let stubs = session
                .insert_stub_works(&referenced)
                .await
                .map_err(|e| phase_error(id, "stubs", e))?;
            let edges: Vec<CitationEdge> = referenced
                .iter()
                .map(|cited| CitationEdge::new(id, cited.as_str()))
                .collect();
            let created = session
                .insert_citation_edges(&edges)
                .await
                .map_err(|e| phase_error(id, "citation_edges", e))?;
            debug!(work_id = %id, stubs, edges = created, "Reference stubs written");
        }

        Ok(())
    }

    /// Ingest works one at a time. Each work commits on its own; the first
    /// failure stops the run and is returned.
    #[instrument(
        skip(self, raws),
        fields(subsystem = "pipeline", component = "ingestor", op = "ingest_works", requested = raws.len())
    )]
    pub async fn ingest_works(&self, raws: &[RawWork]) -> Result<Vec<WorkRecord>> {
        let start = Instant::now();
        let mut ingested = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.ingest_work(raw).await {
                Ok(work) => ingested.push(work),
                Err(e) => {
                    warn!(
                        work_id = %raw.id,
                        ingested = ingested.len(),
                        error = %e,
                        "Batch ingestion stopped"
                    );
                    return Err(e);
                }
            }
        }
        info!(
            result_count = ingested.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Works ingested"
        );
        Ok(ingested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_by_key_keeps_first() {
        let items = vec![("a", 1), ("b", 2), ("a", 3)];
        let out = dedup_by_key(items, |(k, _)| *k);
        assert_eq!(out, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_phase_error_carries_phase() {
        let err = phase_error("W1", "topics", Error::Internal("boom".into()));
        match err {
            Error::Ingestion {
                work_id, phase, message,
            } => {
                assert_eq!(work_id, "W1");
                assert_eq!(phase, "topics");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

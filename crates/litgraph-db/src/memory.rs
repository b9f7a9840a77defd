//! In-memory work store for deterministic testing.
//!
//! Mirrors the PostgreSQL store's semantics: ingestion sessions stage their
//! writes and apply them atomically on commit, foreign keys are enforced in
//! write order, and enrichment claims are taken under a single lock.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use litgraph_db::{MemoryStore, WorkStore};
//!
//! let store = MemoryStore::new();
//! let mut session = store.begin().await?;
//! session.insert_stub_works(&["W1".to_string()]).await?;
//! session.commit().await?;
//! assert!(store.work("W1").unwrap().is_stub);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use litgraph_core::{
    new_v7, Author, AuthorInstitution, CitationEdge, CitationNeighbors, ClaimOutcome,
    CreateSearchCacheRequest, Error, Funder, IngestSession, Institution, Result,
    SearchCacheEntry, Source, Topic, Work, WorkAuthor, WorkAuthorSummary, WorkFunder,
    WorkRecord, WorkStore, WorkTopic, WorkTopicSummary, WorkWithRelations,
};

/// One staged write, recorded in commit order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Sources(Vec<Source>),
    Institutions(Vec<Institution>),
    Funders(Vec<Funder>),
    Topics(Vec<Topic>),
    Authors(Vec<Author>),
    Work(WorkRecord),
    WorkAuthors(Vec<WorkAuthor>),
    WorkTopics(Vec<WorkTopic>),
    WorkFunders(Vec<WorkFunder>),
    AuthorInstitutions(Vec<AuthorInstitution>),
    StubWorks(Vec<String>),
    CitationEdges(Vec<CitationEdge>),
    CitationsFetched(String),
}

impl StoreWrite {
    /// Short name of the write, used for failure injection and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreWrite::Sources(_) => "sources",
            StoreWrite::Institutions(_) => "institutions",
            StoreWrite::Funders(_) => "funders",
            StoreWrite::Topics(_) => "topics",
            StoreWrite::Authors(_) => "authors",
            StoreWrite::Work(_) => "work",
            StoreWrite::WorkAuthors(_) => "work_authors",
            StoreWrite::WorkTopics(_) => "work_topics",
            StoreWrite::WorkFunders(_) => "work_funders",
            StoreWrite::AuthorInstitutions(_) => "author_institutions",
            StoreWrite::StubWorks(_) => "stub_works",
            StoreWrite::CitationEdges(_) => "citation_edges",
            StoreWrite::CitationsFetched(_) => "citations_fetched",
        }
    }
}

#[derive(Debug, Clone)]
struct StoredWork {
    work: Work,
    claimed_at: Option<DateTime<Utc>>,
    hydrate_attempts: i32,
    hydrate_attempted_at: Option<DateTime<Utc>>,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    works: HashMap<String, StoredWork>,
    sources: HashMap<String, Source>,
    institutions: HashMap<String, Institution>,
    funders: HashMap<String, Funder>,
    authors: HashMap<String, Author>,
    topics: HashMap<String, Topic>,
    work_authors: BTreeMap<(String, String), WorkAuthor>,
    work_topics: BTreeMap<(String, String), WorkTopic>,
    work_funders: BTreeMap<(String, String), WorkFunder>,
    author_institutions: BTreeSet<(String, String)>,
    citations: BTreeSet<CitationEdge>,
    search_cache: HashMap<Uuid, SearchCacheEntry>,
    next_seq: u64,
}

fn missing(table: &str, id: &str) -> Error {
    Error::Internal(format!("foreign key violation: {table} {id} does not exist"))
}

impl MemoryState {
    fn require_work(&self, id: &str) -> Result<()> {
        if self.works.contains_key(id) {
            Ok(())
        } else {
            Err(missing("work", id))
        }
    }

    fn insert_work(&mut self, work: Work) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.works.insert(
            work.id.clone(),
            StoredWork {
                work,
                claimed_at: None,
                hydrate_attempts: 0,
                hydrate_attempted_at: None,
                seq,
            },
        );
    }

    fn apply(&mut self, write: &StoreWrite, now: DateTime<Utc>) -> Result<()> {
        match write {
            StoreWrite::Sources(rows) => {
                for s in rows {
                    self.sources.insert(s.id.clone(), s.clone());
                }
            }
            StoreWrite::Institutions(rows) => {
                for i in rows {
                    self.institutions.insert(i.id.clone(), i.clone());
                }
            }
            StoreWrite::Funders(rows) => {
                for f in rows {
                    self.funders.insert(f.id.clone(), f.clone());
                }
            }
            StoreWrite::Topics(rows) => {
                for t in rows {
                    if let Some(parent) = &t.parent_topic_id {
                        if !self.topics.contains_key(parent) {
                            return Err(missing("topic", parent));
                        }
                    }
                    let mut topic = t.clone();
                    if topic.parent_topic_id.is_none() {
                        topic.parent_topic_id = self
                            .topics
                            .get(&t.id)
                            .and_then(|existing| existing.parent_topic_id.clone());
                    }
                    self.topics.insert(t.id.clone(), topic);
                }
            }
            StoreWrite::Authors(rows) => {
                for a in rows {
                    self.authors.insert(a.id.clone(), a.clone());
                }
            }
            StoreWrite::Work(record) => {
                if let Some(source_id) = &record.source_id {
                    if !self.sources.contains_key(source_id) {
                        return Err(missing("source", source_id));
                    }
                }
                match self.works.get_mut(&record.id) {
                    Some(stored) => stored.work.apply_record(record, now),
                    None => self.insert_work(Work::from_record(record, now)),
                }
            }
            StoreWrite::WorkAuthors(rows) => {
                for l in rows {
                    self.require_work(&l.work_id)?;
                    if !self.authors.contains_key(&l.author_id) {
                        return Err(missing("author", &l.author_id));
                    }
                    self.work_authors
                        .insert((l.work_id.clone(), l.author_id.clone()), l.clone());
                }
            }
            StoreWrite::WorkTopics(rows) => {
                for l in rows {
                    self.require_work(&l.work_id)?;
                    if !self.topics.contains_key(&l.topic_id) {
                        return Err(missing("topic", &l.topic_id));
                    }
                    self.work_topics
                        .insert((l.work_id.clone(), l.topic_id.clone()), l.clone());
                }
            }
            StoreWrite::WorkFunders(rows) => {
                for l in rows {
                    self.require_work(&l.work_id)?;
                    if !self.funders.contains_key(&l.funder_id) {
                        return Err(missing("funder", &l.funder_id));
                    }
                    self.work_funders
                        .insert((l.work_id.clone(), l.funder_id.clone()), l.clone());
                }
            }
            StoreWrite::AuthorInstitutions(rows) => {
                for l in rows {
                    if !self.authors.contains_key(&l.author_id) {
                        return Err(missing("author", &l.author_id));
                    }
                    if !self.institutions.contains_key(&l.institution_id) {
                        return Err(missing("institution", &l.institution_id));
                    }
                    self.author_institutions
                        .insert((l.author_id.clone(), l.institution_id.clone()));
                }
            }
            StoreWrite::StubWorks(ids) => {
                for id in ids {
                    if !self.works.contains_key(id) {
                        self.insert_work(Work::stub(id.clone(), now));
                    }
                }
            }
            StoreWrite::CitationEdges(edges) => {
                for e in edges {
                    self.require_work(&e.citing_work_id)?;
                    self.require_work(&e.cited_work_id)?;
                    self.citations.insert(e.clone());
                }
            }
            StoreWrite::CitationsFetched(id) => {
                if let Some(stored) = self.works.get_mut(id) {
                    stored.work.citations_fetched = true;
                    stored.work.updated_at = now;
                    stored.claimed_at = None;
                }
            }
        }
        Ok(())
    }

    fn with_relations(&self, id: &str) -> Option<WorkWithRelations> {
        let stored = self.works.get(id)?;

        let mut authors: Vec<WorkAuthorSummary> = self
            .work_authors
            .values()
            .filter(|l| l.work_id == id)
            .filter_map(|l| {
                let a = self.authors.get(&l.author_id)?;
                Some(WorkAuthorSummary {
                    id: a.id.clone(),
                    display_name: a.display_name.clone(),
                    orcid: a.orcid.clone(),
                    position: l.position,
                    is_corresponding: l.is_corresponding,
                })
            })
            .collect();
        authors.sort_by_key(|a| a.position);

        let mut topics: Vec<WorkTopicSummary> = self
            .work_topics
            .values()
            .filter(|l| l.work_id == id)
            .filter_map(|l| {
                let t = self.topics.get(&l.topic_id)?;
                Some(WorkTopicSummary {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    level: t.level,
                    score: l.score,
                    is_primary: l.is_primary,
                })
            })
            .collect();
        topics.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        Some(WorkWithRelations {
            work: stored.work.clone(),
            authors,
            topics,
        })
    }
}

/// In-memory implementation of [`WorkStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    write_log: Arc<Mutex<Vec<StoreWrite>>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every session fail when it stages a write of this kind
    /// (see [`StoreWrite::kind`]), or at commit with `"commit"`.
    pub fn fail_on(&self, kind: &'static str) {
        *lock(&self.fail_on) = Some(kind);
    }

    pub fn clear_failure(&self) {
        *lock(&self.fail_on) = None;
    }

    /// Every committed write, in commit order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        lock(&self.write_log).clone()
    }

    pub fn clear_writes(&self) {
        lock(&self.write_log).clear();
    }

    pub fn work(&self, id: &str) -> Option<Work> {
        lock(&self.state).works.get(id).map(|s| s.work.clone())
    }

    pub fn work_count(&self) -> usize {
        lock(&self.state).works.len()
    }

    pub fn topic(&self, id: &str) -> Option<Topic> {
        lock(&self.state).topics.get(id).cloned()
    }

    pub fn topic_count(&self) -> usize {
        lock(&self.state).topics.len()
    }

    pub fn author(&self, id: &str) -> Option<Author> {
        lock(&self.state).authors.get(id).cloned()
    }

    pub fn source(&self, id: &str) -> Option<Source> {
        lock(&self.state).sources.get(id).cloned()
    }

    pub fn funder(&self, id: &str) -> Option<Funder> {
        lock(&self.state).funders.get(id).cloned()
    }

    pub fn citation_edges(&self) -> Vec<CitationEdge> {
        lock(&self.state).citations.iter().cloned().collect()
    }

    pub fn work_topics(&self, work_id: &str) -> Vec<WorkTopic> {
        lock(&self.state)
            .work_topics
            .values()
            .filter(|l| l.work_id == work_id)
            .cloned()
            .collect()
    }

    pub fn work_funders(&self, work_id: &str) -> Vec<WorkFunder> {
        lock(&self.state)
            .work_funders
            .values()
            .filter(|l| l.work_id == work_id)
            .cloned()
            .collect()
    }

    pub fn author_institutions(&self) -> Vec<AuthorInstitution> {
        lock(&self.state)
            .author_institutions
            .iter()
            .map(|(a, i)| AuthorInstitution {
                author_id: a.clone(),
                institution_id: i.clone(),
            })
            .collect()
    }

    /// Backdate a cache entry's refresh time.
    pub fn set_cache_refreshed_at(&self, id: Uuid, refreshed_at: DateTime<Utc>) {
        if let Some(entry) = lock(&self.state).search_cache.get_mut(&id) {
            entry.refreshed_at = refreshed_at;
        }
    }

    /// Hydration attempts recorded against a work.
    pub fn hydrate_attempts(&self, work_id: &str) -> Option<i32> {
        lock(&self.state)
            .works
            .get(work_id)
            .map(|s| s.hydrate_attempts)
    }

    /// Backdate an enrichment claim.
    pub fn set_claimed_at(&self, work_id: &str, claimed_at: Option<DateTime<Utc>>) {
        if let Some(stored) = lock(&self.state).works.get_mut(work_id) {
            stored.claimed_at = claimed_at;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Staged session over a [`MemoryStore`].
pub struct MemorySession {
    store: MemoryStore,
    staged: Vec<StoreWrite>,
    staged_works: HashSet<String>,
    staged_edges: HashSet<CitationEdge>,
}

impl MemorySession {
    fn stage(&mut self, write: StoreWrite) -> Result<()> {
        if *lock(&self.store.fail_on) == Some(write.kind()) {
            return Err(Error::Internal(format!("injected failure on {}", write.kind())));
        }
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl IngestSession for MemorySession {
    async fn upsert_sources(&mut self, sources: &[Source]) -> Result<()> {
        self.stage(StoreWrite::Sources(sources.to_vec()))
    }

    async fn upsert_institutions(&mut self, institutions: &[Institution]) -> Result<()> {
        self.stage(StoreWrite::Institutions(institutions.to_vec()))
    }

    async fn upsert_funders(&mut self, funders: &[Funder]) -> Result<()> {
        self.stage(StoreWrite::Funders(funders.to_vec()))
    }

    async fn upsert_topics(&mut self, topics: &[Topic]) -> Result<()> {
        self.stage(StoreWrite::Topics(topics.to_vec()))
    }

    async fn upsert_authors(&mut self, authors: &[Author]) -> Result<()> {
        self.stage(StoreWrite::Authors(authors.to_vec()))
    }

    async fn upsert_work(&mut self, work: &WorkRecord) -> Result<()> {
        self.stage(StoreWrite::Work(work.clone()))?;
        self.staged_works.insert(work.id.clone());
        Ok(())
    }

    async fn upsert_work_authors(&mut self, links: &[WorkAuthor]) -> Result<()> {
        self.stage(StoreWrite::WorkAuthors(links.to_vec()))
    }

    async fn upsert_work_topics(&mut self, links: &[WorkTopic]) -> Result<()> {
        self.stage(StoreWrite::WorkTopics(links.to_vec()))
    }

    async fn upsert_work_funders(&mut self, links: &[WorkFunder]) -> Result<()> {
        self.stage(StoreWrite::WorkFunders(links.to_vec()))
    }

    async fn insert_author_institutions(&mut self, links: &[AuthorInstitution]) -> Result<()> {
        self.stage(StoreWrite::AuthorInstitutions(links.to_vec()))
    }

    async fn insert_stub_works(&mut self, ids: &[String]) -> Result<u64> {
        self.stage(StoreWrite::StubWorks(ids.to_vec()))?;
        let state = lock(&self.store.state);
        let mut created = 0;
        for id in ids {
            if !state.works.contains_key(id) && self.staged_works.insert(id.clone()) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<u64> {
        self.stage(StoreWrite::CitationEdges(edges.to_vec()))?;
        let state = lock(&self.store.state);
        let mut created = 0;
        for edge in edges {
            if !state.citations.contains(edge) && self.staged_edges.insert(edge.clone()) {
                created += 1;
            }
        }
        Ok(created)
    }

    async fn mark_citations_fetched(&mut self, work_id: &str) -> Result<()> {
        self.stage(StoreWrite::CitationsFetched(work_id.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if *lock(&self.store.fail_on) == Some("commit") {
            return Err(Error::Internal("injected failure on commit".to_string()));
        }

        let now = Utc::now();
        let mut state = lock(&self.store.state);
        let mut next = state.clone();
        for write in &self.staged {
            next.apply(write, now)?;
        }
        *state = next;
        lock(&self.store.write_log).extend(self.staged.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl WorkStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn IngestSession>> {
        Ok(Box::new(MemorySession {
            store: self.clone(),
            staged: Vec::new(),
            staged_works: HashSet::new(),
            staged_edges: HashSet::new(),
        }))
    }

    async fn get_work(&self, id: &str) -> Result<Option<Work>> {
        Ok(self.work(id))
    }

    async fn get_work_with_relations(&self, id: &str) -> Result<Option<WorkWithRelations>> {
        Ok(lock(&self.state).with_relations(id))
    }

    async fn get_works_with_relations(&self, ids: &[String]) -> Result<Vec<WorkWithRelations>> {
        let state = lock(&self.state);
        Ok(ids.iter().filter_map(|id| state.with_relations(id)).collect())
    }

    async fn filter_stub_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        let state = lock(&self.state);
        Ok(ids
            .iter()
            .filter(|id| state.works.get(*id).is_some_and(|s| s.work.is_stub))
            .cloned()
            .collect())
    }

    async fn list_stub_ids(&self, limit: i64, max_attempts: i32) -> Result<Vec<String>> {
        let state = lock(&self.state);
        let mut stubs: Vec<&StoredWork> = state
            .works
            .values()
            .filter(|s| s.work.is_stub && s.hydrate_attempts < max_attempts)
            .collect();
        // None sorts before Some, matching NULLS FIRST.
        stubs.sort_by_key(|s| (s.hydrate_attempted_at, s.seq));
        Ok(stubs
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|s| s.work.id.clone())
            .collect())
    }

    async fn record_hydration_attempts(
        &self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = lock(&self.state);
        let mut updated = 0;
        for id in ids {
            if let Some(stored) = state.works.get_mut(id).filter(|s| s.work.is_stub) {
                stored.hydrate_attempts += 1;
                stored.hydrate_attempted_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn citation_neighbors(&self, id: &str) -> Result<CitationNeighbors> {
        let state = lock(&self.state);
        Ok(CitationNeighbors {
            references: state
                .citations
                .iter()
                .filter(|e| e.citing_work_id == id)
                .map(|e| e.cited_work_id.clone())
                .collect(),
            cited_by: state
                .citations
                .iter()
                .filter(|e| e.cited_work_id == id)
                .map(|e| e.citing_work_id.clone())
                .collect(),
        })
    }

    async fn claim_citation_fetch(
        &self,
        id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let mut state = lock(&self.state);
        let Some(stored) = state.works.get_mut(id) else {
            return Ok(ClaimOutcome::NotFound);
        };
        if stored.work.citations_fetched {
            return Ok(ClaimOutcome::AlreadyFetched);
        }
        match stored.claimed_at {
            Some(at) if at >= now - lease => Ok(ClaimOutcome::InProgress),
            _ => {
                stored.claimed_at = Some(now);
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn release_citation_claim(&self, id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        if let Some(stored) = lock(&self.state).works.get_mut(id) {
            if stored.claimed_at == Some(claimed_at) {
                stored.claimed_at = None;
            }
        }
        Ok(())
    }

    async fn find_search_cache(&self, query_hash: &str) -> Result<Option<SearchCacheEntry>> {
        Ok(lock(&self.state)
            .search_cache
            .values()
            .find(|e| e.query_hash == query_hash)
            .cloned())
    }

    async fn get_search_cache(&self, id: Uuid) -> Result<Option<SearchCacheEntry>> {
        Ok(lock(&self.state).search_cache.get(&id).cloned())
    }

    async fn insert_search_cache(&self, req: CreateSearchCacheRequest) -> Result<SearchCacheEntry> {
        let mut state = lock(&self.state);
        if let Some(existing) = state
            .search_cache
            .values_mut()
            .find(|e| e.query_hash == req.query_hash)
        {
            existing.work_ids = req.work_ids;
            existing.result_count = req.result_count;
            existing.refreshed_at = req.refreshed_at;
            return Ok(existing.clone());
        }

        let entry = SearchCacheEntry {
            id: new_v7(),
            query_hash: req.query_hash,
            query: req.query,
            from_year: req.from_year,
            to_year: req.to_year,
            sort: req.sort,
            work_ids: req.work_ids,
            result_count: req.result_count,
            refreshed_at: req.refreshed_at,
        };
        state.search_cache.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn refresh_search_cache(
        &self,
        id: Uuid,
        work_ids: &[String],
        result_count: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Result<SearchCacheEntry> {
        let mut state = lock(&self.state);
        let entry = state
            .search_cache
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("search cache entry {id}")))?;
        entry.work_ids = work_ids.to_vec();
        entry.result_count = result_count;
        entry.refreshed_at = refreshed_at;
        Ok(entry.clone())
    }
}

//! Core data models for litgraph.
//!
//! Normalized entity records produced by extraction and persisted by the
//! store, plus the read-side shapes returned to callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// WORK TYPES
// =============================================================================

/// A normalized full work, ready to be written with overwrite semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub cited_by_count: i64,
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub is_retracted: bool,
    pub is_open_access: bool,
    pub open_access_url: Option<String>,
    pub fwci: Option<f64>,
    pub counts_by_year: Option<JsonValue>,
    pub biblio: Option<JsonValue>,
    pub keywords: Option<JsonValue>,
    pub sustainable_development_goals: Option<JsonValue>,
    pub mesh: Option<JsonValue>,
    pub indexed_in: Option<JsonValue>,
    pub related_work_ids: Option<Vec<String>>,
    pub source_id: Option<String>,
    pub source_display_name: Option<String>,
    /// Works this record cites. Drives stub + edge creation; not a column.
    #[serde(skip)]
    pub referenced_works: Vec<String>,
}

/// A work row as stored, full or stub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub cited_by_count: i64,
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub is_retracted: bool,
    pub is_open_access: bool,
    pub open_access_url: Option<String>,
    pub fwci: Option<f64>,
    pub counts_by_year: Option<JsonValue>,
    pub biblio: Option<JsonValue>,
    pub keywords: Option<JsonValue>,
    pub sustainable_development_goals: Option<JsonValue>,
    pub mesh: Option<JsonValue>,
    pub indexed_in: Option<JsonValue>,
    pub related_work_ids: Option<Vec<String>>,
    pub source_id: Option<String>,
    pub source_display_name: Option<String>,
    pub is_stub: bool,
    pub citations_fetched: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Work {
    /// Placeholder row created as a citation-edge endpoint.
    pub fn stub(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: crate::defaults::STUB_TITLE.to_string(),
            abstract_text: None,
            year: None,
            doi: None,
            cited_by_count: 0,
            publication_date: None,
            work_type: None,
            language: None,
            is_retracted: false,
            is_open_access: false,
            open_access_url: None,
            fwci: None,
            counts_by_year: None,
            biblio: None,
            keywords: None,
            sustainable_development_goals: None,
            mesh: None,
            indexed_in: None,
            related_work_ids: None,
            source_id: None,
            source_display_name: None,
            is_stub: true,
            citations_fetched: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every data column from a full record, keeping bookkeeping.
    ///
    /// `citations_fetched` and `created_at` survive re-ingestion.
    pub fn apply_record(&mut self, record: &WorkRecord, now: DateTime<Utc>) {
        self.title = record.title.clone();
        self.abstract_text = record.abstract_text.clone();
        self.year = record.year;
        self.doi = record.doi.clone();
        self.cited_by_count = record.cited_by_count;
        self.publication_date = record.publication_date;
        self.work_type = record.work_type.clone();
        self.language = record.language.clone();
        self.is_retracted = record.is_retracted;
        self.is_open_access = record.is_open_access;
        self.open_access_url = record.open_access_url.clone();
        self.fwci = record.fwci;
        self.counts_by_year = record.counts_by_year.clone();
        self.biblio = record.biblio.clone();
        self.keywords = record.keywords.clone();
        self.sustainable_development_goals = record.sustainable_development_goals.clone();
        self.mesh = record.mesh.clone();
        self.indexed_in = record.indexed_in.clone();
        self.related_work_ids = record.related_work_ids.clone();
        self.source_id = record.source_id.clone();
        self.source_display_name = record.source_display_name.clone();
        self.is_stub = false;
        self.updated_at = now;
    }

    /// Build a fresh full row from a record.
    pub fn from_record(record: &WorkRecord, now: DateTime<Utc>) -> Self {
        let mut work = Self::stub(record.id.clone(), now);
        work.apply_record(record, now);
        work
    }
}

/// Author as listed on a work, in authorship order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkAuthorSummary {
    pub id: String,
    pub display_name: String,
    pub orcid: Option<String>,
    pub position: i32,
    pub is_corresponding: bool,
}

/// Topic attached to a work with its association score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkTopicSummary {
    pub id: String,
    pub name: String,
    pub level: TopicLevel,
    pub score: f64,
    pub is_primary: bool,
}

/// A work with its authors (by position) and topics (by score, descending).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkWithRelations {
    #[serde(flatten)]
    pub work: Work,
    pub authors: Vec<WorkAuthorSummary>,
    pub topics: Vec<WorkTopicSummary>,
}

/// Ids on either side of a work in the citation graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CitationNeighbors {
    /// Works this work cites.
    pub references: Vec<String>,
    /// Works citing this work.
    pub cited_by: Vec<String>,
}

// =============================================================================
// SECONDARY ENTITIES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub id: String,
    pub display_name: String,
    pub orcid: Option<String>,
    pub cited_by_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Institution {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub institution_type: Option<String>,
    pub country_code: Option<String>,
    pub ror_id: Option<String>,
}

/// Publication venue (journal, repository, conference).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
    pub issn: Option<JsonValue>,
    pub is_oa: bool,
    pub homepage_url: Option<String>,
    pub host_organization_name: Option<String>,
    pub apc_usd: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Funder {
    pub id: String,
    pub name: String,
    pub country_code: Option<String>,
}

// =============================================================================
// TOPIC HIERARCHY
// =============================================================================

/// Level in the fixed domain → field → subfield → topic hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum TopicLevel {
    Domain = 0,
    Field = 1,
    Subfield = 2,
    Topic = 3,
}

impl TopicLevel {
    /// All levels, parents first.
    pub const ALL: [TopicLevel; 4] = [
        TopicLevel::Domain,
        TopicLevel::Field,
        TopicLevel::Subfield,
        TopicLevel::Topic,
    ];

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// The level a parent of this level lives at.
    pub fn parent(self) -> Option<TopicLevel> {
        match self {
            TopicLevel::Domain => None,
            TopicLevel::Field => Some(TopicLevel::Domain),
            TopicLevel::Subfield => Some(TopicLevel::Field),
            TopicLevel::Topic => Some(TopicLevel::Subfield),
        }
    }
}

impl From<TopicLevel> for i16 {
    fn from(level: TopicLevel) -> Self {
        level.as_i16()
    }
}

impl TryFrom<i16> for TopicLevel {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TopicLevel::Domain),
            1 => Ok(TopicLevel::Field),
            2 => Ok(TopicLevel::Subfield),
            3 => Ok(TopicLevel::Topic),
            other => Err(Error::InvalidInput(format!("topic level {other}"))),
        }
    }
}

/// A node of the topic hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub level: TopicLevel,
    pub parent_topic_id: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<JsonValue>,
    pub works_count: i64,
}

// =============================================================================
// LINK ROWS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkAuthor {
    pub work_id: String,
    pub author_id: String,
    pub position: i32,
    pub is_corresponding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkTopic {
    pub work_id: String,
    pub topic_id: String,
    pub score: f64,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkFunder {
    pub work_id: String,
    pub funder_id: String,
    pub award_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuthorInstitution {
    pub author_id: String,
    pub institution_id: String,
}

/// Directed citation edge: `citing_work_id` cites `cited_work_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CitationEdge {
    pub citing_work_id: String,
    pub cited_work_id: String,
}

impl CitationEdge {
    pub fn new(citing: impl Into<String>, cited: impl Into<String>) -> Self {
        Self {
            citing_work_id: citing.into(),
            cited_work_id: cited.into(),
        }
    }
}

// =============================================================================
// EXTRACTION OUTPUT
// =============================================================================

/// An author's place on a work, before the work id is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorPosition {
    pub author_id: String,
    pub position: i32,
    pub is_corresponding: bool,
}

/// A topic association's score, before the work id is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicScore {
    pub topic_id: String,
    pub score: f64,
    pub is_primary: bool,
}

/// A grant's funder and award, before the work id is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunderAward {
    pub funder_id: String,
    pub award_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedAuthors {
    pub authors: Vec<Author>,
    pub positions: Vec<AuthorPosition>,
    pub institutions: Vec<Institution>,
    pub author_institutions: Vec<AuthorInstitution>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedTopics {
    /// Every distinct hierarchy node seen, in discovery order.
    pub topics: Vec<Topic>,
    pub work_topics: Vec<TopicScore>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFunders {
    pub funders: Vec<Funder>,
    pub awards: Vec<FunderAward>,
}

// =============================================================================
// ENRICHMENT
// =============================================================================

/// Result of trying to claim a work for citation enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// This caller holds the claim and must fetch.
    Claimed,
    /// Citations were already fetched for this work.
    AlreadyFetched,
    /// Another caller holds an unexpired claim.
    InProgress,
    /// No such work in the store.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichStatus {
    Enriched,
    AlreadyFetched,
    InProgress,
    NotFound,
}

/// Counts of citation edges written by one enrichment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichOutcome {
    pub status: EnrichStatus,
    pub references: usize,
    pub cited_by: usize,
}

impl EnrichOutcome {
    /// A zero-effect outcome.
    pub fn skipped(status: EnrichStatus) -> Self {
        Self {
            status,
            references: 0,
            cited_by: 0,
        }
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Sort order for provider search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    #[default]
    Relevance,
    CitedByCount,
    Newest,
    Oldest,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Relevance => "relevance",
            SearchSort::CitedByCount => "cited_by_count",
            SearchSort::Newest => "newest",
            SearchSort::Oldest => "oldest",
        }
    }

    /// Whether results under this sort drift as new works are published.
    pub fn is_time_sensitive(&self) -> bool {
        matches!(self, SearchSort::Newest)
    }
}

impl fmt::Display for SearchSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(SearchSort::Relevance),
            "cited_by_count" => Ok(SearchSort::CitedByCount),
            "newest" => Ok(SearchSort::Newest),
            "oldest" => Ok(SearchSort::Oldest),
            other => Err(Error::InvalidInput(format!("unknown sort: {other}"))),
        }
    }
}

/// A provider search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub sort: Option<SearchSort>,
}

impl SearchRequest {
    /// First page with the default page size.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            per_page: crate::defaults::SEARCH_PER_PAGE,
            from_year: None,
            to_year: None,
            sort: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_years(mut self, from_year: Option<i32>, to_year: Option<i32>) -> Self {
        self.from_year = from_year;
        self.to_year = to_year;
        self
    }

    pub fn with_sort(mut self, sort: SearchSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// One page of provider search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<crate::payload::RawWork>,
    pub total_count: i64,
}

/// Search results as served to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<WorkWithRelations>,
    pub count: i64,
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<Uuid>,
    pub from_cache: bool,
}

// =============================================================================
// QUERY CACHE
// =============================================================================

/// A cached provider search: ordered result ids for one effective filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCacheEntry {
    pub id: Uuid,
    pub query_hash: String,
    pub query: String,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub sort: Option<String>,
    pub work_ids: Vec<String>,
    pub result_count: i64,
    pub refreshed_at: DateTime<Utc>,
}

/// Request for creating a search cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSearchCacheRequest {
    pub query_hash: String,
    pub query: String,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub sort: Option<String>,
    pub work_ids: Vec<String>,
    pub result_count: i64,
    pub refreshed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_level_ordering() {
        assert!(TopicLevel::Domain < TopicLevel::Field);
        assert!(TopicLevel::Subfield < TopicLevel::Topic);
        assert_eq!(TopicLevel::Topic.parent(), Some(TopicLevel::Subfield));
        assert_eq!(TopicLevel::Domain.parent(), None);
    }

    #[test]
    fn test_topic_level_serializes_as_integer() {
        let json = serde_json::to_string(&TopicLevel::Subfield).unwrap();
        assert_eq!(json, "2");
        let level: TopicLevel = serde_json::from_str("1").unwrap();
        assert_eq!(level, TopicLevel::Field);
        assert!(serde_json::from_str::<TopicLevel>("7").is_err());
    }

    #[test]
    fn test_stub_defaults() {
        let now = Utc::now();
        let stub = Work::stub("W9", now);
        assert!(stub.is_stub);
        assert!(!stub.citations_fetched);
        assert_eq!(stub.title, "Unknown");
    }

    #[test]
    fn test_apply_record_upgrades_stub_and_keeps_flag() {
        let now = Utc::now();
        let mut work = Work::stub("W9", now);
        work.citations_fetched = true;
        let record = WorkRecord {
            id: "W9".into(),
            title: "Attention Is All You Need".into(),
            year: Some(2017),
            ..Default::default()
        };
        work.apply_record(&record, now);
        assert!(!work.is_stub);
        assert!(work.citations_fetched);
        assert_eq!(work.year, Some(2017));
    }

    #[test]
    fn test_sort_parse_roundtrip() {
        for sort in [
            SearchSort::Relevance,
            SearchSort::CitedByCount,
            SearchSort::Newest,
            SearchSort::Oldest,
        ] {
            assert_eq!(sort.as_str().parse::<SearchSort>().unwrap(), sort);
        }
        assert!("sideways".parse::<SearchSort>().is_err());
        assert!(SearchSort::Newest.is_time_sensitive());
        assert!(!SearchSort::CitedByCount.is_time_sensitive());
    }

    #[test]
    fn test_work_serializes_abstract_key() {
        let work = Work::stub("W1", Utc::now());
        let json = serde_json::to_value(&work).unwrap();
        assert!(json.get("abstract").is_some());
        assert!(json.get("type").is_some());
    }
}

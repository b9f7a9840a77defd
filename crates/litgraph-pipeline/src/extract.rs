//! Pure extraction from provider payloads to normalized entity records.
//!
//! Every function here is total: any well-formed [`RawWork`], however sparse,
//! produces a result, with documented defaults for missing fields.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use litgraph_core::defaults::{UNKNOWN_NAME, UNTITLED};
use litgraph_core::{
    normalize_id, Author, AuthorInstitution, AuthorPosition, ExtractedAuthors, ExtractedFunders,
    ExtractedTopics, Funder, FunderAward, Institution, RawGrantFunder, RawTopicLevel, RawWork,
    Source, Topic, TopicLevel, TopicScore, WorkRecord,
};

/// Rebuild abstract text from a `{word: [positions]}` inverted index.
///
/// Words are ordered by position and joined with single spaces. Ties on a
/// position keep the index's key order. An absent or empty index yields `None`.
pub fn reconstruct_abstract<'a, I>(index: Option<I>) -> Option<String>
where
    I: IntoIterator<Item = (&'a String, &'a Vec<u32>)>,
{
    let mut words: Vec<(u32, &str)> = index?
        .into_iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by_key(|(pos, _)| *pos);
    Some(
        words
            .into_iter()
            .map(|(_, w)| w)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn normalize_opt(id: Option<&str>) -> Option<String> {
    id.map(normalize_id).filter(|id| !id.is_empty())
}

/// Normalize the work row itself.
pub fn extract_work(raw: &RawWork) -> WorkRecord {
    let open_access = raw.open_access.as_ref();
    let location = raw.primary_location.as_ref();

    let is_open_access = open_access.and_then(|oa| oa.is_oa).unwrap_or(false);
    let open_access_url = open_access
        .and_then(|oa| oa.oa_url.clone())
        .or_else(|| {
            location
                .filter(|loc| loc.is_oa.unwrap_or(false))
                .and_then(|loc| loc.pdf_url.clone().or_else(|| loc.landing_page_url.clone()))
        });

    let source = location.and_then(|loc| loc.source.as_ref());

    WorkRecord {
        id: normalize_id(&raw.id),
        title: raw.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
        abstract_text: reconstruct_abstract(raw.abstract_inverted_index.as_ref()),
        year: raw.publication_year,
        doi: raw.doi.clone(),
        cited_by_count: raw.cited_by_count.unwrap_or(0),
        publication_date: parse_date(raw.publication_date.as_deref()),
        work_type: raw.work_type.clone(),
        language: raw.language.clone(),
        is_retracted: raw.is_retracted.unwrap_or(false),
        is_open_access,
        open_access_url,
        fwci: raw.fwci,
        counts_by_year: raw.counts_by_year.clone(),
        biblio: raw.biblio.clone(),
        keywords: raw.keywords.clone(),
        sustainable_development_goals: raw.sustainable_development_goals.clone(),
        mesh: raw.mesh.clone(),
        indexed_in: raw.indexed_in.clone(),
        related_work_ids: (!raw.related_works.is_empty())
            .then(|| raw.related_works.iter().map(|r| normalize_id(r)).collect()),
        source_id: source.and_then(|s| normalize_opt(s.id.as_deref())),
        source_display_name: source.and_then(|s| s.display_name.clone()),
        referenced_works: raw
            .referenced_works
            .iter()
            .map(|r| normalize_id(r))
            .filter(|r| !r.is_empty())
            .collect(),
    }
}

/// Authors in authorship order, their institutions and affiliation pairs.
///
/// Authorships without an author id are skipped; `position` is still the
/// index in the provider's authorship list.
pub fn extract_authors(raw: &RawWork) -> ExtractedAuthors {
    let mut out = ExtractedAuthors::default();

    for (position, authorship) in raw.authorships.iter().enumerate() {
        let Some(author) = authorship.author.as_ref() else {
            continue;
        };
        let Some(author_id) = normalize_opt(author.id.as_deref()) else {
            continue;
        };

        out.authors.push(Author {
            id: author_id.clone(),
            display_name: author
                .display_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            orcid: author.orcid.clone(),
            cited_by_count: author.cited_by_count.unwrap_or(0),
        });
        out.positions.push(AuthorPosition {
            author_id: author_id.clone(),
            position: position as i32,
            is_corresponding: authorship.is_corresponding.unwrap_or(false),
        });

        for inst in &authorship.institutions {
            let Some(inst_id) = normalize_opt(inst.id.as_deref()) else {
                continue;
            };
            out.institutions.push(Institution {
                id: inst_id.clone(),
                name: inst
                    .display_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                institution_type: inst.institution_type.clone(),
                country_code: inst.country_code.clone(),
                ror_id: inst.ror.clone(),
            });
            out.author_institutions.push(AuthorInstitution {
                author_id: author_id.clone(),
                institution_id: inst_id,
            });
        }
    }

    out
}

fn hierarchy_node(
    level: &RawTopicLevel,
    topic_level: TopicLevel,
    parent: Option<&str>,
) -> Option<Topic> {
    let id = normalize_opt(level.id.as_deref())?;
    Some(Topic {
        id,
        name: level
            .display_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        level: topic_level,
        parent_topic_id: parent.map(str::to_string),
        description: None,
        keywords: None,
        works_count: 0,
    })
}

/// Topic hierarchy nodes and the work's topic associations.
///
/// Each association contributes its domain, field, subfield and the topic
/// itself; every distinct node id is emitted once. A node's parent is the
/// id at the level above when the payload carries one. The first
/// association is primary.
pub fn extract_topics(raw: &RawWork) -> ExtractedTopics {
    let mut out = ExtractedTopics::default();
    let mut seen: HashSet<String> = HashSet::new();

    for raw_topic in &raw.topics {
        let Some(topic_id) = normalize_opt(raw_topic.id.as_deref()) else {
            continue;
        };
        if !seen.insert(topic_id.clone()) {
            continue;
        }

        let mut parent: Option<String> = None;
        let chain = [
            (raw_topic.domain.as_ref(), TopicLevel::Domain),
            (raw_topic.field.as_ref(), TopicLevel::Field),
            (raw_topic.subfield.as_ref(), TopicLevel::Subfield),
        ];
        for (node, level) in chain {
            let Some(node) = node.and_then(|n| hierarchy_node(n, level, parent.as_deref())) else {
                parent = None;
                continue;
            };
            parent = Some(node.id.clone());
            if seen.insert(node.id.clone()) {
                out.topics.push(node);
            }
        }

        out.topics.push(Topic {
            id: topic_id.clone(),
            name: raw_topic
                .display_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            level: TopicLevel::Topic,
            parent_topic_id: parent,
            description: raw_topic.description.clone(),
            keywords: raw_topic.keywords.clone(),
            works_count: raw_topic.works_count.unwrap_or(0),
        });
        out.work_topics.push(TopicScore {
            topic_id,
            score: raw_topic.score.unwrap_or(0.0),
            is_primary: out.work_topics.is_empty(),
        });
    }

    out
}

fn apc_amount(apc: &JsonValue) -> Option<i64> {
    let value = match apc {
        JsonValue::Object(map) => map.get("value")?,
        other => other,
    };
    value.as_i64().or_else(|| value.as_f64().map(|f| f.round() as i64))
}

/// Publication venue from the primary location, when it has an id.
pub fn extract_source(raw: &RawWork) -> Option<Source> {
    let src = raw.primary_location.as_ref()?.source.as_ref()?;
    let id = normalize_opt(src.id.as_deref())?;
    Some(Source {
        id,
        name: src
            .display_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        source_type: src.source_type.clone(),
        issn: src.issn.clone(),
        is_oa: src.is_oa.unwrap_or(false),
        homepage_url: src.homepage_url.clone(),
        host_organization_name: src.host_organization_name.clone(),
        apc_usd: src.apc_usd.as_ref().and_then(apc_amount),
    })
}

/// Distinct funders and one award entry per grant with a funder id.
pub fn extract_funders(raw: &RawWork) -> ExtractedFunders {
    let mut out = ExtractedFunders::default();
    let mut seen: HashSet<String> = HashSet::new();

    for grant in &raw.grants {
        let (id, name, country_code) = match &grant.funder {
            Some(RawGrantFunder::Id(id)) => (Some(id.as_str()), grant.funder_display_name.clone(), None),
            Some(RawGrantFunder::Object(f)) => (
                f.id.as_deref(),
                f.display_name.clone().or_else(|| grant.funder_display_name.clone()),
                f.country_code.clone(),
            ),
            None => continue,
        };
        let Some(funder_id) = normalize_opt(id) else {
            continue;
        };

        if seen.insert(funder_id.clone()) {
            out.funders.push(Funder {
                id: funder_id.clone(),
                name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                country_code,
            });
        }
        out.awards.push(FunderAward {
            funder_id,
            award_id: grant.award_id.clone(),
        });
    }

    out
}

//! Typed schemas for primary-provider (OpenAlex) payloads.
//!
//! Every field is optional and defaults at deserialization time, including
//! explicit JSON `null`s on list fields, so the extractor only ever sees a
//! fully-defaulted structure. Free-form blobs that are stored verbatim stay
//! as `serde_json::Value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Deserialize `null` (or a missing field, with `#[serde(default)]`) as `T::default()`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One work as returned by the primary provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawWork {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    pub title: Option<String>,
    pub display_name: Option<String>,
    /// Abstract as `{word: [positions]}`.
    pub abstract_inverted_index: Option<BTreeMap<String, Vec<u32>>>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub doi: Option<String>,
    pub cited_by_count: Option<i64>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub is_retracted: Option<bool>,
    pub open_access: Option<RawOpenAccess>,
    pub primary_location: Option<RawLocation>,
    pub fwci: Option<f64>,
    pub counts_by_year: Option<JsonValue>,
    pub biblio: Option<JsonValue>,
    pub keywords: Option<JsonValue>,
    pub sustainable_development_goals: Option<JsonValue>,
    pub mesh: Option<JsonValue>,
    pub indexed_in: Option<JsonValue>,
    #[serde(deserialize_with = "nullable")]
    pub related_works: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub referenced_works: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub authorships: Vec<RawAuthorship>,
    #[serde(deserialize_with = "nullable")]
    pub topics: Vec<RawTopic>,
    #[serde(deserialize_with = "nullable")]
    pub grants: Vec<RawGrant>,
}

/// `open_access` block of a work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawOpenAccess {
    pub is_oa: Option<bool>,
    pub oa_url: Option<String>,
}

/// `primary_location` block of a work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawLocation {
    pub is_oa: Option<bool>,
    pub pdf_url: Option<String>,
    pub landing_page_url: Option<String>,
    pub source: Option<RawSource>,
}

/// Publication venue embedded in a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawSource {
    pub id: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
    pub issn: Option<JsonValue>,
    pub is_oa: Option<bool>,
    pub homepage_url: Option<String>,
    pub host_organization_name: Option<String>,
    /// Either `{ "value": 2500, ... }` or a bare number.
    pub apc_usd: Option<JsonValue>,
}

/// One authorship entry (author + affiliations at time of writing).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawAuthorship {
    pub author: Option<RawAuthor>,
    #[serde(deserialize_with = "nullable")]
    pub institutions: Vec<RawInstitution>,
    pub is_corresponding: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawAuthor {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub orcid: Option<String>,
    pub cited_by_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawInstitution {
    pub id: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub institution_type: Option<String>,
    pub country_code: Option<String>,
    pub ror: Option<String>,
}

/// A topic association with its explicit domain → field → subfield chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawTopic {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub score: Option<f64>,
    pub description: Option<String>,
    pub keywords: Option<JsonValue>,
    pub works_count: Option<i64>,
    pub domain: Option<RawTopicLevel>,
    pub field: Option<RawTopicLevel>,
    pub subfield: Option<RawTopicLevel>,
}

/// A node of the topic chain above the topic itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawTopicLevel {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// A grant attached to a work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawGrant {
    pub funder: Option<RawGrantFunder>,
    pub funder_display_name: Option<String>,
    pub award_id: Option<String>,
}

/// Grant funders arrive either as a bare id or as an embedded object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawGrantFunder {
    Id(String),
    Object(RawFunder),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawFunder {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub country_code: Option<String>,
}

/// Search / list response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWorksResponse {
    #[serde(deserialize_with = "nullable")]
    pub results: Vec<RawWork>,
    pub meta: RawMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMeta {
    pub count: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

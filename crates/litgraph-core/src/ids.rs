//! Identifier helpers.
//!
//! Provider entities are keyed by their provider-native id with the
//! `https://openalex.org/` URI prefix removed, so `https://openalex.org/W2741809807`
//! and `W2741809807` refer to the same row. Internally generated rows (search
//! cache entries) use time-ordered UUIDv7 identifiers.

use uuid::Uuid;

/// URI prefix carried by every OpenAlex entity id.
pub const OPENALEX_ID_PREFIX: &str = "https://openalex.org/";

/// Strip the OpenAlex URI prefix and surrounding whitespace from an id.
///
/// Ids that don't carry the prefix are returned trimmed but otherwise unchanged.
///
/// ```
/// use litgraph_core::normalize_id;
///
/// assert_eq!(normalize_id("https://openalex.org/W123"), "W123");
/// assert_eq!(normalize_id("W123"), "W123");
/// ```
pub fn normalize_id(id: &str) -> String {
    let trimmed = id.trim();
    trimmed
        .strip_prefix(OPENALEX_ID_PREFIX)
        .unwrap_or(trimmed)
        .to_string()
}

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

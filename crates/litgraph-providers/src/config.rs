//! Provider client configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENALEX_BASE_URL` | `https://api.openalex.org` |
//! | `OPENALEX_API_KEY` | unset |
//! | `OPENALEX_EMAIL` | unset (polite-pool `mailto`, used when no key is set) |
//! | `S2_BASE_URL` | `https://api.semanticscholar.org` |
//! | `S2_API_KEY` | unset |
//! | `S2_CITED_BY_PAGE_SIZE` | 100 |
//! | `S2_CITED_BY_MAX` | 5000 |
//! | `PROVIDER_TIMEOUT_SECS` | 30 |

use litgraph_core::defaults;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration for the OpenAlex client.
#[derive(Debug, Clone)]
pub struct OpenAlexConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENALEX_URL.to_string(),
            api_key: None,
            email: None,
            timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl OpenAlexConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_nonempty("OPENALEX_BASE_URL")
                .unwrap_or_else(|| defaults::OPENALEX_URL.to_string()),
            api_key: env_nonempty("OPENALEX_API_KEY"),
            email: env_nonempty("OPENALEX_EMAIL"),
            timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS")
                .unwrap_or(defaults::PROVIDER_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Authentication query parameter: the API key wins over the email.
    pub fn auth_param(&self) -> Option<(&'static str, &str)> {
        match (&self.api_key, &self.email) {
            (Some(key), _) => Some(("api_key", key.as_str())),
            (None, Some(email)) => Some(("mailto", email.as_str())),
            (None, None) => None,
        }
    }
}

/// Configuration for the Semantic Scholar client.
#[derive(Debug, Clone)]
pub struct SemanticScholarConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub cited_by_page_size: usize,
    /// Upper bound on citing ids collected for one work.
    pub cited_by_max: usize,
    pub timeout_secs: u64,
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SEMANTIC_SCHOLAR_URL.to_string(),
            api_key: None,
            cited_by_page_size: defaults::CITED_BY_PAGE_SIZE,
            cited_by_max: defaults::CITED_BY_MAX,
            timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl SemanticScholarConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_nonempty("S2_BASE_URL")
                .unwrap_or_else(|| defaults::SEMANTIC_SCHOLAR_URL.to_string()),
            api_key: env_nonempty("S2_API_KEY"),
            cited_by_page_size: env_parse("S2_CITED_BY_PAGE_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults::CITED_BY_PAGE_SIZE),
            cited_by_max: env_parse("S2_CITED_BY_MAX").unwrap_or(defaults::CITED_BY_MAX),
            timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS")
                .unwrap_or(defaults::PROVIDER_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_cited_by_paging(mut self, page_size: usize, max: usize) -> Self {
        self.cited_by_page_size = page_size.max(1);
        self.cited_by_max = max;
        self
    }
}

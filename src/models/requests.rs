use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use crate::error::{GlassboxError, Result};

/// Minimum number of characters in a discovery query
pub const MIN_QUERY_CHARS: usize = 10;
/// Allowed range for `max_results`
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

static GITHUB_REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://github\.com/[\w.\-]+/[\w.\-]+/?$").expect("valid repository URL pattern")
});

/// Request to run the multi-pass analysis on a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Repository URL, e.g. `https://github.com/owner/repo`
    pub url: String,
}

impl AnalysisRequest {
    /// Creates a request for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Checks the URL shape and returns it with any trailing slash removed
    pub fn validate(&self) -> Result<String> {
        if !GITHUB_REPO_URL.is_match(&self.url) {
            return Err(GlassboxError::Validation(format!(
                "Invalid GitHub repository URL: {}",
                self.url
            )));
        }
        Ok(self.url.trim_end_matches('/').to_string())
    }
}

/// Treats an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Optional narrowing criteria for a discovery query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryFilters {
    /// Preferred implementation languages
    #[serde(deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
    /// Domain or category, e.g. "observability"
    #[serde(deserialize_with = "null_as_default")]
    pub domain: String,
    /// Project scale, e.g. "small library"
    #[serde(deserialize_with = "null_as_default")]
    pub scale: String,
    /// License preference, e.g. "MIT"
    #[serde(deserialize_with = "null_as_default")]
    pub license_preference: String,
    /// `Some(true)` for maintained only, `Some(false)` for the opposite, `None` for no preference
    pub actively_maintained: Option<bool>,
}

fn default_max_results() -> u8 {
    5
}

/// Request to recommend open source projects for a free-text need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// What the user is looking for
    pub query: String,
    /// Optional filters
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: DiscoveryFilters,
    /// How many recommendations to ask for
    #[serde(default = "default_max_results")]
    pub max_results: u8,
}

impl DiscoveryRequest {
    /// Creates a request with no filters and the default result count
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: DiscoveryFilters::default(),
            max_results: default_max_results(),
        }
    }

    /// Checks the query length and result bound
    pub fn validate(&self) -> Result<()> {
        let chars = self.query.chars().count();
        if chars < MIN_QUERY_CHARS {
            return Err(GlassboxError::Validation(format!(
                "query must be at least {} characters (got {})",
                MIN_QUERY_CHARS, chars
            )));
        }
        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            return Err(GlassboxError::Validation(format!(
                "max_results must be between {} and {} (got {})",
                MAX_RESULTS_RANGE.start(),
                MAX_RESULTS_RANGE.end(),
                self.max_results
            )));
        }
        Ok(())
    }
}

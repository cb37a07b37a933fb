use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recommended repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendedRepo {
    /// 1-based position in the list
    pub rank: u32,
    /// `owner/name`
    pub repo_name: String,
    /// Repository URL
    pub github_url: String,
    /// Approximate star count as reported by the model
    pub stars: u64,
    /// Primary language
    pub language: String,
    /// SPDX-ish license name
    pub license: String,
    /// One-line summary
    pub description: String,
    /// Why this repository fits the query
    pub reasoning: String,
    /// Reasons to pick it
    pub strengths: Vec<String>,
    /// Caveats worth checking before adopting
    pub considerations: Vec<String>,
    /// 0-100
    pub match_score: u8,
    /// Free-form topic tags
    pub tags: Vec<String>,
}

/// Typed view over a `discovery_complete` payload
///
/// The pipeline forwards the raw document untouched; this is only used by renderers.
/// Every field is optional so that a partially conforming reply still renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryResult {
    /// Model's search narrative
    pub reasoning_steps: Vec<String>,
    /// Overall summary
    pub summary: String,
    /// Ranked picks
    pub recommendations: Vec<RecommendedRepo>,
    /// How the model read the query
    pub query_interpretation: String,
}

impl DiscoveryResult {
    /// Reads a result out of an open document, falling back to defaults on shape mismatch
    pub fn from_document(document: &Value) -> Self {
        serde_json::from_value(document.clone()).unwrap_or_default()
    }
}

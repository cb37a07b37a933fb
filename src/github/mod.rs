//! Repository snapshot fetching from the GitHub REST API
//!
//! Every sub-fetch is best effort: a failed request, a non-2xx status or an unexpected body
//! yields an empty value for that field and the snapshot is still built.

mod types;

use std::collections::HashSet;
use std::time::Duration;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};
use crate::config::Config;
use crate::error::{GlassboxError, Result};
use crate::models::{ConfigFile, LanguageBytes, RepoSnapshot};

use types::{ContentResponse, RepositoryInfo, TreeResponse};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Config and manifest files worth showing the model, in priority order
pub const PRIORITY_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "Dockerfile",
    ".env.example",
    "Makefile",
    "tsconfig.json",
    "webpack.config.js",
    "vite.config.ts",
    "next.config.js",
    "next.config.mjs",
];

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://github\.com/([\w.\-]+)/([\w.\-]+)").expect("valid GitHub URL pattern")
});

/// Size caps applied while building a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// README characters kept
    pub max_content_size: usize,
    /// Characters kept per config file
    pub max_file_size: usize,
    /// Tree entries considered when looking for priority files
    pub max_tree_entries: usize,
    /// Tree entries kept in the snapshot
    pub max_snapshot_paths: usize,
    /// Config files fetched
    pub max_config_files: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_content_size: 15_000,
            max_file_size: 8_000,
            max_tree_entries: 2_000,
            max_snapshot_paths: 500,
            max_config_files: 12,
        }
    }
}

/// Source of repository snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Builds the snapshot for `owner/repo`
    async fn fetch(&self, owner: &str, repo: &str) -> Result<RepoSnapshot>;
}

/// Extracts `(owner, repo)` from a GitHub repository URL
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    let caps = GITHUB_URL
        .captures(url)
        .ok_or_else(|| GlassboxError::Validation(format!("Invalid GitHub URL: {}", url)))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// GitHub REST client that assembles [`RepoSnapshot`]s
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    raw_base: String,
    limits: FetchLimits,
}

impl GitHubClient {
    /// Creates a client, authenticating with `token` when given
    pub fn new(token: Option<String>, timeout: Duration, limits: FetchLimits) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(concat!("glassbox/", env!("CARGO_PKG_VERSION"))));
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|_| GlassboxError::Config("GITHUB_TOKEN contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GlassboxError::Config(format!("Failed to build GitHub client: {}", e)))?;

        Ok(Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            raw_base: GITHUB_RAW_BASE.to_string(),
            limits,
        })
    }

    /// Creates a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.api_keys.github_token.clone(), config.github_timeout(), config.fetch_limits())?
            .with_base_urls(&config.endpoints.github_api, &config.endpoints.github_raw))
    }

    /// Points the client at different API and raw-content hosts
    pub fn with_base_urls(mut self, api_base: &str, raw_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.raw_base = raw_base.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("GET {} returned HTTP {}", url, response.status());
            return None;
        }
        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("GET {} returned an unexpected body: {}", url, e);
                None
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("GET {} returned HTTP {}", url, response.status());
            return None;
        }
        response.text().await.ok()
    }

    async fn fetch_file_content(&self, owner: &str, repo: &str, path: &str) -> String {
        let url = format!("{}/repos/{}/{}/contents/{}", self.api_base, owner, repo, path);
        self.fetch_json::<ContentResponse>(&url)
            .await
            .and_then(|body| decode_content(&body))
            .map(|content| truncate_chars(&content, self.limits.max_file_size))
            .unwrap_or_default()
    }

    /// Fetches everything a snapshot needs; never fails
    pub async fn fetch_snapshot(&self, owner: &str, repo: &str) -> RepoSnapshot {
        info!("Fetching snapshot of {}/{}", owner, repo);

        let repo_url = format!("{}/repos/{}/{}", self.api_base, owner, repo);
        let readme_url = format!("{}/{}/{}/HEAD/README.md", self.raw_base, owner, repo);
        let tree_url = format!("{}/repos/{}/{}/git/trees/HEAD?recursive=1", self.api_base, owner, repo);
        let langs_url = format!("{}/repos/{}/{}/languages", self.api_base, owner, repo);

        let (repo_info, readme, tree, languages) = futures::join!(
            self.fetch_json::<RepositoryInfo>(&repo_url),
            self.fetch_text(&readme_url),
            self.fetch_json::<TreeResponse>(&tree_url),
            self.fetch_json::<Map<String, Value>>(&langs_url),
        );

        let description = repo_info.and_then(|info| info.description).unwrap_or_default();
        let readme = truncate_chars(&readme.unwrap_or_default(), self.limits.max_content_size);

        let file_tree: Vec<String> = tree
            .map(|t| t.tree)
            .unwrap_or_default()
            .into_iter()
            .take(self.limits.max_tree_entries)
            .map(|entry| entry.path)
            .collect();

        let wanted = select_priority_files(&file_tree, self.limits.max_config_files);
        let contents = join_all(wanted.iter().map(|path| self.fetch_file_content(owner, repo, path))).await;
        let config_files: Vec<ConfigFile> = wanted
            .into_iter()
            .zip(contents)
            .filter(|(_, content)| !content.is_empty())
            .map(|(path, content)| ConfigFile { path: path.to_string(), content })
            .collect();

        let languages: Vec<LanguageBytes> = languages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, bytes)| bytes.as_u64().map(|bytes| LanguageBytes { name, bytes }))
            .collect();

        debug!(
            "Snapshot of {}/{}: readme {} chars, {} paths, {} config files, {} languages",
            owner,
            repo,
            readme.chars().count(),
            file_tree.len(),
            config_files.len(),
            languages.len()
        );

        RepoSnapshot {
            repo_name: repo.to_string(),
            owner: owner.to_string(),
            readme,
            file_tree: file_tree.into_iter().take(self.limits.max_snapshot_paths).collect(),
            config_files,
            languages,
            description,
        }
    }
}

#[async_trait]
impl RepoFetcher for GitHubClient {
    async fn fetch(&self, owner: &str, repo: &str) -> Result<RepoSnapshot> {
        Ok(self.fetch_snapshot(owner, repo).await)
    }
}

/// Priority files present in the tree, in priority order, at most `max`
fn select_priority_files(file_tree: &[String], max: usize) -> Vec<&'static str> {
    let present: HashSet<&str> = file_tree.iter().map(String::as_str).collect();
    PRIORITY_FILES
        .iter()
        .copied()
        .filter(|path| present.contains(path))
        .take(max)
        .collect()
}

fn decode_content(body: &ContentResponse) -> Option<String> {
    let content = body.content.as_deref().filter(|c| !c.is_empty())?;
    if body.encoding.as_deref().map_or(false, |e| e != "base64") {
        return Some(content.to_string());
    }
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url() {
        let (owner, repo) = parse_github_url("https://github.com/tokio-rs/axum").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("tokio-rs", "axum"));

        let (_, repo) = parse_github_url("http://github.com/a/b.rs/").unwrap();
        assert_eq!(repo, "b.rs");

        assert!(parse_github_url("https://gitlab.com/a/b").is_err());
    }

    #[test]
    fn test_select_priority_files_order_and_cap() {
        let tree: Vec<String> = ["Makefile", "src/main.rs", "Cargo.toml", "package.json", "docs/Dockerfile"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(select_priority_files(&tree, 12), vec!["package.json", "Cargo.toml", "Makefile"]);
        assert_eq!(select_priority_files(&tree, 2), vec!["package.json", "Cargo.toml"]);
    }

    #[test]
    fn test_decode_content_with_line_breaks() {
        let body = ContentResponse {
            content: Some("W3Bh\nY2th\nZ2Vd\n".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content(&body).as_deref(), Some("[package]"));
    }

    #[test]
    fn test_decode_content_invalid() {
        let body = ContentResponse { content: Some("***".into()), encoding: Some("base64".into()) };
        assert_eq!(decode_content(&body), None);
        assert_eq!(decode_content(&ContentResponse::default()), None);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }
}

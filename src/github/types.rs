use serde::Deserialize;

/// Subset of `GET /repos/{owner}/{repo}` we care about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /repos/{owner}/{repo}/git/trees/HEAD?recursive=1`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeEntry {
    #[serde(default)]
    pub path: String,
}

/// `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentResponse {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

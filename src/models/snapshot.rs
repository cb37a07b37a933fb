use serde::{Deserialize, Serialize};

/// A config or manifest file captured from the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Path of the file relative to the repository root
    pub path: String,
    /// File content, already truncated to the per-file cap
    pub content: String,
}

/// Byte count for one language, as reported by the hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageBytes {
    /// Language name
    pub name: String,
    /// Number of bytes written in this language
    pub bytes: u64,
}

/// Immutable bundle of repository data fed to the analysis stages
///
/// Ordered collections keep the order they were fetched in: config files follow the
/// priority list, languages follow the API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    /// Repository name
    pub repo_name: String,
    /// Owning user or organization
    pub owner: String,
    /// README text, truncated to the content cap
    pub readme: String,
    /// Paths from the recursive file tree
    pub file_tree: Vec<String>,
    /// Captured config/manifest files
    pub config_files: Vec<ConfigFile>,
    /// Language byte counts
    pub languages: Vec<LanguageBytes>,
    /// Short description, empty when the repository has none
    pub description: String,
}

impl RepoSnapshot {
    /// Creates an empty snapshot for the given repository
    pub fn new(owner: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo_name: repo_name.into(),
            ..Self::default()
        }
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo_name)
    }

    /// Adds a language entry, builder style
    pub fn with_language(mut self, name: impl Into<String>, bytes: u64) -> Self {
        self.languages.push(LanguageBytes { name: name.into(), bytes });
        self
    }

    /// Adds a config file entry, builder style
    pub fn with_config_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.config_files.push(ConfigFile { path: path.into(), content: content.into() });
        self
    }
}

//! Prompt templates and the substitution mechanics that fill them
//!
//! Templates use `{name}` placeholders. Substitution is a single pass over the template,
//! so placeholder-looking text inside substituted values is never expanded, and brace
//! sequences that are not known placeholders (the JSON examples) are left as written.

mod discovery;
mod passes;

use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use crate::models::{ConfigFile, LanguageBytes, RepoSnapshot};

pub use discovery::{build_discovery_prompt, DISCOVERY_TEMPLATE};
pub use passes::{build_stage_prompt, STAGES};

/// Number of file-tree entries included in a stage prompt
pub const FILE_TREE_PROMPT_LIMIT: usize = 200;
/// Number of languages included in a stage prompt
pub const LANGUAGE_PROMPT_LIMIT: usize = 10;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder pattern"));

/// One pass of the multi-stage analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDefinition {
    /// Identifier sent on the wire as `pass_name`
    pub name: &'static str,
    /// Human readable title used in progress messages
    pub title: &'static str,
    /// Prompt template with `{placeholder}` tokens
    pub template: &'static str,
}

impl StageDefinition {
    /// Renders this stage's prompt for a snapshot
    pub fn render(&self, snapshot: &RepoSnapshot) -> String {
        let file_tree = format_file_tree(&snapshot.file_tree);
        let config_files = format_config_files(&snapshot.config_files);
        let languages = format_languages(&snapshot.languages);

        render_template(
            self.template,
            &[
                ("repo_name", snapshot.repo_name.as_str()),
                ("description", snapshot.description.as_str()),
                ("readme", snapshot.readme.as_str()),
                ("file_tree", file_tree.as_str()),
                ("languages", languages.as_str()),
                ("config_files", config_files.as_str()),
            ],
        )
    }
}

/// Substitutes `{name}` placeholders with the given values in one pass
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let lookup: HashMap<&str, &str> = values.iter().copied().collect();
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match lookup.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// First 200 paths, one per line
pub fn format_file_tree(paths: &[String]) -> String {
    paths
        .iter()
        .take(FILE_TREE_PROMPT_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Each file preceded by a `--- path ---` delimiter line
pub fn format_config_files(files: &[ConfigFile]) -> String {
    files
        .iter()
        .map(|file| format!("\n--- {} ---\n{}\n", file.path, file.content))
        .collect()
}

/// Top ten languages by byte count, `name: count` pairs separated by commas
///
/// The sort is stable, so languages with equal counts keep their original order.
pub fn format_languages(languages: &[LanguageBytes]) -> String {
    let mut sorted: Vec<&LanguageBytes> = languages.iter().collect();
    sorted.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    sorted
        .into_iter()
        .take(LANGUAGE_PROMPT_LIMIT)
        .map(|lang| format!("{}: {}", lang.name, lang.bytes))
        .collect::<Vec<_>>()
        .join(", ")
}

#![allow(dead_code)]

use std::time::Duration;
use glassbox::github::{FetchLimits, GitHubClient};
use glassbox::{EventType, ProgressEvent, RepoSnapshot};

pub mod test_helpers {
    use super::*;

    pub fn setup_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// GitHub client whose API and raw hosts both point at `base_url`
    pub fn github_client(base_url: &str, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(token.map(str::to_string), Duration::from_secs(5), FetchLimits::default())
            .expect("client builds")
            .with_base_urls(base_url, base_url)
    }

    pub fn sample_snapshot() -> RepoSnapshot {
        let mut snapshot = RepoSnapshot::new("tokio-rs", "axum")
            .with_language("Rust", 1_200_000)
            .with_language("Shell", 900)
            .with_config_file("Cargo.toml", "[workspace]\nmembers = [\"axum\"]\n");
        snapshot.description = "Ergonomic and modular web framework".to_string();
        snapshot.readme = "# axum\n\nA web application framework.".to_string();
        snapshot.file_tree = vec!["Cargo.toml".into(), "axum/src/lib.rs".into()];
        snapshot
    }

    pub fn event_types(events: &[ProgressEvent]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type).collect()
    }
}

use base64::{engine::general_purpose::STANDARD, Engine as _};
use glassbox::github::{FetchLimits, GitHubClient};
use glassbox::RepoFetcher;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

mod common;
use common::test_helpers::*;

fn encoded(content: &str) -> String {
    // GitHub wraps base64 content at 60 columns
    let raw = STANDARD.encode(content);
    let wrapped: Vec<String> = raw
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    json!({"content": wrapped.join("\n"), "encoding": "base64"}).to_string()
}

#[tokio::test]
async fn test_fetch_full_snapshot() {
    setup_test_logger();
    let mut server = Server::new_async().await;

    let _repo = server.mock("GET", "/repos/tokio-rs/axum")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"name": "axum", "description": "Web framework"}).to_string())
        .create_async()
        .await;
    let _readme = server.mock("GET", "/tokio-rs/axum/HEAD/README.md")
        .with_status(200)
        .with_body("# axum")
        .create_async()
        .await;
    let _tree = server.mock("GET", Matcher::Regex(r"^/repos/tokio-rs/axum/git/trees/HEAD".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"tree": [
                {"path": "Makefile", "type": "blob"},
                {"path": "src", "type": "tree"},
                {"path": "Cargo.toml", "type": "blob"},
                {"path": "Dockerfile", "type": "blob"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let _langs = server.mock("GET", "/repos/tokio-rs/axum/languages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Rust": 5000, "Shell": 20, "Dockerfile": 300}"#)
        .create_async()
        .await;
    let _cargo = server.mock("GET", "/repos/tokio-rs/axum/contents/Cargo.toml")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(encoded("[workspace]\nmembers = [\"axum\", \"axum-core\", \"axum-extra\", \"axum-macros\"]\n"))
        .create_async()
        .await;
    let _make = server.mock("GET", "/repos/tokio-rs/axum/contents/Makefile")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(encoded("test:\n\tcargo test\n"))
        .create_async()
        .await;
    let _docker = server.mock("GET", "/repos/tokio-rs/axum/contents/Dockerfile")
        .with_status(404)
        .create_async()
        .await;

    let client = github_client(&server.url(), None);
    let snapshot = client.fetch("tokio-rs", "axum").await.unwrap();

    assert_eq!(snapshot.full_name(), "tokio-rs/axum");
    assert_eq!(snapshot.description, "Web framework");
    assert_eq!(snapshot.readme, "# axum");
    assert_eq!(snapshot.file_tree, vec!["Makefile", "src", "Cargo.toml", "Dockerfile"]);

    let files: Vec<&str> = snapshot.config_files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(files, vec!["Cargo.toml", "Makefile"]);
    assert!(snapshot.config_files[0].content.contains("axum-macros"));

    let languages: Vec<(&str, u64)> = snapshot.languages.iter().map(|l| (l.name.as_str(), l.bytes)).collect();
    assert_eq!(languages, vec![("Rust", 5000), ("Shell", 20), ("Dockerfile", 300)]);
}

#[tokio::test]
async fn test_every_sub_fetch_failing_yields_empty_snapshot() {
    let mut server = Server::new_async().await;
    let _any = server.mock("GET", Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let snapshot = github_client(&server.url(), None).fetch("ghost", "repo").await.unwrap();

    assert_eq!(snapshot.repo_name, "repo");
    assert_eq!(snapshot.owner, "ghost");
    assert!(snapshot.readme.is_empty());
    assert!(snapshot.description.is_empty());
    assert!(snapshot.file_tree.is_empty());
    assert!(snapshot.config_files.is_empty());
    assert!(snapshot.languages.is_empty());
}

#[tokio::test]
async fn test_null_description_and_readme_cap() {
    let mut server = Server::new_async().await;
    let _repo = server.mock("GET", "/repos/a/b")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"description": null}"#)
        .create_async()
        .await;
    let _readme = server.mock("GET", "/a/b/HEAD/README.md")
        .with_status(200)
        .with_body("é".repeat(20))
        .create_async()
        .await;

    let limits = FetchLimits { max_content_size: 10, ..FetchLimits::default() };
    let client = GitHubClient::new(None, Duration::from_secs(5), limits)
        .unwrap()
        .with_base_urls(&server.url(), &server.url());
    let snapshot = client.fetch_snapshot("a", "b").await;

    assert_eq!(snapshot.description, "");
    assert_eq!(snapshot.readme, "é".repeat(10));
}

#[tokio::test]
async fn test_tree_caps() {
    let mut server = Server::new_async().await;
    let paths: Vec<serde_json::Value> = (0..2100).map(|i| json!({"path": format!("src/file_{}.rs", i)})).collect();
    let _tree = server.mock("GET", Matcher::Regex(r"^/repos/big/repo/git/trees/HEAD".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"tree": paths}).to_string())
        .create_async()
        .await;

    let snapshot = github_client(&server.url(), None).fetch_snapshot("big", "repo").await;
    assert_eq!(snapshot.file_tree.len(), 500);
    assert_eq!(snapshot.file_tree[499], "src/file_499.rs");
}

#[tokio::test]
async fn test_token_and_accept_headers() {
    let mut server = Server::new_async().await;
    let repo = server.mock("GET", "/repos/a/b")
        .match_header("authorization", "token ghp_test")
        .match_header("accept", "application/vnd.github.v3+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"description": "ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let snapshot = github_client(&server.url(), Some("ghp_test")).fetch_snapshot("a", "b").await;

    assert_eq!(snapshot.description, "ok");
    repo.assert_async().await;
}

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Glassbox - explains GitHub repositories with a language model, one stage at a time
//!
//! A repository snapshot (README, file tree, languages, manifest files) is fed through six
//! analysis prompts in order. Every stage reports its outcome as a progress event the moment
//! it finishes, so a consumer can render results live. A second, single-round pipeline turns a
//! free-text need into open source project recommendations.
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use glassbox::{Config, AnalysisPipeline, GitHubClient, RepoFetcher};
//! use glassbox::llm::create_completion_client;
//! use tokio::sync::mpsc;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let snapshot = GitHubClient::from_config(&config)?.fetch("tokio-rs", "axum").await?;
//!     let pipeline = AnalysisPipeline::new(create_completion_client(&config)?, config.pipeline_settings());
//!
//!     let (tx, mut rx) = mpsc::channel(1);
//!     tokio::spawn(async move { pipeline.run(&snapshot, &tx).await });
//!     while let Some(event) = rx.recv().await {
//!         println!("{}", event.payload);
//!     }
//!     Ok(())
//! }
//! ```

/// Configuration loading and environment overrides
pub mod config;
/// Error handling types and utilities
pub mod error;
/// Progress event envelope
pub mod events;
/// Pulls the JSON payload out of fenced model replies
pub mod extract;
/// GitHub snapshot fetching
pub mod github;
/// Completion model clients
pub mod llm;
/// Logging configuration for the command-line client
pub mod logging;
/// Metrics collection and reporting
pub mod metrics;
/// Request and snapshot types
pub mod models;
/// Analysis and discovery runners
pub mod pipeline;
/// Prompt templates
pub mod prompts;
/// HTTP service
pub mod api;
/// Test doubles
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// Terminal rendering
pub mod ui;

// Re-export common types
pub use config::Config;
pub use error::{GlassboxError, Result};
pub use events::{emit, EventFields, EventType, ProgressEvent, WireEvent};
pub use extract::extract_payload;
pub use github::{GitHubClient, RepoFetcher};
pub use llm::{CompletionClient, CompletionRequest};
pub use models::{AnalysisRequest, DiscoveryRequest, RepoSnapshot};
pub use pipeline::{AnalysisPipeline, DiscoveryPipeline, EventSink, PipelineSettings, RunReport};

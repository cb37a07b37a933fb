//! HTTP surface: health check plus the two streaming endpoints
//!
//! Each streaming request gets its own bounded channel. The pipeline runs on a spawned task and
//! pushes into the sender; the response body drains the receiver as server-sent events. When
//! the client goes away the body (and with it the receiver) is dropped, which stops the run.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use crate::config::Config;
use crate::error::{GlassboxError, Result};
use crate::events::WireEvent;
use crate::github::{parse_github_url, GitHubClient, RepoFetcher};
use crate::llm::{create_completion_client, CompletionClient};
use crate::metrics::Metrics;
use crate::models::{AnalysisRequest, DiscoveryRequest};
use crate::pipeline::{AnalysisPipeline, DiscoveryPipeline, PipelineSettings};

/// Events buffered between a run and its response body
pub const EVENT_BUFFER: usize = 1;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Completion model client, shared by every run
    pub client: Arc<dyn CompletionClient>,
    /// Repository snapshot source
    pub fetcher: Arc<dyn RepoFetcher>,
    /// Model settings passed to each run
    pub settings: PipelineSettings,
    /// Process-wide counters
    pub metrics: Metrics,
    /// When the service started
    pub started: Instant,
}

impl AppState {
    /// Creates state from already-built collaborators
    pub fn new(client: Arc<dyn CompletionClient>, fetcher: Arc<dyn RepoFetcher>, settings: PipelineSettings) -> Self {
        Self {
            client,
            fetcher,
            settings,
            metrics: Metrics::new(),
            started: Instant::now(),
        }
    }

    /// Builds the real GitHub and completion clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = create_completion_client(config)?;
        let fetcher: Arc<dyn RepoFetcher> = Arc::new(GitHubClient::from_config(config)?);
        Ok(Self::new(client, fetcher, config.pipeline_settings()))
    }
}

/// Errors returned before a stream starts
#[derive(Debug)]
pub enum ApiError {
    /// The request body failed validation
    Validation(String),
    /// The request was well formed but could not be served
    BadRequest(String),
}

impl From<GlassboxError> for ApiError {
    fn from(err: GlassboxError) -> Self {
        match err {
            GlassboxError::Validation(detail) => Self::Validation(detail),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Builds the router; middleware is left to the caller
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/discover", post(discover))
        .with_state(state)
}

/// CORS layer admitting the configured origins
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "glassbox",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started.elapsed().as_secs(),
        "metrics": state.metrics.snapshot().await,
    }))
}

async fn analyze(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError> {
    let Json(request) = body?;
    let url = request.validate()?;
    let (owner, repo) = parse_github_url(&url)?;

    info!("Analysis requested for {}/{}", owner, repo);
    let snapshot = state
        .fetcher
        .fetch(&owner, &repo)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to fetch repo: {}", e)))?;

    let pipeline = AnalysisPipeline::new(state.client.clone(), state.settings.clone())
        .with_metrics(state.metrics.clone());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        pipeline.run(&snapshot, &tx).await;
    });

    Ok(event_stream(rx))
}

async fn discover(
    State(state): State<AppState>,
    body: std::result::Result<Json<DiscoveryRequest>, JsonRejection>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError> {
    let Json(request) = body?;
    request.validate()?;

    info!("Discovery requested: {:?}", request.query);
    let pipeline = DiscoveryPipeline::new(state.client.clone(), state.settings.clone())
        .with_metrics(state.metrics.clone());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        if let Err(e) = pipeline.run(&request, &tx).await {
            warn!("Discovery run rejected: {}", e);
        }
    });

    Ok(event_stream(rx))
}

fn event_stream(rx: mpsc::Receiver<WireEvent>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(|event| Ok(Event::default().data(event.payload)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

//! Pipeline runners
//!
//! Both pipelines follow the same shape: build a prompt, call the completion model, pull a JSON
//! document out of the reply, push a lifecycle event into an [`EventSink`]. A failing stage is
//! reported as an event and the run moves on; only a disconnected consumer stops a run early.

mod analysis;
mod discovery;
mod sink;

use std::time::{Duration, Instant};
use serde_json::Value;
use tracing::error;
use crate::config::DEFAULT_MODEL;
use crate::error::GlassboxError;
use crate::events::{emit, EventFields, EventType};
use crate::extract::extract_payload;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::metrics::Metrics;

pub use analysis::AnalysisPipeline;
pub use discovery::DiscoveryPipeline;
pub use sink::{EventSink, SinkClosed};

/// Characters of an unparseable reply echoed back to the consumer
pub const RAW_REPLY_PREVIEW_CHARS: usize = 500;

/// Model settings shared by every call a runner makes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Model identifier
    pub model: String,
    /// Output-size ceiling per call
    pub max_output_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: 4096,
        }
    }
}

/// What happened during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Stages that produced a parsed document
    pub completed: usize,
    /// Stages whose reply was not a JSON object
    pub degraded: usize,
    /// Stages whose model call failed
    pub failed: usize,
    /// The consumer disconnected before the run finished
    pub cancelled: bool,
}

impl RunReport {
    /// Stages that reached a terminal event
    pub fn stages_finished(&self) -> usize {
        self.completed + self.degraded + self.failed
    }
}

/// A parsed model reply
#[derive(Debug, Clone)]
pub(crate) struct StageOutput {
    pub document: Value,
    pub reasoning: Vec<String>,
    pub elapsed: Duration,
}

impl StageOutput {
    /// Elapsed seconds rounded to one decimal
    pub fn elapsed_secs(&self) -> f64 {
        round_tenths(self.elapsed)
    }
}

#[derive(Debug)]
pub(crate) enum StageFailure {
    /// The model call itself failed
    Upstream(GlassboxError),
    /// A reply arrived but did not hold a JSON object
    Parse { error: String, raw: String, elapsed: Duration },
}

/// Calls the model once and parses the reply
pub(crate) async fn run_stage(
    client: &dyn CompletionClient,
    settings: &PipelineSettings,
    prompt: String,
) -> Result<StageOutput, StageFailure> {
    let started = Instant::now();
    let request = CompletionRequest {
        model: settings.model.clone(),
        max_tokens: settings.max_output_tokens,
        prompt,
    };
    let raw = client.complete(&request).await.map_err(StageFailure::Upstream)?;

    match parse_document(&raw) {
        Ok(document) => Ok(StageOutput {
            reasoning: reasoning_steps(&document),
            document,
            elapsed: started.elapsed(),
        }),
        Err(error) => Err(StageFailure::Parse {
            error,
            raw,
            elapsed: started.elapsed(),
        }),
    }
}

/// Parses the extracted reply, insisting on a JSON object
pub(crate) fn parse_document(raw: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(&extract_payload(raw)).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}

/// String items of the document's `reasoning_steps` array
pub(crate) fn reasoning_steps(document: &Value) -> Vec<String> {
    document
        .get("reasoning_steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(|step| step.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn preview(raw: &str) -> String {
    raw.chars().take(RAW_REPLY_PREVIEW_CHARS).collect()
}

pub(crate) fn round_tenths(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}

/// Encodes and delivers one event; `false` means the consumer is gone
pub(crate) async fn deliver<S: EventSink + ?Sized>(sink: &S, event_type: EventType, fields: EventFields) -> bool {
    match emit(event_type, fields) {
        Ok(event) => sink.send(event).await.is_ok(),
        Err(e) => {
            error!("Failed to encode {} event: {}", event_type, e);
            true
        }
    }
}

pub(crate) async fn bump(metrics: Option<&Metrics>, key: &str) {
    if let Some(metrics) = metrics {
        metrics.increment(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_document_accepts_fenced_object() {
        let doc = parse_document("```json\n{\"purpose\": \"demo\"}\n```").unwrap();
        assert_eq!(doc, json!({"purpose": "demo"}));
    }

    #[test]
    fn test_parse_document_rejects_non_objects() {
        assert!(parse_document("not json").is_err());
        assert_eq!(parse_document("[1, 2]").unwrap_err(), "expected a JSON object");
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_reasoning_keeps_only_strings() {
        let doc = json!({"reasoning_steps": ["read README", 3, null, "checked deps"]});
        assert_eq!(reasoning_steps(&doc), vec!["read README", "checked deps"]);
        assert!(reasoning_steps(&json!({"reasoning_steps": "one"})).is_empty());
        assert!(reasoning_steps(&json!({})).is_empty());
    }

    #[test]
    fn test_preview_counts_characters() {
        let raw = "é".repeat(600);
        assert_eq!(preview(&raw).chars().count(), RAW_REPLY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_round_tenths() {
        assert_eq!(round_tenths(Duration::from_millis(1440)), 1.4);
        assert_eq!(round_tenths(Duration::from_millis(1460)), 1.5);
        assert_eq!(round_tenths(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_run_report_totals() {
        let report = RunReport { completed: 3, degraded: 1, failed: 2, cancelled: false };
        assert_eq!(report.stages_finished(), 6);
    }
}

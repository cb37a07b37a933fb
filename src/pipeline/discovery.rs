use std::sync::Arc;
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::error::Result;
use crate::events::{EventFields, EventType};
use crate::llm::CompletionClient;
use crate::metrics::{self, Metrics};
use crate::models::DiscoveryRequest;
use crate::prompts::build_discovery_prompt;
use super::{bump, deliver, run_stage, EventSink, PipelineSettings, RunReport, StageFailure};

/// Single-round recommendation pipeline
#[derive(Clone)]
pub struct DiscoveryPipeline {
    client: Arc<dyn CompletionClient>,
    settings: PipelineSettings,
    metrics: Option<Metrics>,
}

impl DiscoveryPipeline {
    /// Creates a discovery pipeline
    pub fn new(client: Arc<dyn CompletionClient>, settings: PipelineSettings) -> Self {
        Self {
            client,
            settings,
            metrics: None,
        }
    }

    /// Records run outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates `request`, then runs one recommendation round into `sink`
    ///
    /// An invalid request is returned as `Err` before any event is sent or any model call made.
    pub async fn run<S: EventSink + ?Sized>(&self, request: &DiscoveryRequest, sink: &S) -> Result<RunReport> {
        request.validate()?;
        let span = info_span!("discovery", run_id = %Uuid::new_v4());
        Ok(self.run_round(request, sink).instrument(span).await)
    }

    async fn run_round<S: EventSink + ?Sized>(&self, request: &DiscoveryRequest, sink: &S) -> RunReport {
        let recorder = self.metrics.as_ref();
        let mut report = RunReport::default();

        info!("Starting discovery for {} results", request.max_results);
        bump(recorder, metrics::RUNS_STARTED).await;

        let opening = [
            (EventType::DiscoveryStart, "Searching for matching open source projects..."),
            (EventType::DiscoveryThinking, "Analyzing your requirements and finding the best matches..."),
        ];
        for (event_type, message) in opening {
            if !deliver(sink, event_type, EventFields::message(message)).await {
                return self.cancelled(report).await;
            }
        }

        if sink.is_closed() {
            return self.cancelled(report).await;
        }

        let prompt = build_discovery_prompt(request);
        let (event_type, fields) = match run_stage(self.client.as_ref(), &self.settings, prompt).await {
            Ok(output) => {
                let elapsed = output.elapsed_secs();
                let found = output
                    .document
                    .get("recommendations")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                info!("Discovery found {} recommendations in {:.1}s", found, elapsed);
                report.completed += 1;
                bump(recorder, metrics::STAGES_COMPLETED).await;
                (
                    EventType::DiscoveryComplete,
                    EventFields::message(format!("Found {} recommendations ({:.1}s)", found, elapsed))
                        .with_data(output.document)
                        .with_reasoning(output.reasoning)
                        .with_elapsed(elapsed),
                )
            }
            Err(StageFailure::Parse { error, .. }) => {
                warn!("Discovery reply was not valid JSON: {}", error);
                report.degraded += 1;
                bump(recorder, metrics::STAGES_DEGRADED).await;
                (
                    EventType::Error,
                    EventFields::message(format!("Failed to parse recommendations: {}", error)),
                )
            }
            Err(StageFailure::Upstream(e)) => {
                warn!(transient = e.is_transient(), "Discovery failed: {}", e);
                report.failed += 1;
                bump(recorder, metrics::STAGES_FAILED).await;
                (EventType::Error, EventFields::message(format!("Discovery error: {}", e)))
            }
        };

        if !deliver(sink, event_type, fields).await
            || !deliver(sink, EventType::Done, EventFields::message("Discovery complete")).await
        {
            return self.cancelled(report).await;
        }
        report
    }

    async fn cancelled(&self, mut report: RunReport) -> RunReport {
        info!("Consumer disconnected; stopping discovery");
        report.cancelled = true;
        bump(self.metrics.as_ref(), metrics::RUNS_CANCELLED).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, ScriptedClient};
    use pretty_assertions::assert_eq;

    fn request() -> DiscoveryRequest {
        DiscoveryRequest::new("a fast embedded key-value store")
    }

    #[tokio::test]
    async fn test_counts_recommendations() {
        let reply = r#"```json
{"reasoning_steps": ["scanned"], "recommendations": [{"rank": 1}, {"rank": 2}, {"rank": 3}]}
```"#;
        let client = Arc::new(ScriptedClient::repeating(reply));
        let sink = RecordingSink::new();

        let report = DiscoveryPipeline::new(client, PipelineSettings::default())
            .run(&request(), &sink)
            .await
            .unwrap();
        let events = sink.events();

        assert_eq!(events.len(), 4);
        assert_eq!(events[2].event_type, EventType::DiscoveryComplete);
        assert!(events[2].fields.message.as_deref().unwrap().starts_with("Found 3 recommendations ("));
        assert_eq!(events[2].fields.reasoning, Some(vec!["scanned".to_string()]));
        assert_eq!(events[3].fields.message.as_deref(), Some("Discovery complete"));
        assert_eq!(report.completed, 1);
    }

    #[tokio::test]
    async fn test_missing_recommendations_counts_zero() {
        let client = Arc::new(ScriptedClient::repeating("{}"));
        let sink = RecordingSink::new();

        DiscoveryPipeline::new(client, PipelineSettings::default())
            .run(&request(), &sink)
            .await
            .unwrap();

        let message = sink.events()[2].fields.message.clone().unwrap();
        assert!(message.starts_with("Found 0 recommendations"));
    }

    #[tokio::test]
    async fn test_parse_failure_is_error_event() {
        let client = Arc::new(ScriptedClient::repeating("I could not find anything, sorry."));
        let sink = RecordingSink::new();

        let report = DiscoveryPipeline::new(client, PipelineSettings::default())
            .run(&request(), &sink)
            .await
            .unwrap();
        let events = sink.events();

        assert_eq!(events[2].event_type, EventType::Error);
        assert!(events[2].fields.message.as_deref().unwrap().starts_with("Failed to parse recommendations: "));
        assert_eq!(events[3].event_type, EventType::Done);
        assert_eq!(report.degraded, 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_error_event() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let sink = RecordingSink::new();

        let report = DiscoveryPipeline::new(client, PipelineSettings::default())
            .run(&request(), &sink)
            .await
            .unwrap();

        let events = sink.events();
        assert!(events[2].fields.message.as_deref().unwrap().starts_with("Discovery error: "));
        assert_eq!(events[3].event_type, EventType::Done);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_disconnect_while_thinking_skips_model_call() {
        let client = Arc::new(ScriptedClient::repeating(r#"{"recommendations": []}"#));
        let sink = RecordingSink::close_after(|event, _| event.event_type == EventType::DiscoveryThinking);
        let recorder = Metrics::new();

        let report = DiscoveryPipeline::new(client.clone(), PipelineSettings::default())
            .with_metrics(recorder.clone())
            .run(&request(), &sink)
            .await
            .unwrap();

        assert_eq!(client.calls(), 0);
        assert!(report.cancelled);
        assert_eq!(report.stages_finished(), 0);
        assert_eq!(sink.events().last().map(|e| e.event_type), Some(EventType::DiscoveryThinking));
        assert_eq!(recorder.get_counter(metrics::RUNS_CANCELLED).await, 1);
    }
}

use std::sync::Arc;
use serde_json::json;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::events::{EventFields, EventType};
use crate::llm::CompletionClient;
use crate::metrics::{self, Metrics};
use crate::models::RepoSnapshot;
use crate::prompts::{StageDefinition, STAGES};
use super::{bump, deliver, preview, run_stage, EventSink, PipelineSettings, RunReport, StageFailure};

/// Runs the ordered analysis stages against one repository snapshot
#[derive(Clone)]
pub struct AnalysisPipeline {
    client: Arc<dyn CompletionClient>,
    settings: PipelineSettings,
    stages: Vec<StageDefinition>,
    metrics: Option<Metrics>,
}

impl AnalysisPipeline {
    /// Creates a pipeline running the standard six stages
    pub fn new(client: Arc<dyn CompletionClient>, settings: PipelineSettings) -> Self {
        Self {
            client,
            settings,
            stages: STAGES.to_vec(),
            metrics: None,
        }
    }

    /// Replaces the stage list
    pub fn with_stages(mut self, stages: Vec<StageDefinition>) -> Self {
        self.stages = stages;
        self
    }

    /// Records run and stage outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Stages this pipeline runs, in order
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Runs every stage in order, pushing progress events into `sink`
    ///
    /// Stage failures become events; the run only stops early when the sink closes.
    pub async fn run<S: EventSink + ?Sized>(&self, snapshot: &RepoSnapshot, sink: &S) -> RunReport {
        let span = info_span!("analysis", run_id = %Uuid::new_v4(), repo = %snapshot.full_name());
        self.run_stages(snapshot, sink).instrument(span).await
    }

    async fn run_stages<S: EventSink + ?Sized>(&self, snapshot: &RepoSnapshot, sink: &S) -> RunReport {
        let recorder = self.metrics.as_ref();
        let mut report = RunReport::default();
        let total = self.stages.len();

        info!("Starting analysis with {} stages", total);
        bump(recorder, metrics::RUNS_STARTED).await;

        let start = EventFields::message(format!("Starting analysis of {}", snapshot.repo_name))
            .with_total_passes(total);
        if !deliver(sink, EventType::AnalysisStart, start).await {
            return self.cancelled(report).await;
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let number = index + 1;

            let fields = EventFields::message(format!("Running {}...", stage.title)).with_pass(stage.name, number);
            if !deliver(sink, EventType::PassStart, fields).await {
                return self.cancelled(report).await;
            }

            if sink.is_closed() {
                return self.cancelled(report).await;
            }

            let prompt = stage.render(snapshot);
            let (event_type, fields) = match run_stage(self.client.as_ref(), &self.settings, prompt).await {
                Ok(output) => {
                    let elapsed = output.elapsed_secs();
                    info!("Stage {} complete in {:.1}s", stage.name, elapsed);
                    report.completed += 1;
                    bump(recorder, metrics::STAGES_COMPLETED).await;
                    if let Some(m) = recorder {
                        m.record_time(stage.name, output.elapsed).await;
                    }
                    (
                        EventType::PassComplete,
                        EventFields::message(format!("{} complete ({:.1}s)", stage.title, elapsed))
                            .with_pass(stage.name, number)
                            .with_data(output.document)
                            .with_reasoning(output.reasoning)
                            .with_elapsed(elapsed),
                    )
                }
                Err(StageFailure::Parse { error, raw, elapsed }) => {
                    warn!("Stage {} reply was not valid JSON: {}", stage.name, error);
                    report.degraded += 1;
                    bump(recorder, metrics::STAGES_DEGRADED).await;
                    if let Some(m) = recorder {
                        m.record_time(stage.name, elapsed).await;
                    }
                    let data = json!({
                        "error": format!("JSON parse error: {}", error),
                        "raw": preview(&raw),
                    });
                    (
                        EventType::PassComplete,
                        EventFields::message(format!("{} completed with parse warning", stage.title))
                            .with_pass(stage.name, number)
                            .with_data(data)
                            .with_reasoning(Vec::new()),
                    )
                }
                Err(StageFailure::Upstream(e)) => {
                    warn!(transient = e.is_transient(), "Stage {} failed: {}", stage.name, e);
                    report.failed += 1;
                    bump(recorder, metrics::STAGES_FAILED).await;
                    (
                        EventType::Error,
                        EventFields::message(format!("Error in {}: {}", stage.title, e)).with_pass(stage.name, number),
                    )
                }
            };

            if !deliver(sink, event_type, fields).await {
                return self.cancelled(report).await;
            }
        }

        if !deliver(sink, EventType::Done, EventFields::message("Analysis complete")).await {
            return self.cancelled(report).await;
        }

        info!(
            "Analysis finished: {} completed, {} degraded, {} failed",
            report.completed, report.degraded, report.failed
        );
        report
    }

    async fn cancelled(&self, mut report: RunReport) -> RunReport {
        info!("Consumer disconnected after {} stages; stopping", report.stages_finished());
        report.cancelled = true;
        bump(self.metrics.as_ref(), metrics::RUNS_CANCELLED).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProgressEvent;
    use crate::testing::{RecordingSink, ScriptedClient};
    use pretty_assertions::assert_eq;

    fn snapshot() -> RepoSnapshot {
        RepoSnapshot::new("tokio-rs", "axum").with_language("Rust", 1000)
    }

    fn types(events: &[ProgressEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event_type.as_str()).collect()
    }

    #[tokio::test]
    async fn test_happy_path_event_sequence() {
        let client = Arc::new(ScriptedClient::repeating(r#"{"reasoning_steps": ["looked"], "ok": true}"#));
        let sink = RecordingSink::new();
        let pipeline = AnalysisPipeline::new(client.clone(), PipelineSettings::default())
            .with_stages(STAGES[..2].to_vec());

        let report = pipeline.run(&snapshot(), &sink).await;
        let events = sink.events();

        assert_eq!(
            types(&events),
            vec!["analysis_start", "pass_start", "pass_complete", "pass_start", "pass_complete", "done"]
        );
        assert_eq!(events[0].fields.total_passes, Some(2));
        assert_eq!(events[0].fields.message.as_deref(), Some("Starting analysis of axum"));
        assert_eq!(events[1].fields.message.as_deref(), Some("Running The Big Picture..."));
        assert_eq!(events[2].fields.reasoning, Some(vec!["looked".to_string()]));
        assert_eq!(events[4].fields.pass_number, Some(2));
        assert_eq!(report, RunReport { completed: 2, degraded: 0, failed: 0, cancelled: false });
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_requests_carry_settings() {
        let client = Arc::new(ScriptedClient::repeating("{}"));
        let settings = PipelineSettings { model: "claude-test".into(), max_output_tokens: 1234 };
        let pipeline = AnalysisPipeline::new(client.clone(), settings).with_stages(STAGES[..1].to_vec());

        pipeline.run(&snapshot(), &RecordingSink::new()).await;

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "claude-test");
        assert_eq!(requests[0].max_tokens, 1234);
        assert!(requests[0].prompt.contains("Repository: axum"));
    }

    #[tokio::test]
    async fn test_metrics_are_recorded() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("{}".into()), Ok("nope".into())]));
        let recorder = Metrics::new();
        let pipeline = AnalysisPipeline::new(client, PipelineSettings::default())
            .with_stages(STAGES[..3].to_vec())
            .with_metrics(recorder.clone());

        pipeline.run(&snapshot(), &RecordingSink::new()).await;

        assert_eq!(recorder.get_counter(metrics::RUNS_STARTED).await, 1);
        assert_eq!(recorder.get_counter(metrics::STAGES_COMPLETED).await, 1);
        assert_eq!(recorder.get_counter(metrics::STAGES_DEGRADED).await, 1);
        assert_eq!(recorder.get_counter(metrics::STAGES_FAILED).await, 1);
        assert!(recorder.get_timer("system_overview").await.is_some());
    }
}

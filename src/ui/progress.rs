use std::time::Duration;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use crate::events::{EventType, ProgressEvent, WireEvent};
use crate::models::DiscoveryResult;

/// Renders a run's events on the terminal as they arrive
pub struct ProgressRenderer {
    json: bool,
    spinner: Option<ProgressBar>,
    total_passes: Option<usize>,
}

impl ProgressRenderer {
    /// Human readable output with spinners
    pub fn new() -> Self {
        Self {
            json: false,
            spinner: None,
            total_passes: None,
        }
    }

    /// One JSON envelope per line, nothing else
    pub fn json() -> Self {
        Self {
            json: true,
            ..Self::new()
        }
    }

    fn create_spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.blue} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["-", "\\", "|", "/", "-", "\\", "|", "/", "+"]),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Shows one event
    pub fn render(&mut self, wire: &WireEvent) {
        if self.json {
            println!("{}", wire.payload);
            return;
        }

        let event = match wire.decode() {
            Ok(event) => event,
            Err(_) => return,
        };

        match event.event_type {
            EventType::AnalysisStart => {
                self.total_passes = event.fields.total_passes;
                println!("\n{}", message_of(&event).bright_cyan().bold());
            }
            EventType::PassStart | EventType::DiscoveryStart | EventType::DiscoveryThinking => {
                self.finish_spinner();
                let message = match (event.fields.pass_number, self.total_passes) {
                    (Some(n), Some(total)) => format!("[{}/{}] {}", n, total, message_of(&event)),
                    _ => message_of(&event).to_string(),
                };
                self.spinner = Some(Self::create_spinner(message));
            }
            EventType::PassComplete => {
                self.finish_spinner();
                println!("{}", status_line(&event));
                if let (Some(name), Some(data)) = (event.fields.pass_name.as_deref(), event.fields.data.as_ref()) {
                    if !has_parse_warning(Some(data)) {
                        for line in format_pass_summary(name, data) {
                            println!("{}", line);
                        }
                    }
                }
                for step in event.fields.reasoning.iter().flatten() {
                    println!("    {} {}", "-".dimmed(), step.dimmed());
                }
            }
            EventType::DiscoveryComplete => {
                self.finish_spinner();
                println!("{}", status_line(&event));
                if let Some(data) = &event.fields.data {
                    for line in format_recommendations(&DiscoveryResult::from_document(data)) {
                        println!("{}", line);
                    }
                }
            }
            EventType::Error => {
                self.finish_spinner();
                eprintln!("{}", status_line(&event));
            }
            EventType::Done => {
                self.finish_spinner();
                println!("\n{}", message_of(&event).bright_green().bold());
            }
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn message_of(event: &ProgressEvent) -> &str {
    event.fields.message.as_deref().unwrap_or_default()
}

/// One-line outcome for a terminal event
pub fn status_line(event: &ProgressEvent) -> String {
    let message = message_of(event);
    match event.event_type {
        EventType::Error => format!("{} {}", "[ERR]".red().bold(), message),
        EventType::PassComplete if has_parse_warning(event.fields.data.as_ref()) => {
            format!("{} {}", "[WARN]".yellow().bold(), message)
        }
        _ => format!("{} {}", "[OK]".green().bold(), message),
    }
}

fn has_parse_warning(data: Option<&Value>) -> bool {
    data.and_then(|d| d.get("error"))
        .and_then(Value::as_str)
        .map_or(false, |e| e.starts_with("JSON parse error"))
}

/// Items of a list field shown per pass
const SUMMARY_ITEMS: usize = 3;

fn text<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn items<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn severity_rank(item: &Value) -> u8 {
    match text(item, "severity").map(str::to_ascii_lowercase).as_deref() {
        Some("critical") => 4,
        Some("high") => 3,
        Some("medium") => 2,
        Some("low") => 1,
        _ => 0,
    }
}

/// Most severe entries first, ties in document order
fn most_severe(list: &[Value]) -> Vec<&Value> {
    let mut sorted: Vec<&Value> = list.iter().collect();
    sorted.sort_by(|a, b| severity_rank(b).cmp(&severity_rank(a)));
    sorted.truncate(SUMMARY_ITEMS);
    sorted
}

fn labelled(label: &str, value: &str) -> String {
    format!("    {} {}", format!("{}:", label).bold(), value)
}

fn severity_item(item: &Value, title_key: &str) -> Option<String> {
    let title = text(item, title_key)?;
    Some(match text(item, "severity") {
        Some(severity) => format!("      {} {}", format!("[{}]", severity).yellow(), title),
        None => format!("      {}", title),
    })
}

/// Headline findings of one analysis pass, keyed by the pass name
///
/// Unknown passes and missing fields render nothing.
pub fn format_pass_summary(pass_name: &str, data: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    let push_text = |lines: &mut Vec<String>, label: &str, key: &str| {
        if let Some(value) = text(data, key) {
            lines.push(labelled(label, value));
        }
    };

    match pass_name {
        "system_overview" => {
            push_text(&mut lines, "Purpose", "purpose");
            push_text(&mut lines, "Architecture", "architecture_type");
            let components: Vec<&str> = items(data, "components")
                .iter()
                .filter_map(|c| text(c, "name"))
                .collect();
            if !components.is_empty() {
                lines.push(labelled("Components", &components.join(", ")));
            }
        }
        "setup_risk_radar" => {
            push_text(&mut lines, "Overall risk", "overall_risk");
            push_text(&mut lines, "Setup time", "estimated_setup_time");
            if let Some(score) = data.get("complexity_score").and_then(Value::as_f64) {
                lines.push(labelled("Complexity", &format!("{}/10", score)));
            }
            lines.extend(most_severe(items(data, "risks")).into_iter().filter_map(|r| severity_item(r, "title")));
        }
        "failure_timeline" => {
            push_text(&mut lines, "Survival rate", "overall_survival_rate");
            push_text(&mut lines, "Critical period", "critical_period");
            for event in items(data, "timeline").iter().take(SUMMARY_ITEMS) {
                if let Some(title) = text(event, "title") {
                    let when = text(event, "time_label").unwrap_or("-");
                    lines.push(format!("      {} {}", format!("{}:", when).dimmed(), title));
                }
            }
        }
        "security_risk" => {
            push_text(&mut lines, "Security rating", "security_rating");
            push_text(&mut lines, "Supply chain risk", "supply_chain_risk");
            lines.extend(most_severe(items(data, "findings")).into_iter().filter_map(|f| severity_item(f, "title")));
        }
        "safe_run_plan" => {
            push_text(&mut lines, "Sandbox", "sandbox_recommendation");
            push_text(&mut lines, "Estimated time", "estimated_time");
            for step in items(data, "steps") {
                if let Some(title) = text(step, "title") {
                    let number = step.get("step_number").and_then(Value::as_u64).unwrap_or_default();
                    lines.push(format!("      {}. {}", number, title));
                    for command in items(step, "commands").iter().filter_map(Value::as_str) {
                        lines.push(format!("         $ {}", command.cyan()));
                    }
                }
            }
            if let Some(command) = data.get("smoke_test").and_then(|t| text(t, "command")) {
                lines.push(labelled("Smoke test", command));
            }
        }
        "recovery_strategy" => {
            let rollback = items(data, "rollback_plan").len();
            if rollback > 0 {
                lines.push(labelled("Rollback plan", &format!("{} steps", rollback)));
            }
            lines.extend(
                most_severe(items(data, "recovery_scenarios"))
                    .into_iter()
                    .filter_map(|s| severity_item(s, "scenario")),
            );
            if let Some(risk) = data.get("nuclear_option").and_then(|n| text(n, "data_loss_risk")) {
                lines.push(labelled("Nuclear option data loss", risk));
            }
        }
        _ => {}
    }
    lines
}

/// Lines describing each recommendation, best match first
pub fn format_recommendations(result: &DiscoveryResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.query_interpretation.is_empty() {
        lines.push(format!("\n{} {}", "Interpreted as:".bold(), result.query_interpretation));
    }

    for repo in &result.recommendations {
        lines.push(format!(
            "\n{}. {} {}",
            repo.rank,
            repo.repo_name.bright_white().bold(),
            format!("({}% match)", repo.match_score).bright_green()
        ));

        let facts: Vec<String> = [
            (!repo.language.is_empty()).then(|| repo.language.clone()),
            (repo.stars > 0).then(|| format!("{} stars", repo.stars)),
            (!repo.license.is_empty()).then(|| repo.license.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !facts.is_empty() {
            lines.push(format!("   {}", facts.join(" | ").dimmed()));
        }
        if !repo.github_url.is_empty() {
            lines.push(format!("   {}", repo.github_url.blue().underline()));
        }
        if !repo.description.is_empty() {
            lines.push(format!("   {}", repo.description));
        }
        for strength in &repo.strengths {
            lines.push(format!("   {} {}", "+".green(), strength));
        }
        for consideration in &repo.considerations {
            lines.push(format!("   {} {}", "!".yellow(), consideration));
        }
    }

    if !result.summary.is_empty() {
        lines.push(format!("\n{}", result.summary));
    }
    lines
}

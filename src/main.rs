use std::process;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use glassbox::api::EVENT_BUFFER;
use glassbox::github::{parse_github_url, GitHubClient, RepoFetcher};
use glassbox::llm::create_completion_client;
use glassbox::models::{AnalysisRequest, DiscoveryFilters, DiscoveryRequest};
use glassbox::pipeline::{AnalysisPipeline, DiscoveryPipeline};
use glassbox::prompts::STAGES;
use glassbox::ui::ProgressRenderer;
use glassbox::{logging, Config, WireEvent};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(author, version, about = "Explain a GitHub repository, or find one, with a language model", long_about = None)]
struct Cli {
    /// Log level for diagnostics (error, warn, info, debug, trace)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the six-stage analysis on a repository
    Analyze {
        /// Repository URL, e.g. https://github.com/owner/repo
        url: String,

        /// Print raw event JSON, one per line
        #[arg(long)]
        json: bool,
    },
    /// Ask for open source project recommendations
    Discover(DiscoverArgs),
    /// List the analysis stages
    Stages,
}

#[derive(Args)]
struct DiscoverArgs {
    /// What you are looking for (at least 10 characters)
    query: String,

    /// Preferred language; repeatable
    #[arg(long = "language", value_name = "LANGUAGE")]
    languages: Vec<String>,

    /// Domain or category
    #[arg(long)]
    domain: Option<String>,

    /// Project scale
    #[arg(long)]
    scale: Option<String>,

    /// License preference
    #[arg(long)]
    license: Option<String>,

    /// Only actively maintained projects
    #[arg(long, conflicts_with = "unmaintained")]
    maintained: bool,

    /// Only projects that are not actively maintained
    #[arg(long)]
    unmaintained: bool,

    /// Number of recommendations (1-10)
    #[arg(long, default_value_t = 5)]
    max_results: u8,

    /// Print raw event JSON, one per line
    #[arg(long)]
    json: bool,
}

impl DiscoverArgs {
    fn into_request(self) -> (DiscoveryRequest, bool) {
        let actively_maintained = match (self.maintained, self.unmaintained) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let request = DiscoveryRequest {
            query: self.query,
            filters: DiscoveryFilters {
                languages: self.languages,
                domain: self.domain.unwrap_or_default(),
                scale: self.scale.unwrap_or_default(),
                license_preference: self.license.unwrap_or_default(),
                actively_maintained,
            },
            max_results: self.max_results,
        };
        (request, self.json)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{} {}", "[WARNING]".yellow(), e);
    }

    let result = match cli.command {
        Command::Analyze { url, json } => analyze(&url, json).await,
        Command::Discover(args) => discover(args).await,
        Command::Stages => {
            list_stages();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn analyze(url: &str, json: bool) -> Result<()> {
    let url = AnalysisRequest::new(url).validate()?;
    let (owner, repo) = parse_github_url(&url)?;
    let config = load_config()?;

    let fetcher = GitHubClient::from_config(&config)?;
    let spinner = (!json).then(|| fetch_spinner(&format!("Fetching {}/{}...", owner, repo)));
    let snapshot = fetcher.fetch(&owner, &repo).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let snapshot = snapshot.with_context(|| format!("Failed to fetch repo: {}/{}", owner, repo))?;

    let pipeline = AnalysisPipeline::new(create_completion_client(&config)?, config.pipeline_settings());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let run = tokio::spawn(async move { pipeline.run(&snapshot, &tx).await });

    drain(rx, json).await;
    let report = run.await.context("analysis task failed")?;
    log::info!(
        "Run finished: {} completed, {} degraded, {} failed",
        report.completed,
        report.degraded,
        report.failed
    );
    Ok(())
}

async fn discover(args: DiscoverArgs) -> Result<()> {
    let (request, json) = args.into_request();
    request.validate()?;
    let config = load_config()?;

    let pipeline = DiscoveryPipeline::new(create_completion_client(&config)?, config.pipeline_settings());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let run: JoinHandle<glassbox::Result<_>> = tokio::spawn(async move { pipeline.run(&request, &tx).await });

    drain(rx, json).await;
    run.await.context("discovery task failed")??;
    Ok(())
}

async fn drain(mut rx: mpsc::Receiver<WireEvent>, json: bool) {
    let mut renderer = if json { ProgressRenderer::json() } else { ProgressRenderer::new() };
    while let Some(event) = rx.recv().await {
        renderer.render(&event);
    }
}

fn fetch_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

fn list_stages() {
    println!("{}", "Analysis stages".bright_cyan().bold());
    for (index, stage) in STAGES.iter().enumerate() {
        println!("  {} {:<20} {}", format!("{}.", index + 1).bright_yellow(), stage.name, stage.title.bright_white());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_discover_flags_map_to_filters() {
        let cli = Cli::parse_from([
            "glassbox", "discover", "a fast embedded database",
            "--language", "Rust", "--language", "C",
            "--license", "MIT", "--unmaintained", "--max-results", "3",
        ]);
        let Command::Discover(args) = cli.command else { panic!("expected discover") };
        let (request, json) = args.into_request();

        assert!(!json);
        assert_eq!(request.filters.languages, vec!["Rust", "C"]);
        assert_eq!(request.filters.license_preference, "MIT");
        assert_eq!(request.filters.actively_maintained, Some(false));
        assert_eq!(request.max_results, 3);
    }

    #[test]
    fn test_maintained_flags_conflict() {
        let parsed = Cli::try_parse_from(["glassbox", "discover", "some long query", "--maintained", "--unmaintained"]);
        assert!(parsed.is_err());
    }
}

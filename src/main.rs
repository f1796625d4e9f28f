#![deny(clippy::mod_module_files)]
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod audit;
mod auditor;
mod config;
mod decision;
mod deletion;
mod error;
mod gateway;
mod inventory;
mod pipeline;
mod staleness;

use audit::JsonLinesAuditSink;
use config::CleanerConfig;
use decision::{DecisionSource, InteractiveDecision, ScriptedDecision};
use gateway::GithubClient;
use pipeline::Pipeline;
use staleness::Cutoff;

/// Audit and prune stale branches across a list of repositories
#[derive(Parser, Debug)]
#[command(name = "repo-cleaner", version)]
struct Cli {
    /// YAML config file (default: ~/.config/repo-cleaner/config.yaml if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// File listing one owner/name per line
    #[arg(long, value_name = "PATH")]
    repos: Option<PathBuf>,

    /// Directory receiving cleanup_summary.json and repoCleaner_progress.json
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Branches with no commit in this many days are stale
    #[arg(long, value_name = "DAYS")]
    retention_days: Option<u32>,

    /// REST API base URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Answer every prompt with SELECTION ("all" or e.g. "0,2") instead of asking
    #[arg(long, value_name = "SELECTION")]
    select: Option<String>,

    /// Log request-level detail
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command-line flags take precedence over file and environment
    fn apply_to(&self, config: &mut CleanerConfig) {
        if let Some(path) = &self.repos {
            config.repo_list = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(days) = self.retention_days {
            config.retention_days = days;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "repo_cleaner=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // No repository is touched without a credential.
    let token = config::load_token(|key| env::var(key).ok())?;

    let mut config = CleanerConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    tracing::debug!("Effective configuration: {:?}", config);

    let repos = inventory::load_repositories(&config.repo_list)?;
    if repos.is_empty() {
        println!("No repositories found. Exiting.");
        return Ok(());
    }

    let cutoff = Cutoff::new(Utc::now(), config.retention_days)?;
    tracing::info!(
        "Auditing {} repositories; branches idle since {} are stale",
        repos.len(),
        cutoff.timestamp().format("%Y-%m-%d")
    );

    let output_dir = config.ensure_output_dir()?;
    let gateway = GithubClient::new(&config, &token)?;
    let sink = JsonLinesAuditSink::new(output_dir);
    let pipeline = Pipeline::new(&gateway, &sink, cutoff);

    let mut decisions: Box<dyn DecisionSource> = match cli.select {
        Some(selection) => Box::new(ScriptedDecision::new(selection)),
        None => Box::new(InteractiveDecision::stdin()),
    };

    let mut stdout = io::stdout();
    let report = pipeline.run(&repos, decisions.as_mut(), &mut stdout)?;

    println!("\n{}", report);
    println!(
        "Audit trail: {} and {}",
        sink.summary_path().display(),
        sink.progress_path().display()
    );
    Ok(())
}

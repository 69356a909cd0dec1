use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, ValueEnum};
use prowmon::cli::{report, tui};
use prowmon::core::{
    Counts, Filter, JobState, SortKey, analyze, build_digest, build_records, build_rows,
    filter_summaries, select,
};
use prowmon::error::AskError;
use prowmon::logging::{self, LogConfig};
use prowmon::logs::HttpLogSource;
use prowmon::{ask, config, source};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "prowmon")]
#[command(about = "Monitor vSphere periodic Prow CI jobs", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Read from a local prowjobs.json instead of the Prow API
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Force refresh, ignoring the response cache
    #[arg(long)]
    refresh: bool,

    #[command(flatten)]
    mode: ModeArgs,

    /// Filter by OCP version (e.g. 4.18)
    #[arg(short = 'v', long = "version", value_name = "VER")]
    version: Option<String>,

    /// Filter by latest job state
    #[arg(short, long, value_parser = ["success", "failure", "pending", "aborted", "error"])]
    state: Option<String>,

    /// Sort order
    #[arg(long, value_enum, default_value_t = SortKey::Recent)]
    sort: SortKey,

    /// Config file (default: $XDG_CONFIG_HOME/prowmon/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigArgs,
}

#[derive(Args)]
#[group(multiple = false)]
struct ModeArgs {
    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Launch the interactive TUI
    #[arg(short, long)]
    interactive: bool,

    /// Ask a natural language question about job status (requires ANTHROPIC_API_KEY)
    #[arg(short, long, value_name = "QUESTION")]
    ask: Option<String>,

    /// Print the compact text summary (useful for piping to an LLM)
    #[arg(long)]
    summary: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Flags that override config file and environment values.
#[derive(Args, Serialize)]
struct ConfigArgs {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(long)]
    json_logs: bool,

    /// Number of build log lines kept in the log viewer
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_tail_lines: Option<usize>,

    /// Case-insensitive substring a job name must contain
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    job_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::new(cli.config.clone(), Some(&cli.overrides))?;

    logging::init(LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
        file: cli.mode.interactive.then(|| config.log_file()),
    })?;

    let source = source::from_config(&config, cli.file.clone())
        .context("Failed to set up the data source")?;
    let raw = source
        .fetch(!cli.refresh)
        .await
        .context("Error fetching data")?;

    let summaries = analyze(&raw, &config.job_filter);
    if summaries.is_empty() {
        eprintln!("No {} periodic jobs found in the data.", config.job_filter);
        return Ok(());
    }
    info!(jobs = summaries.len(), "Analyzed periodic jobs");
    eprintln!("Found {} unique {} periodic jobs", summaries.len(), config.job_filter);

    let now = Utc::now();
    let filter = Filter {
        version: cli.version.clone(),
        state: cli.state.as_deref().map(JobState::parse),
    };

    if cli.mode.interactive {
        let logs = Arc::new(
            HttpLogSource::new(
                config.log_tail_lines,
                Duration::from_secs(config.request_timeout_secs),
            )
            .context("Failed to set up the log fetcher")?,
        );
        tui::run(summaries, source, logs, config.job_filter.clone())
            .await
            .context("Interactive session failed")?;
    } else if let Some(question) = &cli.mode.ask {
        match ask::ask(&config, &summaries, question, now).await {
            Ok(answer) => println!("{answer}"),
            Err(e @ AskError::MissingApiKey) => eprintln!("Error: {e}"),
            Err(e) => return Err(e).context("Failed to get an answer"),
        }
    } else if cli.mode.summary {
        println!("{}", build_digest(&summaries, now));
    } else if cli.mode.format == OutputFormat::Json {
        let filtered = filter_summaries(&summaries, &filter);
        println!("{}", report::render_json(&build_records(&filtered, now))?);
    } else {
        let color = std::io::stdout().is_terminal();
        let shown = select(&summaries, &filter, cli.sort);
        println!();
        println!("{}", report::render_counts(&Counts::of(&summaries), color));
        println!();
        print!("{}", report::render_table(&build_rows(&shown, now), cli.sort, color));
    }

    Ok(())
}

//! ANR Analyzer CLI - streams AI analysis of ANR traces and tombstones.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use anr_analyzer::services::analysis::AnalysisStatus;
use anr_analyzer::{
    analyze, estimate, get_settings, health, reset_settings, AppState, OutputFormat,
};
use anr_analyzer_core::{AnalysisMode, AnalysisRequest, AnalysisRequestBuilder, LogCategory, ProviderType};

/// ANR Analyzer - AI analysis of Android ANR traces and tombstones
#[derive(Parser)]
#[command(name = "anr-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.anr-analyzer/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a log file and stream events to stdout
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Cost ceiling in USD
        #[arg(long)]
        budget: Option<f64>,

        /// Output format: jsonl or sse
        #[arg(long, default_value = "jsonl")]
        format: OutputFormat,
    },
    /// Estimate tokens and cost for a log file
    Estimate {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Check the config and each provider
    Health,
    /// Print the configuration (API keys masked)
    Config {
        /// Reset the configuration to defaults first
        #[arg(long)]
        reset: bool,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Log file to analyze
    file: PathBuf,

    /// Log category: anr or tombstone
    #[arg(long, default_value = "anr")]
    category: LogCategory,

    /// Analysis mode: quick, intelligent, large_file or max_token
    #[arg(long, default_value = "intelligent")]
    mode: AnalysisMode,

    /// Provider: anthropic or openai
    #[arg(long, default_value = "anthropic")]
    provider: ProviderType,
}

impl InputArgs {
    fn build_request(&self, budget: Option<f64>) -> anyhow::Result<AnalysisRequest> {
        let bytes = std::fs::read(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        AnalysisRequestBuilder::new(content)
            .category(self.category)
            .mode(self.mode)
            .provider(self.provider)
            .maybe_budget_usd(budget)
            .build()
            .context("invalid analysis request")
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<std::process::ExitCode> {
    let state = Arc::new(AppState::new());
    state
        .initialize(cli.config.clone())
        .await
        .context("failed to initialize")?;

    match cli.command {
        Commands::Analyze {
            input,
            budget,
            format,
        } => {
            let request = input.build_request(budget)?;

            let shutdown_state = Arc::clone(&state);
            let ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let cancelled = shutdown_state.shutdown().await;
                    tracing::info!(cancelled, "interrupt received, cancelling analyses");
                }
            });

            let outcome = analyze(&state, request, tokio::io::stdout(), format).await;
            ctrl_c.abort();
            let outcome = outcome?;

            tracing::info!(
                analysis_id = %outcome.analysis_id,
                status = %outcome.status,
                "analysis finished"
            );
            Ok(match outcome.status {
                AnalysisStatus::Completed => std::process::ExitCode::SUCCESS,
                AnalysisStatus::Cancelled => std::process::ExitCode::from(130),
                _ => std::process::ExitCode::FAILURE,
            })
        }
        Commands::Estimate { input } => {
            let request = input.build_request(None)?;
            let estimate = estimate(&state, &request).await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(std::process::ExitCode::SUCCESS)
        }
        Commands::Health => {
            let report = health(&state).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.is_healthy() {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::FAILURE
            })
        }
        Commands::Config { reset } => {
            let config = if reset {
                reset_settings(&state).await?
            } else {
                get_settings(&state).await?
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}

//! entryscan - classify a candle window from a JSON request
//!
//! Reads an `{"ohlc_data": [...]}` document from a file or stdin and prints the
//! `{"strategy_suggestion": ..., "reason": ...}` result as JSON on stdout. Logs go to stderr.
//!
//! Exit status: 0 on success, 2 when the request is rejected, 1 on any other failure.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use entryscan::api::{handle_request, AnalysisRequest, ApiError};
use entryscan::{AnalyzerBuilder, AnalyzerConfig};

#[derive(Parser, Debug)]
#[command(name = "entryscan")]
#[command(about = "Classify an OHLC candle window as Limit Catch, In-Price or No Entry", long_about = None)]
#[command(version)]
struct Cli {
    /// Request JSON file (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Analyzer configuration JSON; fields it omits keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON result only
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    info!(path = %path.display(), "Loaded analyzer config");
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            Ok(buf)
        }
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(out)
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let analyzer = AnalyzerBuilder::new().config(config).build()?;

    let input = read_input(cli.input.as_deref())?;
    let outcome = serde_json::from_str::<AnalysisRequest>(&input)
        .map_err(|e| ApiError {
            status: ApiError::BAD_REQUEST,
            detail: format!("Invalid request: {e}"),
        })
        .and_then(|request| {
            info!(candles = request.ohlc_data.len(), "Analyzing request");
            handle_request(&analyzer, &request)
        });

    let (body, code) = match outcome {
        Ok(result) => {
            info!(signal = %result.strategy_suggestion, "Analysis complete");
            (to_json(&result, cli.pretty)?, ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::warn!(status = err.status, detail = %err.detail, "Request failed");
            let code = if err.is_client_error() { 2 } else { 1 };
            (to_json(&err, cli.pretty)?, ExitCode::from(code))
        }
    };

    println!("{body}");
    Ok(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

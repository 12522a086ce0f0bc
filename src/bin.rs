//! Binary entry point for `llama-bot`.
//!
//! This module provides the command-line interface for llama-bot with options
//! for configuration file paths and logging verbosity. It initializes the
//! necessary components and starts the bot.

use clap::Parser;
use llama_bot::base::{config::Config, types::Void};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Llama-bot – a Discord bot backed by a local LLM server.
///
/// Configuration comes from `config.yaml` and environment variables
/// (a `.env` file in the working directory is loaded first).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for `config.yaml` in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Explicit log level (`error`, `warn`, `info`, `debug`, `trace`); wins over `-v`.
    ///
    /// An unknown level is reported and ignored.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
    /// Export spans over OTLP/HTTP (configured through the `OTEL_EXPORTER_OTLP_*` variables).
    #[arg(long)]
    otlp: bool,
}

/// Main entry point for the llama-bot binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the bot.
#[tokio::main]
async fn main() -> Void {
    // Load `.env` before anything reads the environment.
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Construct the level filter.

    let explicit_level = args.log_level.as_deref().and_then(parse_log_level);

    let level = explicit_level.unwrap_or(match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    });

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("llama-bot");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    if let Some(raw) = args.log_level.as_deref()
        && !raw.trim().is_empty()
        && explicit_level.is_none()
    {
        tracing::warn!("LOG_LEVEL `{}` is invalid, ignoring it.", raw);
    }

    let config = Config::load(args.config.as_deref())?;

    llama_bot::start(config).await
}

/// Parse a log level name, case-insensitively; `None` when blank or unknown.
fn parse_log_level(raw: &str) -> Option<tracing::Level> {
    raw.trim().parse().ok()
}

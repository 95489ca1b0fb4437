//! Tracing configuration for the kvdemo binary.
//!
//! Two layers share one registry:
//!
//! - a `fmt` layer writing diagnostics to stderr, filtered by level or
//!   `RUST_LOG`
//! - a [`kvdemo_events::KvdemoEventLayer`] capturing every `emit_*!`
//!   progress event for the renderer, regardless of the diagnostic level
//!
//! Progress events are kept out of the `fmt` layer so they are printed once.

use kvdemo_events::{EventBus, EventReceiver, correlation_id};
use std::io;
pub use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, FilterExt, filter_fn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
    /// Development format with file and line
    Dev,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "dev" => Ok(Self::Dev),
            _ => Err(format!("Unknown tracing format: {s}")),
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format of the diagnostic layer
    pub format: TracingFormat,
    /// Level used when neither `filter` nor `RUST_LOG` is set
    pub level: Level,
    /// Include file and line in `Dev` output
    pub enable_file_location: bool,
    /// Explicit filter directives; `RUST_LOG` and `level` are ignored when set
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Pretty,
            level: Level::WARN,
            enable_file_location: true,
            filter: None,
        }
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Filter for the diagnostic layer.
///
/// # Errors
///
/// Returns an error if the directives in `config.filter` do not parse.
pub fn diagnostic_filter(config: &TracingConfig) -> miette::Result<EnvFilter> {
    if let Some(filter) = &config.filter {
        return EnvFilter::try_new(filter)
            .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"));
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = level_str(config.level);
            EnvFilter::try_new(format!(
                "kvdemo={level},kvdemo_core={level},kvdemo_azure={level},kvdemo_events={level}"
            ))
        })
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))
}

fn diagnostic_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    match config.format {
        TracingFormat::Pretty => layer.pretty().with_target(true).boxed(),
        TracingFormat::Compact => layer.compact().with_target(false).boxed(),
        TracingFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        TracingFormat::Dev => layer
            .with_file(config.enable_file_location)
            .with_line_number(config.enable_file_location)
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .boxed(),
    }
}

/// Progress events carry an `event_type` field; everything else is a diagnostic.
fn is_diagnostic(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.fields().field("event_type").is_none()
}

/// Install the global subscriber and return a receiver for progress events.
///
/// Must be called from within a tokio runtime: the event bus spawns its
/// forwarding task here.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing_with_events(config: &TracingConfig) -> miette::Result<EventReceiver> {
    let env_filter = diagnostic_filter(config)?;

    let bus = EventBus::new();
    let receiver = bus.subscribe();
    // The layer keeps the forwarding task alive after `bus` goes out of scope

    tracing_subscriber::registry()
        .with(diagnostic_layer(config).with_filter(env_filter.and(filter_fn(is_diagnostic))))
        .with(bus.layer())
        .try_init()
        .map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for kvdemo"
    );

    Ok(receiver)
}

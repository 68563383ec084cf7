//! Optional `tracing` subscriber for applications embedding brrtchain
//!
//! The library only emits events: chain steps at `trace`, routing outcomes at
//! `debug`, mounts at `info`. Hosts that already install a subscriber can
//! ignore this module. Others call [`init_logging_with_config`] once at
//! startup; `RUST_LOG` takes precedence over the configured level when set.

use std::env;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with target and thread id
    #[default]
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl LogFormat {
    /// Parse a format name case-insensitively; anything but `pretty` is JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Subscriber settings. `Default` is `info`, JSON, written synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a `tracing-appender` worker thread instead of the caller
    pub async_logging: bool,
    /// Extra `EnvFilter` directives (comma-separated), e.g. `brrtchain::chain=trace`
    pub target_filter: Option<String>,
    /// Include file:line in each event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `BRRTCHAIN_LOG_*` variables, falling back to [`LogConfig::default`]
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("BRRTCHAIN_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("BRRTCHAIN_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: env_bool("BRRTCHAIN_LOG_ASYNC").unwrap_or(defaults.async_logging),
            target_filter: env::var("BRRTCHAIN_LOG_TARGET_FILTER").ok(),
            include_location: env_bool("BRRTCHAIN_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(&config.log_level).as_str()));

    let directives = config.target_filter.as_deref().unwrap_or_default();
    for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
        }
    }
    env_filter
}

fn fmt_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);
    match config.format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Install a global stdout subscriber built from `config`.
///
/// With `async_logging` the returned guard owns the writer thread; keep it
/// alive until shutdown so buffered lines are flushed.
///
/// ```no_run
/// use brrtchain::logging::{init_logging_with_config, LogConfig};
///
/// let _guard = init_logging_with_config(&LogConfig::from_env())
///     .expect("Failed to initialize logging");
/// ```
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry().with(build_filter(config));

    if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        registry
            .with(fmt_layer(config, writer))
            .try_init()
            .context("Failed to initialize async logging")?;
        Ok(Some(guard))
    } else {
        registry
            .with(fmt_layer(config, std::io::stdout))
            .try_init()
            .context("Failed to initialize logging")?;
        Ok(None)
    }
}

/// Install a subscriber at `log_level`, other settings from the environment
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let config = LogConfig {
        log_level: log_level.to_string(),
        ..LogConfig::from_env()
    };
    init_logging_with_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sync_json() {
        let config = LogConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.async_logging);
        assert!(!config.include_location);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_target_filter_adds_directives() {
        let config = LogConfig {
            target_filter: Some("brrtchain::chain=trace, ".to_string()),
            ..LogConfig::default()
        };
        let filter = build_filter(&config);
        assert!(filter.to_string().contains("brrtchain::chain=trace"));
    }
}

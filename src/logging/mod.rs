//! Logging configuration and initialization
//!
//! The crate emits `tracing` events only; installing a subscriber is left to
//! the embedding compiler. This module offers a ready-made setup.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing filter (e.g., "info", "npuforge=trace")
//! - `NPUFORGE_LOG_LEVEL`: Simple log level (error, warn, info, debug, trace)
//! - `NPUFORGE_LOG_FORMAT`: Output format ("human" or "json")
//! - `NPUFORGE_LOG_FILE`: Optional file path for an additional JSON log

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Global flag to track if tracing has been initialized
static TRACING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Environment variable for log level override
const LOG_LEVEL_ENV: &str = "NPUFORGE_LOG_LEVEL";

/// Environment variable for log format (json/human)
const LOG_FORMAT_ENV: &str = "NPUFORGE_LOG_FORMAT";

/// Environment variable for log file path
const LOG_FILE_ENV: &str = "NPUFORGE_LOG_FILE";

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    #[error("failed to open log file: {0}")]
    FileOpenFailed(String),
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to EnvFilter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" | "console" => Some(LogFormat::Human),
            "json" | "structured" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include file/line in console output
    pub with_file_info: bool,
    /// Emit span close events (with timings)
    pub with_span_events: bool,
    /// Additional JSON log file
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_info(mut self, with_file_info: bool) -> Self {
        self.with_file_info = with_file_info;
        self
    }

    pub fn with_span_events(mut self, with_span_events: bool) -> Self {
        self.with_span_events = with_span_events;
        self
    }

    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Build a configuration from the `NPUFORGE_LOG_*` variables
    pub fn from_env() -> Self {
        let level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or_default();

        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default();

        let mut config = LoggingConfig::new().with_level(level).with_format(format);
        if let Some(file) = std::env::var_os(LOG_FILE_ENV) {
            config = config.with_log_file(PathBuf::from(file));
        }
        config
    }
}

/// Initialize logging from the environment, ignoring setup failures
///
/// Idempotent: only the first call installs a subscriber.
pub fn init_logging_default() {
    init_logging_from_env().ok();
}

/// Initialize logging from environment variables
///
/// Idempotent. Returns the setup error of the first call, if any.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let config = LoggingConfig::from_env();
    let mut result = Ok(());
    TRACING_INITIALIZED.get_or_init(|| {
        result = install(&config);
    });
    result
}

/// Initialize logging with a custom configuration
///
/// Idempotent.
pub fn init_with_config(config: &LoggingConfig) {
    TRACING_INITIALIZED.get_or_init(|| {
        let _ = install(config);
    });
}

/// Check if tracing has been initialized
pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.get().is_some()
}

fn install(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = build_env_filter(config.level)?;
    let log_file = match &config.log_file {
        Some(path) => Some(open_log_file(path)?),
        None => None,
    };
    let spans = span_events(config.with_span_events);

    // The file sink is always JSON without ANSI colors
    match config.format {
        LogFormat::Json => {
            let console = fmt::layer()
                .json()
                .with_target(false)
                .with_file(config.with_file_info)
                .with_line_number(config.with_file_info)
                .with_span_events(spans.clone());
            let file_layer = log_file.map(|file| {
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(spans.clone())
            });
            // try_init: another subscriber may already be installed by the host
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(file_layer)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            let console = fmt::layer()
                .with_target(true)
                .with_file(config.with_file_info)
                .with_line_number(config.with_file_info)
                .with_span_events(spans.clone());
            let file_layer = log_file.map(|file| {
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(spans.clone())
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(file_layer)
                .try_init()
                .ok();
        }
    }

    Ok(())
}

fn span_events(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LoggingError::DirectoryCreationFailed(e.to_string()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::FileOpenFailed(e.to_string()))
}

/// RUST_LOG wins over the configured level
fn build_env_filter(default_level: LogLevel) -> Result<EnvFilter, LoggingError> {
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        return EnvFilter::try_new(rust_log).map_err(|e| LoggingError::InvalidFilter(e.to_string()));
    }
    Ok(EnvFilter::new(default_level.as_filter_str()))
}

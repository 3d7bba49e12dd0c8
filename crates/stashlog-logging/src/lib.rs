//! Tracing subscriber setup for stashlog tools
//!
//! Console output (pretty or JSONL) goes to stderr so a tool's own stdout
//! stays machine-readable. File output is always JSONL, written through a
//! non-blocking writer with optional daily or hourly rotation.
//!
//! # Quick Start
//!
//! ```ignore
//! use stashlog_logging::{LogConfig, StashSubscriberBuilder};
//!
//! // Pretty console output at `info`
//! let _guard = StashSubscriberBuilder::new().init();
//!
//! // JSONL files under ./logs, nothing on the console
//! let _guard = StashSubscriberBuilder::new()
//!     .with_config(LogConfig::production("./logs".into()))
//!     .init();
//! ```
//!
//! `RUST_LOG` takes precedence over the configured levels.

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter directives: {0}")]
    Filter(String),

    #[error("Failed to create log appender: {0}")]
    Appender(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the stashlog subscriber
pub struct StashSubscriberBuilder {
    config: LogConfig,
}

impl StashSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch console output between pretty and JSONL
    pub fn with_pretty_console(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Get the configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns the file writer guard, which must be kept alive for the
    /// duration of the program when file output is enabled.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber has already been set or file output
    /// cannot be opened.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => panic!("Failed to initialize logging: {e}"),
        }
    }

    /// Try to initialize the subscriber globally
    ///
    /// Returns an error if a global subscriber has already been set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.config.directives()))
            .map_err(|e| LoggingError::Filter(e.to_string()))?;

        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let pretty_console = (console.enabled && console.pretty).then(|| {
            fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_writer(std::io::stderr)
        });

        let jsonl_console = (console.enabled && !console.pretty).then(|| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_writer(std::io::stderr)
        });

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                let layer = fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(jsonl.include_spans)
                    .flatten_event(jsonl.flatten_events)
                    .with_file(jsonl.include_location)
                    .with_line_number(jsonl.include_location)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for StashSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the non-blocking file writer; `Never` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log")
        .build(&config.directory)
        .map_err(|e| LoggingError::Appender(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Option<WorkerGuard> {
    StashSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = StashSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

//! Command-line interface and settings file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use stashlog::{FileStoreConfig, WindowConfig};
use stashlog_logging::LogConfig;

#[derive(Parser, Debug)]
#[command(
    name = "stashlog",
    version,
    about = "Inspect and maintain windowed durable logs"
)]
pub struct Cli {
    /// Settings file (TOML) with [window], [store] and [logging] sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Value type stored in the log
    #[arg(long, value_enum, default_value_t = LogKind::Series, global = true)]
    pub kind: LogKind,

    /// Override the window capacity
    #[arg(long, global = true)]
    pub max_ram_records: Option<usize>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the window and store of a log
    Inspect {
        /// Store path
        path: PathBuf,
        /// Also list every record in the store
        #[arg(long)]
        records: bool,
        /// Print records as hex blocks
        #[arg(long)]
        raw: bool,
    },
    /// Append values to a log
    Append {
        /// Store path
        path: PathBuf,
        /// Values to append, oldest first
        #[arg(required = true)]
        values: Vec<String>,
        /// Timestamp for the values (defaults to now, in seconds)
        #[arg(long)]
        timestamp: Option<u32>,
    },
    /// Acknowledge (drop) the oldest records
    Ack {
        /// Store path
        path: PathBuf,
        /// Number of records to drop
        count: usize,
    },
    /// Drop a torn final record, keeping every whole one
    Repair {
        /// Store path
        path: PathBuf,
    },
    /// Check a store for corruption
    Verify {
        /// Store path
        path: PathBuf,
    },
}

/// Value type of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Boolean events, 5-byte records
    Event,
    /// `f64` samples, 12-byte records
    Series,
}

/// Contents of the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowConfig,
    pub store: FileStoreConfig,
    pub logging: LogConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            store: FileStoreConfig::default(),
            logging: LogConfig {
                default_level: "warn".to_string(),
                ..LogConfig::default()
            },
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Window configuration with command-line overrides applied
    pub fn window_config(&self, cli: &Cli) -> WindowConfig {
        let mut window = self.window.clone();
        if let Some(max) = cli.max_ram_records {
            window.max_ram_records = max;
        }
        window
    }

    /// Logging configuration with command-line overrides applied
    pub fn log_config(&self, cli: &Cli) -> LogConfig {
        let mut logging = self.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.default_level = level.clone();
        }
        logging
    }
}

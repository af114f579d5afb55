//! Command implementations for the gf CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod cache;
pub mod completions;
pub mod config;
pub mod data;
pub mod filter;
pub mod presets;

use std::path::PathBuf;

use gridfilter::config::{ConfigError, EngineConfig};
use gridfilter::preset::PresetStore;
use gridfilter::store::StoreError;
use gridfilter::EngineError;

use crate::cli::Cli;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Filtering, preset or import error.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Result store error.
    #[error("cache error: {0}")]
    Store(#[from] StoreError),

    /// The data or model file is not in the expected shape.
    #[error("invalid input: {0}")]
    Input(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    /// Returns the stable error code used in JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Engine(EngineError::MalformedFilter { .. }) => "FILTER_ERROR",
            CommandError::Engine(EngineError::PresetNotFound { .. }) => "PRESET_NOT_FOUND",
            CommandError::Engine(EngineError::Worker(_)) => "WORKER_ERROR",
            CommandError::Engine(EngineError::ImportFormat(_)) => "INPUT_ERROR",
            CommandError::Engine(EngineError::Store(_)) | CommandError::Store(_) => "STORE_ERROR",
            CommandError::Engine(EngineError::Config(_)) | CommandError::Config(_) => {
                "CONFIG_ERROR"
            }
            CommandError::Engine(EngineError::Json(_)) | CommandError::Json(_) => "JSON_ERROR",
            CommandError::Input(_) => "INPUT_ERROR",
            CommandError::Io(_) => "IO_ERROR",
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Engine(EngineError::Worker(_)) => 2,
            CommandError::Io(_) => 3,
            CommandError::Engine(EngineError::PresetNotFound { .. }) => 4,
            CommandError::Engine(EngineError::Store(_))
            | CommandError::Engine(EngineError::Config(_))
            | CommandError::Store(_)
            | CommandError::Config(_) => 5,
            _ => 1,
        }
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
    /// Explicit config file, from `--config` or `GRIDFILTER_CONFIG`.
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color && std::env::var_os("NO_COLOR").is_none(),
            quiet: cli.quiet,
            verbose: cli.verbose,
            config_path: cli.config.clone(),
        }
    }

    /// Returns the config file this invocation uses.
    pub fn config_file(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(gridfilter::config::config_path()?),
        }
    }

    /// Loads the engine config; a missing file yields defaults.
    pub fn load_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig::load_from(&self.config_file()?)?)
    }

    /// Opens the preset file named by the config, or the default one.
    pub fn open_presets(&self, config: &EngineConfig) -> Result<PresetStore> {
        let path = match &config.presets.path {
            Some(path) => path.clone(),
            None => PresetStore::default_path()?,
        };
        tracing::debug!(path = %path.display(), "opening preset store");
        Ok(PresetStore::open(path)?)
    }
}

//! Engine configuration.
//!
//! Configuration is read from a TOML file at `~/.config/gridfilter/config.toml`
//! (or `$XDG_CONFIG_HOME/gridfilter/config.toml`). The `GRIDFILTER_CONFIG`
//! environment variable overrides the path. A missing file yields defaults,
//! and every section and field may be omitted.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{self, StoreError};

/// Current config file version. Increment when making breaking changes to schema.
pub const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the config file path.
pub const CONFIG_ENV_VAR: &str = "GRIDFILTER_CONFIG";

const CONFIG_FILENAME: &str = "config.toml";

/// Default config file contents, written by `gf config init`.
pub const DEFAULT_CONFIG: &str = r#"# gridfilter configuration

# Config schema version (do not modify)
version = 1

# In-memory result cache
[cache]
# max_entries = 100
# ttl_secs = 30
# sample_size = 10          # leading rows folded into the dataset fingerprint

# On-disk result cache (shared between runs)
[persistent]
# enabled = false
# path = "/path/to/results.json"
# ttl_secs = 3600
# max_entries = 500

# Parallel evaluation for large datasets
[worker]
# enabled = true
# threshold = 10000         # rows; smaller datasets are filtered inline
# timeout_ms = 30000
# chunk_size = 2048

[history]
# max_entries = 50

[text]
# case_sensitive = false
# fuzzy_threshold = 0.8

[metrics]
# capacity = 100
# hit_rate_window = 20

[presets]
# path = "/path/to/presets.json"
"#;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not determine the config directory.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// Failed to read the config file.
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to serialize the config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Failed to write the config file.
    #[error("failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value is out of range.
    #[error("invalid config value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config schema version for migrations.
    pub version: u32,
    pub cache: CacheConfig,
    pub persistent: PersistentConfig,
    pub worker: WorkerConfig,
    pub history: HistoryConfig,
    pub text: TextConfig,
    pub metrics: MetricsConfig,
    pub presets: PresetsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            cache: CacheConfig::default(),
            persistent: PersistentConfig::default(),
            worker: WorkerConfig::default(),
            history: HistoryConfig::default(),
            text: TextConfig::default(),
            metrics: MetricsConfig::default(),
            presets: PresetsConfig::default(),
        }
    }
}

/// In-memory result cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_secs: u64,
    /// Number of leading rows hashed into the dataset fingerprint.
    pub sample_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            sample_size: crate::fingerprint::DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Persistent result store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    pub enabled: bool,
    /// Store location; the XDG cache directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            ttl_secs: store::DEFAULT_PERSISTENT_TTL.as_secs(),
            max_entries: store::DEFAULT_PERSISTENT_MAX_ENTRIES,
        }
    }
}

impl PersistentConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Builds the result store described by this section, if enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the default cannot be determined.
    pub fn result_store(&self) -> std::result::Result<Option<store::ResultStore>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }
        let path = match &self.path {
            Some(path) => path.clone(),
            None => store::ResultStore::default_path()?,
        };
        Ok(Some(
            store::ResultStore::with_path(path)
                .with_ttl(self.ttl())
                .with_max_entries(self.max_entries),
        ))
    }
}

/// Parallel worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    /// Minimum dataset size, in rows, for delegating to the worker.
    pub threshold: usize,
    pub timeout_ms: u64,
    pub chunk_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: crate::dispatcher::DEFAULT_WORKER_THRESHOLD,
            timeout_ms: crate::dispatcher::DEFAULT_WORKER_TIMEOUT.as_millis() as u64,
            chunk_size: crate::dispatcher::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl WorkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: crate::history::DEFAULT_MAX_HISTORY,
        }
    }
}

/// Defaults for text predicates that do not set their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub case_sensitive: bool,
    pub fuzzy_threshold: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            fuzzy_threshold: crate::filter::DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub capacity: usize,
    pub hit_rate_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            capacity: crate::metrics::DEFAULT_CAPACITY,
            hit_rate_window: crate::metrics::DEFAULT_HIT_RATE_WINDOW,
        }
    }
}

/// Preset persistence. Presets stay in memory when no path is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl EngineConfig {
    /// Loads the config from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or validated.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads the config from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let config = migrate(config);
        config.validate()?;
        Ok(config)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.text.fuzzy_threshold) {
            return Err(invalid("text.fuzzy_threshold", "must be between 0 and 1"));
        }
        if self.worker.chunk_size == 0 {
            return Err(invalid("worker.chunk_size", "must be greater than 0"));
        }
        if self.worker.timeout_ms == 0 {
            return Err(invalid("worker.timeout_ms", "must be greater than 0"));
        }
        if self.metrics.capacity == 0 {
            return Err(invalid("metrics.capacity", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Migrates a config to the current schema version.
fn migrate(mut config: EngineConfig) -> EngineConfig {
    // Version 1 is the initial schema.
    config.version = CONFIG_VERSION;
    config
}

/// Returns the config file path.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` if no home directory can be found.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config)
            .join(store::APPLICATION)
            .join(CONFIG_FILENAME));
    }

    BaseDirs::new()
        .map(|dirs| {
            dirs.home_dir()
                .join(".config")
                .join(store::APPLICATION)
                .join(CONFIG_FILENAME)
        })
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.ttl(), Duration::from_secs(30));
        assert_eq!(config.cache.sample_size, 10);
        assert!(!config.persistent.enabled);
        assert_eq!(config.persistent.ttl(), Duration::from_secs(3600));
        assert_eq!(config.worker.threshold, 10_000);
        assert_eq!(config.worker.timeout(), Duration::from_secs(30));
        assert_eq!(config.history.max_entries, 50);
        assert_eq!(config.text.fuzzy_threshold, 0.8);
        assert_eq!(config.metrics.capacity, 100);
        assert_eq!(config.metrics.hit_rate_window, 20);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: EngineConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_deserialization_empty() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_deserialization_partial() {
        let config: EngineConfig = toml::from_str(
            r#"
[worker]
threshold = 500

[text]
case_sensitive = true
"#,
        )
        .unwrap();

        assert_eq!(config.worker.threshold, 500);
        assert!(config.worker.enabled);
        assert!(config.text.case_sensitive);
        assert_eq!(config.text.fuzzy_threshold, 0.8);
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = EngineConfig::default();
        config.text.fuzzy_threshold = 1.5;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text.fuzzy_threshold"));
    }

    #[test]
    fn test_load_from_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.persistent.enabled = true;
        config.persistent.path = Some(dir.path().join("results.json"));
        config.history.max_entries = 5;
        config.save_to(&path).unwrap();

        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[worker]\nthreshold = \"many\"\n").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_future_version_is_migrated() {
        let config: EngineConfig = toml::from_str("version = 999").unwrap();
        assert_eq!(migrate(config).version, CONFIG_VERSION);
    }

    #[test]
    fn test_persistent_store_only_when_enabled() {
        let dir = tempdir().unwrap();
        let mut section = PersistentConfig {
            path: Some(dir.path().join("results.json")),
            ..PersistentConfig::default()
        };
        assert!(section.result_store().unwrap().is_none());

        section.enabled = true;
        let store = section.result_store().unwrap().unwrap();
        assert_eq!(store.path(), dir.path().join("results.json"));
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        env::set_var(CONFIG_ENV_VAR, &path);

        let resolved = config_path();
        env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(resolved.unwrap(), path);
    }

    #[test]
    #[serial]
    fn test_config_path_xdg() {
        env::remove_var(CONFIG_ENV_VAR);
        env::set_var("XDG_CONFIG_HOME", "/tmp/xdg-test");

        let resolved = config_path();
        env::remove_var("XDG_CONFIG_HOME");

        assert_eq!(
            resolved.unwrap(),
            PathBuf::from("/tmp/xdg-test/gridfilter/config.toml")
        );
    }
}

//! Configuration file loading for position analysis.
//!
//! Settings live in `analysis.toml`:
//!
//! ```toml
//! [engine]
//! path = "/usr/games/gnubg"   # optional; resolved from PATH otherwise
//! args = ["-t", "-q"]
//! timeout_secs = 300          # per position
//! temp_dir = "/var/tmp"       # optional
//!
//! [pool]
//! workers = 0                 # 0 = available CPUs minus two
//! positions_per_engine = 1     # 0 = spread evenly, one engine per worker
//!
//! [analysis]
//! plies = 3
//! cube_plies = 3
//! cubeful = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use xgid_core::AnalysisParams;

use crate::coordinator::Coordinator;
use crate::engine::{AnalysisEngine, DEFAULT_ENGINE_ARGS, DEFAULT_TIMEOUT_PER_POSITION};
use crate::locator::EngineLocator;
use crate::AnalysisError;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A value is outside its accepted range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How to find and run the engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Explicit executable. Defaults to the platform's console build on `PATH`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Command-line arguments. Defaults to `["-t", "-q"]`.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Time bound per analysed position. Defaults to 300.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory for result files. Defaults to the system temp directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_args() -> Vec<String> {
    DEFAULT_ENGINE_ARGS.iter().map(|a| a.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_PER_POSITION.as_secs()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            temp_dir: None,
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Concurrent engine processes; `0` picks a size from the CPU count.
    #[serde(default)]
    pub workers: usize,
    /// Consecutive positions analysed by one engine process. Defaults to 1;
    /// `0` spreads the batch evenly with one engine process per worker.
    #[serde(default = "default_positions_per_engine")]
    pub positions_per_engine: usize,
}

fn default_positions_per_engine() -> usize {
    1
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            positions_per_engine: default_positions_per_engine(),
        }
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub analysis: AnalysisParams,
}

impl AnalysisConfig {
    /// Loads `analysis.toml` from the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be
    /// read, [`ConfigError::ParseError`] for invalid TOML, and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn config_path() -> PathBuf {
        PathBuf::from("analysis.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.timeout_secs must be positive".to_string(),
            ));
        }
        self.analysis
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("analysis: {}", e)))
    }

    pub fn timeout_per_position(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    /// Returns a locator honouring `engine.path`.
    pub fn locator(&self) -> EngineLocator {
        EngineLocator::new().with_override(self.engine.path.clone())
    }

    /// Resolves the engine and applies the engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EngineNotFound`] if no engine can be located.
    pub fn build_engine(&self, locator: &EngineLocator) -> Result<AnalysisEngine, AnalysisError> {
        Ok(AnalysisEngine::locate(locator)?
            .with_args(self.engine.args.iter().cloned())
            .with_timeout(self.timeout_per_position())
            .with_temp_dir(self.engine.temp_dir.clone()))
    }

    /// Builds a coordinator for the configured engine and pool.
    pub fn coordinator(&self, locator: &EngineLocator) -> Result<Coordinator, AnalysisError> {
        Ok(Coordinator::new(self.build_engine(locator)?)
            .with_workers(self.pool.workers)
            .with_positions_per_engine(self.pool.positions_per_engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Platform;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[engine]
path = "/usr/games/gnubg"
args = ["-t"]
timeout_secs = 60
temp_dir = "/var/tmp"

[pool]
workers = 4
positions_per_engine = 5

[analysis]
plies = 2
cube_plies = 1
cubeful = false
"#;

        let config = AnalysisConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.engine.path, Some(PathBuf::from("/usr/games/gnubg")));
        assert_eq!(config.engine.args, vec!["-t"]);
        assert_eq!(config.timeout_per_position(), Duration::from_secs(60));
        assert_eq!(config.engine.temp_dir, Some(PathBuf::from("/var/tmp")));
        assert_eq!(config.pool.workers, 4);
        assert_eq!(config.pool.positions_per_engine, 5);
        assert_eq!(config.analysis.plies, 2);
        assert_eq!(config.analysis.cube_plies, 1);
        assert!(!config.analysis.cubeful);
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();

        assert_eq!(config, AnalysisConfig::default());
        assert!(config.engine.path.is_none());
        assert_eq!(config.engine.args, vec!["-t", "-q"]);
        assert_eq!(config.engine.timeout_secs, 300);
        assert_eq!(config.pool.workers, 0);
        assert_eq!(config.pool.positions_per_engine, 1);
        assert_eq!(config.analysis, AnalysisParams::default());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config = AnalysisConfig::from_toml_str("[pool]\nworkers = 2\n").unwrap();
        assert_eq!(config.pool.workers, 2);
        assert_eq!(config.pool.positions_per_engine, 1);
        assert_eq!(config.engine.timeout_secs, 300);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = AnalysisConfig::from_toml_str("[engine]\ntimeout_secs = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("timeout_secs")));
    }

    #[test]
    fn test_zero_positions_per_engine_spreads_evenly() {
        let config = AnalysisConfig::from_toml_str("[pool]\npositions_per_engine = 0\n").unwrap();
        assert_eq!(config.pool.positions_per_engine, 0);

        let exe = tempfile::NamedTempFile::new().unwrap();
        let locator = EngineLocator::for_platform(Platform::Unix).with_override(Some(exe.path().to_path_buf()));
        let coordinator = config.coordinator(&locator).unwrap();
        assert_eq!(coordinator.positions_per_engine(), 0);
    }

    #[test]
    fn test_rejects_excessive_plies() {
        let result = AnalysisConfig::from_toml_str("[analysis]\nplies = 9\n");
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("plies")),
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml() {
        let result = AnalysisConfig::from_toml_str("[engine\npath = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::load_from(&dir.path().join("analysis.toml")).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, "[engine]\ntimeout_secs = 12\n").unwrap();

        let config = AnalysisConfig::load_from(&path).unwrap();
        assert_eq!(config.engine.timeout_secs, 12);
    }

    #[test]
    fn test_config_path_returns_expected_path() {
        assert_eq!(AnalysisConfig::config_path(), PathBuf::from("analysis.toml"));
    }

    #[test]
    fn test_build_engine_applies_settings() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let config = AnalysisConfig {
            engine: EngineConfig {
                path: Some(exe.path().to_path_buf()),
                args: vec!["-t".to_string()],
                timeout_secs: 7,
                temp_dir: None,
            },
            ..AnalysisConfig::default()
        };

        let locator = EngineLocator::for_platform(Platform::Unix).with_override(config.engine.path.clone());
        let engine = config.build_engine(&locator).unwrap();
        assert_eq!(engine.executable(), exe.path());
        assert_eq!(engine.args(), ["-t"]);
        assert_eq!(engine.timeout_for(2), Duration::from_secs(14));
    }

    #[test]
    fn test_coordinator_fails_fast_without_engine() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::default();
        let locator = EngineLocator::for_platform(Platform::Unix).with_search_path(dir.path().as_os_str());
        assert!(matches!(
            config.coordinator(&locator),
            Err(AnalysisError::EngineNotFound(_))
        ));
    }
}

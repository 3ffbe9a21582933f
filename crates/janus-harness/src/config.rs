use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Harness configuration, from `JANUS_*` environment variables or a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// SDK installation directory handed to the SDK's initialize hook.
    pub sdk_path: PathBuf,
    /// Scratch directory for the SDK.
    pub temp_path: PathBuf,
    /// Algorithm selector passed through to the SDK.
    pub algorithm: String,
    /// Joined in front of every metadata `File_Name`.
    pub data_prefix: Option<PathBuf>,
    /// Print enrollment and comparison progress to stderr.
    pub verbose: bool,
    /// Where to write the per-stage metrics summary at the end of a run.
    pub metrics_json: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            sdk_path: PathBuf::from("."),
            temp_path: std::env::temp_dir(),
            algorithm: String::new(),
            data_prefix: None,
            verbose: false,
            metrics_json: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `JANUS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment-shaped).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            sdk_path: lookup("JANUS_SDK_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sdk_path),
            temp_path: lookup("JANUS_TEMP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_path),
            algorithm: lookup("JANUS_ALGORITHM").unwrap_or(defaults.algorithm),
            data_prefix: lookup("JANUS_DATA_PREFIX")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            verbose: lookup("JANUS_VERBOSE")
                .map(|v| v != "0" && !v.is_empty())
                .unwrap_or(defaults.verbose),
            metrics_json: lookup("JANUS_METRICS_JSON")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&src)
    }
}

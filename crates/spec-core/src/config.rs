//! Runner configuration loaded from `spec.config.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::ReportFormat;

/// File name looked up in a spec directory.
pub const CONFIG_FILE_NAME: &str = "spec.config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub color: bool,
    pub verbose: bool,
    pub format: ReportFormat,
    /// Glob patterns, relative to the spec directory, selecting spec files.
    pub spec_patterns: Vec<String>,
    /// Paths containing one of these (or matching, when it has wildcards) are skipped.
    pub exclude_patterns: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            color: true,
            verbose: false,
            format: ReportFormat::Tree,
            spec_patterns: vec!["**/*.spec.yaml".into(), "**/*.spec.yml".into()],
            exclude_patterns: vec!["target/".into()],
        }
    }
}

/// Load `spec.config.yaml` from `dir`. A missing file yields the defaults.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(dir: &Path) -> Result<RunnerConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(RunnerConfig::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    serde_yml::from_str(&content).map_err(|source| ConfigError::Yaml { path, source })
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub color: Option<bool>,
    pub verbose: Option<bool>,
    pub format: Option<ReportFormat>,
}

/// Apply CLI overrides on top of a loaded config.
#[must_use]
pub fn apply_overrides(mut config: RunnerConfig, overrides: &ConfigOverrides) -> RunnerConfig {
    if let Some(color) = overrides.color {
        config.color = color;
    }
    if let Some(verbose) = overrides.verbose {
        config.verbose = verbose;
    }
    if let Some(format) = overrides.format {
        config.format = format;
    }
    config
}

//! Crawler configuration.
//!
//! Loaded from YAML; every field has a default so an empty or missing file
//! yields a runnable configuration.

use std::path::{Path, PathBuf};

use a11y_scheduler::table::{HEADINGS, IMAGE_ALT, LINK_PURPOSE, SCREEN_READER, TAB_NAVIGATION};
use a11y_scheduler::ProbeTable;
use anyhow::{Context, Result};
use element_identity::BatchOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/crawler.yaml";
/// Comma-separated probe names overriding `enabled_probes`.
pub const PROBES_ENV: &str = "A11Y_CRAWLER_PROBES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("batch.size must be at least 1")]
    ZeroBatchSize,
    #[error("batch.workers must be at least 1")]
    ZeroWorkers,
    #[error("logging.level '{0}' is not a tracing level")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    pub enabled_probes: Vec<String>,
    /// Enable a missing dependency that exists in the probe table instead of
    /// failing the plan.
    pub auto_enable_dependencies: bool,
    /// Run each phase's parallel-safe probes concurrently.
    pub parallel_probes: bool,
    pub batch: BatchOptions,
    /// Replaces the built-in probe table.
    pub probe_table: Option<ProbeTable>,
    pub logging: LoggingConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled_probes: [SCREEN_READER, IMAGE_ALT, HEADINGS, TAB_NAVIGATION, LINK_PURPOSE]
                .into_iter()
                .map(String::from)
                .collect(),
            auto_enable_dependencies: true,
            parallel_probes: true,
            batch: BatchOptions::default(),
            probe_table: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn with_probes<I, S>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_probes = probes.into_iter().map(Into::into).collect();
        self
    }

    pub fn probe_table(&self) -> ProbeTable {
        self.probe_table.clone().unwrap_or_else(ProbeTable::builtin)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.batch.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }
        Ok(())
    }

    /// Applies a comma-separated probe list; blank entries are ignored and a
    /// blank list leaves the configuration untouched.
    pub fn apply_probe_override(&mut self, raw: &str) -> bool {
        let probes: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if probes.is_empty() {
            return false;
        }
        self.enabled_probes = probes;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

pub struct LoadedConfig {
    pub config: CrawlerConfig,
    pub path: PathBuf,
    /// False when the file was absent and defaults were used.
    pub from_file: bool,
}

pub async fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let (mut config, from_file) = if fs::metadata(&path).await.is_ok() {
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config: CrawlerConfig = if raw.trim().is_empty() {
            CrawlerConfig::default()
        } else {
            serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        };
        info!("Loaded configuration from: {}", path.display());
        (config, true)
    } else {
        warn!("Config file not found at {}, using defaults", path.display());
        (CrawlerConfig::default(), false)
    };

    if let Ok(raw) = std::env::var(PROBES_ENV) {
        if config.apply_probe_override(&raw) {
            info!(probes = ?config.enabled_probes, "enabled probes overridden from {}", PROBES_ENV);
        }
    }

    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;

    Ok(LoadedConfig {
        config,
        path,
        from_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_builtin_probe() {
        let config = CrawlerConfig::default();
        let table = config.probe_table();
        assert_eq!(config.enabled_probes.len(), 5);
        assert!(config.enabled_probes.iter().all(|name| table.contains(name)));
        assert!(config.auto_enable_dependencies);
        assert_eq!(config.batch, BatchOptions { size: 50, workers: 4 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: CrawlerConfig = serde_yaml::from_str(
            "enabled_probes: [tab_navigation]\nbatch:\n  workers: 2\nlogging:\n  json: true\n",
        )
        .unwrap();
        assert_eq!(config.enabled_probes, vec!["tab_navigation"]);
        assert_eq!(config.batch.size, 50);
        assert_eq!(config.batch.workers, 2);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validation_rejects_zero_sizes_and_bad_levels() {
        let mut config = CrawlerConfig::default();
        config.batch.size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));
        config.batch.size = 1;
        config.batch.workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));
        config.batch.workers = 1;
        config.logging.level = "loud".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn probe_override_ignores_blanks() {
        let mut config = CrawlerConfig::default();
        assert!(!config.apply_probe_override(" , "));
        assert_eq!(config.enabled_probes.len(), 5);
        assert!(config.apply_probe_override("headings, image_alt,"));
        assert_eq!(config.enabled_probes, vec!["headings", "image_alt"]);
    }
}

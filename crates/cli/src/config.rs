use anyhow::{Context, Result};
use harvest::HarvestConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings of the `senate-votes` binary.
///
/// ```toml
/// database = "senate.db"
/// log_file = "senate.txt"
///
/// [harvest]
/// page_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: PathBuf,
    /// Progress log written by `scrape --debug`.
    pub log_file: PathBuf,
    pub harvest: HarvestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("senate.db"),
            log_file: PathBuf::from("senate.txt"),
            harvest: HarvestConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path` if given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::parse(&raw).with_context(|| format!("in config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.harvest.validate()?;
        Ok(config)
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_database(mut self, database: Option<PathBuf>) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        self
    }
}

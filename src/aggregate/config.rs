use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use deodar::dedupe::DEFAULT_THRESHOLD;
use deodar::ClusterPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    pub global: GlobalConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    pub output_dir: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub policy: ClusterPolicy,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Source label carried into provenance.
    pub name: String,
    /// CSV or JSON candidate file produced by the scraper.
    pub path: PathBuf,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: RunConfig = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

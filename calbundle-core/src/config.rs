//! Ingestion configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{IngestError, IngestResult};

static DEFAULT_SOURCE_DIR: &str = "./cal.icbu";
static DEFAULT_DATABASE: &str = "./db.sqlite";

fn default_source_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_DIR)
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

/// Configuration at ~/.config/calbundle/config.toml
///
/// Every key is optional. `CALBUNDLE_SOURCE_DIR` and `CALBUNDLE_DATABASE`
/// override the file.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Root of the calendar store to ingest
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// SQLite file the snapshot is written to (recreated on every run)
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            source_dir: default_source_dir(),
            database: default_database(),
        }
    }
}

impl IngestConfig {
    pub fn config_path() -> IngestResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IngestError::Config("Could not determine config directory".into()))?
            .join("calbundle");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default config path. A missing file yields the defaults.
    pub fn load() -> IngestResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> IngestResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("CALBUNDLE"))
            .build()
            .map_err(|e| IngestError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Source root with `~` expanded.
    pub fn source_path(&self) -> PathBuf {
        expand_tilde(&self.source_dir)
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.database)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

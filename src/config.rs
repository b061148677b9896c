use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::btree::DEFAULT_ORDER;
use crate::record::{BlockLayout, DEFAULT_PAGE_SIZE, GameRecord};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Storage and index parameters
///
/// Every field is optional in the JSON file; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bytes per block
    pub page_size: usize,
    /// B+ tree order (max children per internal node)
    pub order: usize,
    /// Block file name, relative to the output directory
    pub data_file: PathBuf,
    /// Index file name, relative to the output directory
    pub index_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order: DEFAULT_ORDER,
            data_file: PathBuf::from("data.db"),
            index_file: PathBuf::from("index.db"),
        }
    }
}

impl StoreConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject parameters the store or index cannot be built with
    pub fn validate(&self) -> ConfigResult<()> {
        if BlockLayout::calculate_capacity(self.page_size) == 0 {
            return Err(ConfigError::Invalid(format!(
                "page_size {} cannot hold a single {}-byte record",
                self.page_size,
                GameRecord::SIZE
            )));
        }
        if self.order < 3 {
            return Err(ConfigError::Invalid(format!(
                "order {} is below the minimum of 3",
                self.order
            )));
        }
        if self.data_file == self.index_file {
            return Err(ConfigError::Invalid(format!(
                "data_file and index_file are both {}",
                self.data_file.display()
            )));
        }
        Ok(())
    }
}

//! Configuration loading from the environment.

use std::path::{Path, PathBuf};

/// Environment variable naming the data directory.
pub const DATA_DIR_VAR: &str = "SETTLEMENT_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "data/expenses";

pub const FORMS_FILE: &str = "expense_forms.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Where the record collection and settings documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    data_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests pass a closure).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn forms_path(&self) -> PathBuf {
        self.data_dir.join(FORMS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use settlement_expense::ExpenseSettings;

use crate::atomic;
use crate::store::StoreError;

/// The `settings.json` document holding categories and the currency catalog.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to the defaults when the file is absent.
    pub fn load(&self) -> Result<ExpenseSettings, StoreError> {
        match atomic::read_json(&self.path)? {
            Some(settings) => Ok(settings),
            None => {
                warn!(path = %self.path.display(), "settings file missing, using defaults");
                Ok(ExpenseSettings::default())
            }
        }
    }

    pub fn save(&self, settings: &ExpenseSettings) -> Result<(), StoreError> {
        atomic::write_json(&self.path, settings)?;
        info!(
            path = %self.path.display(),
            categories = settings.categories().len(),
            currencies = settings.currencies().codes().len(),
            "settings saved"
        );
        Ok(())
    }
}

pub mod exam;
pub mod export;
pub mod grade;
pub mod history;
pub mod import;
pub mod init;
pub mod report;
pub mod subjects;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use examprep_core::bank::{load_bank_directory, StaticBank};
use examprep_core::store::{History, JsonFileStore};
use examprep_providers::{load_config_from, ExamprepConfig};

/// Loaded configuration plus accessors for the stores it points at.
pub struct Workspace {
    pub config: ExamprepConfig,
}

impl Workspace {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        tracing::debug!(
            history = %config.history_path.display(),
            banks = %config.bank_dir.display(),
            "loaded config"
        );
        Ok(Self { config })
    }

    pub fn history(&self) -> History {
        History::new(Arc::new(JsonFileStore::new(&self.config.history_path)))
    }

    pub fn bank(&self) -> Result<StaticBank> {
        let dir = &self.config.bank_dir;
        let bank = load_bank_directory(dir)
            .with_context(|| format!("failed to load question banks from {}", dir.display()))?;
        anyhow::ensure!(
            !bank.is_empty(),
            "no question banks found in {}",
            dir.display()
        );
        Ok(bank)
    }
}

/// Shorten `text` to at most `max` characters for table cells.
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

//! The `examprep export` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use examprep_core::transfer::ImportExportManager;

use super::Workspace;

pub fn execute(config_path: Option<&Path>, subject: String, output: Option<PathBuf>) -> Result<()> {
    let history = Workspace::load(config_path)?.history();
    let manager = ImportExportManager::new(history);
    let json = manager.export_json(&subject)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let count = manager.export(&subject)?.len();
            eprintln!("Exported {count} records to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

//! The `examprep import` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use examprep_core::transfer::{ImportExportManager, ImportMode, ImportOptions};

use super::Workspace;

pub fn execute(
    config_path: Option<&Path>,
    subject: String,
    file: PathBuf,
    mode: String,
    strict: bool,
) -> Result<()> {
    let mode: ImportMode = mode.parse().map_err(anyhow::Error::msg)?;
    let document = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let history = Workspace::load(config_path)?.history();
    let outcome = ImportExportManager::new(history).import_str(
        &document,
        &subject,
        ImportOptions { mode, strict },
    )?;

    if outcome.is_no_new_data() {
        println!(
            "No new data: all {} records already exist.",
            outcome.skipped_existing
        );
    } else {
        println!(
            "Imported {} records for '{subject}' ({mode}).",
            outcome.imported
        );
        if outcome.removed > 0 {
            println!("Replaced {} existing records.", outcome.removed);
        }
        if outcome.skipped_existing > 0 {
            println!("Skipped {} records that already exist.", outcome.skipped_existing);
        }
    }
    if outcome.dropped_invalid > 0 {
        println!("Dropped {} invalid records.", outcome.dropped_invalid);
    }
    if outcome.discarded_other_subject > 0 {
        println!(
            "Ignored {} records belonging to other subjects.",
            outcome.discarded_other_subject
        );
    }

    Ok(())
}

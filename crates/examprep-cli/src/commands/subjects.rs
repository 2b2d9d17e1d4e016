//! The `examprep subjects` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use examprep_core::traits::QuestionBank;

use super::Workspace;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let bank = Workspace::load(config_path)?.bank()?;

    let mut table = Table::new();
    table.set_header(vec!["Code", "Subject", "Questions"]);
    for subject in bank.subjects() {
        table.add_row(vec![
            subject.code,
            subject.name,
            subject.total_questions.to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

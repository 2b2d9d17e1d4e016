//! The `examprep history` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::Workspace;

pub fn execute(config_path: Option<&Path>, subject: Option<String>) -> Result<()> {
    let history = Workspace::load(config_path)?.history();

    let mut records = history.list_all()?;
    if let Some(subject) = &subject {
        records.retain(|r| &r.subject_id == subject);
    }

    if records.is_empty() {
        println!("No exams recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Exam", "Subject", "Date", "Questions", "Score", "Status"]);
    for record in &records {
        let score = record
            .overall_score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(&record.id),
            Cell::new(&record.subject_id),
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(record.total_questions),
            Cell::new(score),
            Cell::new(record.status),
        ]);
    }

    println!("{table}");
    Ok(())
}

//! The `examprep report` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_core::statistics::{compute_subject_stats, subject_trend};
use examprep_core::traits::QuestionBank;

use super::Workspace;

pub fn execute(config_path: Option<&Path>, subject: Option<String>) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let records = workspace.history().records()?;

    match subject {
        Some(subject) => print_trend(&records, &subject),
        None => {
            let catalog = workspace.bank()?.subjects();
            let stats = compute_subject_stats(&records, &catalog);

            let mut table = Table::new();
            table.set_header(vec!["Subject", "Bank", "Answered", "Attempts", "Coverage"]);
            for s in &stats {
                table.add_row(vec![
                    Cell::new(format!("{} ({})", s.name, s.code)),
                    Cell::new(s.total_questions_in_bank),
                    Cell::new(s.unique_answered),
                    Cell::new(s.total_attempts),
                    Cell::new(format!("{:.0}%", s.coverage)),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}

fn print_trend(records: &[examprep_core::model::ExamRecord], subject: &str) {
    let trend = subject_trend(records, subject);
    if trend.points.is_empty() {
        println!("No graded exams for '{subject}' yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Exam", "Questions", "Score"]);
    for point in &trend.points {
        table.add_row(vec![
            Cell::new(point.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(&point.exam_id),
            Cell::new(point.total_questions),
            Cell::new(format!("{:.1}", point.overall_score)),
        ]);
    }

    println!("{table}");
    println!(
        "Graded exams: {}  Cumulative average: {:.1}%",
        trend.graded_exams(),
        trend.average_score
    );
}

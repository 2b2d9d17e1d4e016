//! The `examprep validate` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use examprep_core::bank::{load_bank_directory, parse_subject, validate_subject};
use examprep_core::model::Subject;
use examprep_core::traits::QuestionBank;

use super::Workspace;

pub fn execute(config_path: Option<&Path>, bank: Option<PathBuf>) -> Result<()> {
    let path = match bank {
        Some(path) => path,
        None => Workspace::load(config_path)?.config.bank_dir,
    };

    let subjects: Vec<Subject> = if path.is_dir() {
        let bank = load_bank_directory(&path)?;
        bank.subjects()
            .iter()
            .filter_map(|s| bank.subject(&s.code).cloned())
            .collect()
    } else {
        vec![parse_subject(&path)?]
    };

    anyhow::ensure!(!subjects.is_empty(), "no question banks found in {}", path.display());

    let mut total_warnings = 0;
    for subject in &subjects {
        println!(
            "Subject: {} ({}, {} questions)",
            subject.display_name,
            subject.code,
            subject.question_count()
        );

        let warnings = validate_subject(subject);
        for w in &warnings {
            let prefix = w
                .question_id
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

//! The `examprep grade` command.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_core::grading::{GradingOrchestrator, GradingProgress};
use examprep_core::model::ExamRecord;

use super::{truncate, Workspace};

/// Console progress reporter.
struct ConsoleProgress;

impl GradingProgress for ConsoleProgress {
    fn on_answer_start(&self, index: usize, total: usize, question_id: u32) {
        eprintln!("  Grading {}/{total} (question {question_id})", index + 1);
    }

    fn on_progress(&self, fraction: f64) {
        eprintln!("  Progress: {:.0}%", fraction * 100.0);
    }

    fn on_complete(&self, record: &ExamRecord, elapsed: Duration) {
        eprintln!(
            "\nGraded {} answers ({:.1}s)",
            record.answers.len(),
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    config_path: Option<&Path>,
    exam_id: String,
    force: bool,
    provider: Option<String>,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let history = workspace.history();

    let existing = history.get(&exam_id)?;
    if existing.is_graded() && !force {
        println!(
            "Exam {exam_id} is already graded ({:.1}). Use --force to regrade.",
            existing.overall_score.unwrap_or_default()
        );
        print_result(&existing);
        return Ok(());
    }

    let grader = workspace.config.grader(provider.as_deref())?;
    eprintln!("Grading with {} ({})", grader.name(), grader.model());

    let orchestrator =
        GradingOrchestrator::new(grader, history, workspace.config.grading_config());
    let graded = orchestrator.grade(&exam_id, force, &ConsoleProgress).await?;

    print_result(&graded);
    Ok(())
}

fn print_result(record: &ExamRecord) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Score", "Grade", "Hint", "Feedback"]);

    for (i, answer) in record.answers.iter().enumerate() {
        let (score, grade, feedback) = match &answer.evaluation {
            Some(e) => (
                format!("{:.0}", e.score),
                e.grade.clone(),
                truncate(&e.feedback, 60),
            ),
            None => ("-".into(), "-".into(), String::new()),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate(&answer.question_text, 50)),
            Cell::new(score),
            Cell::new(grade),
            Cell::new(if answer.hint_used { "yes" } else { "" }),
            Cell::new(feedback),
        ]);
    }

    println!("{table}");
    if let Some(score) = record.overall_score {
        println!(
            "Overall: {score:.1} ({})",
            examprep_core::model::letter_grade(score)
        );
    }
}

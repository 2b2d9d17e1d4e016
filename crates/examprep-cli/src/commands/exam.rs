//! The `examprep exam` command: a line-oriented exam session on stdin.
//!
//! Each line answers the displayed question. An empty line resubmits the
//! saved answer when revisiting a question. `:hint` shows the reference
//! answer, `:prev` goes back one question and `:quit` abandons the exam.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use examprep_core::selection::{SelectionEngine, Strategy};
use examprep_core::session::{ExamSession, Ignored, ScheduledSession, Step};

use super::Workspace;

pub async fn execute(
    config_path: Option<&Path>,
    subject: String,
    count: usize,
    strategy: String,
    seed: Option<u64>,
) -> Result<()> {
    anyhow::ensure!(count >= 1, "count must be at least 1");
    let strategy: Strategy = strategy.parse()?;

    let workspace = Workspace::load(config_path)?;
    let history = workspace.history();
    let bank = workspace.bank()?;

    let mut engine = SelectionEngine::new(Arc::new(bank), history.clone());
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }
    let selection = engine.select(&subject, count, strategy)?;
    if selection.unanswered_exhausted {
        println!("Note: not enough unanswered questions left; including the least answered ones.");
    }
    if selection.questions.len() < count {
        println!(
            "Note: the bank only has {} questions for '{subject}'.",
            selection.questions.len()
        );
    }

    let session = ExamSession::from_selection(subject.clone(), selection)?;
    let total = session.len();
    let exam = ScheduledSession::new(session, history, workspace.config.transition_timing());

    println!("Exam: {subject}, {total} questions ({strategy}).");
    println!("Type an answer and press enter. Commands: :hint, :prev, :quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_question(&exam);

    loop {
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            anyhow::bail!("input ended before the exam was finished; nothing was saved");
        };

        match line.trim() {
            ":quit" => {
                println!("Exam abandoned; nothing was saved.");
                return Ok(());
            }
            ":hint" => {
                if let Ok(hint) = exam.show_hint() {
                    println!("Hint: {hint}\n");
                }
            }
            ":prev" => match exam.prev().await {
                Step::Ignored(Ignored::AtFirstQuestion) => {
                    println!("Already at the first question.");
                }
                Step::Transitioning(_) => print_question(&exam),
                _ => {}
            },
            text => {
                // Transitions finish before `next`/`prev` return, so the
                // session is idle here.
                if !text.is_empty() {
                    if let Err(reason) = exam.set_answer(text) {
                        tracing::debug!(?reason, "answer ignored");
                        continue;
                    }
                }
                match exam.next().await {
                    Ok(Step::Ignored(Ignored::EmptyAnswer)) => {
                        println!("An answer is required before moving on.");
                    }
                    Ok(Step::Transitioning(_)) => print_question(&exam),
                    Ok(Step::Finished(record)) => {
                        println!("\nExam complete. {} answers saved.", record.answers.len());
                        println!("Exam id: {}", record.id);
                        println!("Grade it with: examprep grade --exam {}", record.id);
                        return Ok(());
                    }
                    Ok(Step::Ignored(_)) => {}
                    Err(e) => {
                        println!("Could not save the exam: {e}");
                        println!("Press enter to retry, or :quit to abandon it.");
                    }
                }
            }
        }
    }
}

fn print_question(exam: &ScheduledSession) {
    exam.with_session(|s| {
        let question = s.current_question();
        let category = question.category.as_deref().unwrap_or("General");
        println!("[{}/{}] {category}", s.index() + 1, s.len());
        println!("{}", question.text);
        let draft = s.current_answer();
        if !draft.text.is_empty() {
            println!("(saved answer: {}; press enter to keep it)", draft.text);
        }
    });
}

//! Question selection strategies.
//!
//! Usage counts come from exam history: the number of answer records that
//! reference a question id across all records for the same subject. The
//! random source is injected so draws are reproducible under a fixed seed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ExamError, ValidationIssue};
use crate::model::{ExamRecord, Question, Subject};
use crate::store::History;
use crate::traits::QuestionBank;

/// How questions are picked for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Uniform shuffle of the whole bank.
    #[default]
    Random,
    /// Questions never answered first, then the least answered.
    NotAnswered,
    /// Ascending by usage count, random order among ties.
    LeastAnswered,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Random => write!(f, "random"),
            Strategy::NotAnswered => write!(f, "not_answered"),
            Strategy::LeastAnswered => write!(f, "least_answered"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ValidationIssue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random" => Ok(Strategy::Random),
            "not_answered" | "unanswered" => Ok(Strategy::NotAnswered),
            "least_answered" => Ok(Strategy::LeastAnswered),
            other => Err(ValidationIssue::UnknownStrategy(other.to_string())),
        }
    }
}

/// The questions drawn for one session.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// At most `count` distinct questions, each tagged with its category title.
    pub questions: Vec<Question>,
    /// Set when `not_answered` ran out of never-answered questions and had to
    /// fill the draw with already answered ones.
    pub unanswered_exhausted: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Number of answer records per question id for one subject.
pub fn usage_counts(subject_id: &str, history: &[ExamRecord]) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for record in history.iter().filter(|r| r.subject_id == subject_id) {
        for answer in &record.answers {
            *counts.entry(answer.question_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Draw up to `count` questions from `subject` using `strategy`.
///
/// Never fails: an empty bank or `count == 0` yields an empty selection,
/// which callers must treat as fatal before starting a session.
pub fn select_questions<R: Rng + ?Sized>(
    subject: &Subject,
    history: &[ExamRecord],
    count: usize,
    strategy: Strategy,
    rng: &mut R,
) -> Selection {
    let mut all = subject.all_questions();
    let counts = match strategy {
        Strategy::Random => HashMap::new(),
        _ => usage_counts(&subject.code, history),
    };
    let usage = |q: &Question| counts.get(&q.id).copied().unwrap_or(0);

    match strategy {
        Strategy::Random => {
            all.shuffle(rng);
            all.truncate(count);
            Selection {
                questions: all,
                unanswered_exhausted: false,
            }
        }
        Strategy::LeastAnswered => {
            let mut questions = by_usage_random_ties(all, &usage, rng);
            questions.truncate(count);
            Selection {
                questions,
                unanswered_exhausted: false,
            }
        }
        Strategy::NotAnswered => {
            let (mut fresh, used): (Vec<Question>, Vec<Question>) =
                all.into_iter().partition(|q| usage(q) == 0);
            fresh.shuffle(rng);

            let unanswered_exhausted = fresh.len() < count && !used.is_empty();
            let mut questions = fresh;
            if questions.len() < count {
                questions.extend(by_usage_random_ties(used, &usage, rng));
            }
            questions.truncate(count);
            Selection {
                questions,
                unanswered_exhausted,
            }
        }
    }
}

/// Shuffle, then stable-sort by usage: ascending counts with random order
/// inside each equal-count group.
fn by_usage_random_ties<R, F>(mut questions: Vec<Question>, usage: &F, rng: &mut R) -> Vec<Question>
where
    R: Rng + ?Sized,
    F: Fn(&Question) -> usize,
{
    questions.shuffle(rng);
    questions.sort_by_key(|q| usage(q));
    questions
}

/// Draws selections from a bank using the history for usage counts.
pub struct SelectionEngine {
    bank: Arc<dyn QuestionBank>,
    history: History,
    rng: Mutex<StdRng>,
}

impl SelectionEngine {
    pub fn new(bank: Arc<dyn QuestionBank>, history: History) -> Self {
        Self {
            bank,
            history,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed seed for reproducible draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Draw up to `count` questions for a subject.
    pub fn select(
        &self,
        subject_id: &str,
        count: usize,
        strategy: Strategy,
    ) -> Result<Selection, ExamError> {
        let subject = self
            .bank
            .subject(subject_id)
            .ok_or_else(|| ExamError::subject_not_found(subject_id))?;

        let history = if strategy == Strategy::Random {
            Vec::new()
        } else {
            self.history.records()?
        };

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let selection = select_questions(subject, &history, count, strategy, &mut *rng);

        tracing::debug!(
            subject = subject_id,
            %strategy,
            requested = count,
            drawn = selection.questions.len(),
            "questions selected"
        );
        if selection.unanswered_exhausted {
            tracing::info!(
                subject = subject_id,
                "not enough unanswered questions left, filling with least answered"
            );
        }

        Ok(selection)
    }
}

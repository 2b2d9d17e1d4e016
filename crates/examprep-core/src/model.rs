//! Core data model types for examprep.
//!
//! Field names serialize in camelCase: an exported history file is a flat
//! JSON array of [`ExamRecord`]s and must stay readable across installations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single interview question. Immutable, owned by its bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "answer")]
    pub reference_answer: String,
    /// Title of the category the question was drawn from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A titled group of questions within a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A named question bank for one technology or topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Short code used in exam records (e.g. "java").
    pub code: String,
    /// Human-readable name (e.g. "Java").
    pub display_name: String,
    #[serde(default)]
    pub version: String,
    /// Question count as declared by the bank document. May disagree with
    /// the actual number of questions; see [`crate::bank::validate_subject`].
    pub total_questions_declared: usize,
    pub categories: Vec<Category>,
}

impl Subject {
    /// Number of questions actually present across all categories.
    pub fn question_count(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    /// Every question in bank order, tagged with its category title.
    pub fn all_questions(&self) -> Vec<Question> {
        self.categories
            .iter()
            .flat_map(|cat| {
                cat.questions.iter().map(|q| Question {
                    category: Some(cat.title.clone()),
                    ..q.clone()
                })
            })
            .collect()
    }

    pub fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            code: self.code.clone(),
            name: self.display_name.clone(),
            total_questions: self.question_count(),
        }
    }
}

/// Catalog entry for a subject, without its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub code: String,
    pub name: String,
    pub total_questions: usize,
}

/// Rubric sub-scores, each on a 0–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricDimensions {
    pub conceptual_knowledge: f64,
    pub accuracy: f64,
    pub depth_and_reasoning: f64,
    pub practical_application: f64,
    pub edge_cases: f64,
    pub clarity: f64,
}

impl RubricDimensions {
    pub const MAX: f64 = 5.0;

    /// Label and value of each dimension, in rubric order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("Conceptual", self.conceptual_knowledge),
            ("Accuracy", self.accuracy),
            ("Reasoning", self.depth_and_reasoning),
            ("Practical", self.practical_application),
            ("Edge Cases", self.edge_cases),
            ("Clarity", self.clarity),
        ]
    }

    /// Weighted 0–100 score implied by the sub-scores.
    ///
    /// Weights: conceptual 25%, accuracy 25%, reasoning 15%, practical 20%,
    /// edge cases 10%, clarity 5%.
    pub fn weighted_score(&self) -> f64 {
        (self.conceptual_knowledge * 0.25
            + self.accuracy * 0.25
            + self.depth_and_reasoning * 0.15
            + self.practical_application * 0.20
            + self.edge_cases * 0.10
            + self.clarity * 0.05)
            * 20.0
    }

    pub fn in_range(&self) -> bool {
        self.entries()
            .iter()
            .all(|(_, v)| v.is_finite() && (0.0..=Self::MAX).contains(v))
    }
}

/// The grading service's verdict on one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// 0–100.
    pub score: f64,
    /// Short label, usually a letter grade.
    pub grade: String,
    pub dimensions: RubricDimensions,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
}

/// Letter grade for a 0–100 score.
pub fn letter_grade(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "F",
    }
}

/// One answered question inside an exam record.
///
/// Question text and reference answer are captured when the answer is given
/// so later bank edits cannot change what a historical answer meant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: u32,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
    #[serde(default)]
    pub hint_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// Grading status of an exam record. Records written before statuses existed
/// deserialize as pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    #[default]
    Pending,
    Graded,
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamStatus::Pending => write!(f, "pending"),
            ExamStatus::Graded => write!(f, "graded"),
        }
    }
}

/// The durable outcome of one completed exam session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: String,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
    pub total_questions: usize,
    /// Set iff `status == Graded`; the mean of the answer scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub status: ExamStatus,
}

impl ExamRecord {
    /// A freshly completed, ungraded record.
    pub fn pending(subject_id: impl Into<String>, answers: Vec<AnswerRecord>) -> Self {
        let total_questions = answers.len();
        Self {
            id: new_exam_id(),
            subject_id: subject_id.into(),
            timestamp: Utc::now(),
            answers,
            total_questions,
            overall_score: None,
            status: ExamStatus::Pending,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.status == ExamStatus::Graded
    }

    /// Mean evaluation score over all answers, or `None` if any answer is
    /// ungraded or there are no answers.
    pub fn mean_score(&self) -> Option<f64> {
        if self.answers.is_empty() {
            return None;
        }
        let mut total = 0.0;
        for answer in &self.answers {
            total += answer.evaluation.as_ref()?.score;
        }
        Some(total / self.answers.len() as f64)
    }
}

/// Time-derived exam id: creation millis plus a short random suffix so two
/// sessions finishing in the same millisecond still differ.
pub fn new_exam_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

//! Coverage and score statistics derived from exam history.
//!
//! Everything here is a pure function of its inputs. Results are a view over
//! history and are recomputed rather than stored.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ExamRecord, SubjectSummary};

/// Practice coverage for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub code: String,
    pub name: String,
    pub total_questions_in_bank: usize,
    /// Distinct question ids answered at least once, graded or not.
    pub unique_answered: usize,
    /// Individual answers given, not exams taken.
    pub total_attempts: usize,
    /// Percentage of the bank answered at least once; 0 for an empty bank.
    pub coverage: f64,
}

/// Compute coverage statistics for every subject in `catalog`, in catalog
/// order. Records for subjects outside the catalog are ignored.
pub fn compute_subject_stats(history: &[ExamRecord], catalog: &[SubjectSummary]) -> Vec<SubjectStats> {
    let mut seen: HashMap<&str, (HashSet<u32>, usize)> = catalog
        .iter()
        .map(|s| (s.code.as_str(), (HashSet::new(), 0)))
        .collect();

    for record in history {
        if let Some((ids, attempts)) = seen.get_mut(record.subject_id.as_str()) {
            for answer in &record.answers {
                ids.insert(answer.question_id);
                *attempts += 1;
            }
        }
    }

    catalog
        .iter()
        .map(|subject| {
            let (unique_answered, total_attempts) = seen
                .get(subject.code.as_str())
                .map(|(ids, attempts)| (ids.len(), *attempts))
                .unwrap_or_default();
            let coverage = if subject.total_questions == 0 {
                0.0
            } else {
                unique_answered as f64 / subject.total_questions as f64 * 100.0
            };
            SubjectStats {
                code: subject.code.clone(),
                name: subject.name.clone(),
                total_questions_in_bank: subject.total_questions,
                unique_answered,
                total_attempts,
                coverage,
            }
        })
        .collect()
}

/// One graded exam on a subject's score timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub exam_id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub total_questions: usize,
}

/// Score history of one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTrend {
    pub subject_id: String,
    /// Oldest first.
    pub points: Vec<TrendPoint>,
    /// Average over individual answers, so a ten-question exam weighs ten
    /// times a one-question exam.
    pub average_score: f64,
}

impl SubjectTrend {
    pub fn graded_exams(&self) -> usize {
        self.points.len()
    }
}

/// Build the score timeline for `subject_id` from graded records.
///
/// Records without per-answer detail count as `totalQuestions` answers at
/// their overall score.
pub fn subject_trend(history: &[ExamRecord], subject_id: &str) -> SubjectTrend {
    let mut graded: Vec<(&ExamRecord, f64)> = history
        .iter()
        .filter(|r| r.subject_id == subject_id)
        .filter_map(|r| r.overall_score.map(|score| (r, score)))
        .collect();
    graded.sort_by_key(|(r, _)| r.timestamp);

    let mut earned = 0.0;
    let mut possible = 0.0;
    for (record, overall) in &graded {
        if record.answers.is_empty() {
            earned += overall * record.total_questions as f64;
            possible += record.total_questions as f64 * 100.0;
        } else {
            for answer in &record.answers {
                earned += answer.evaluation.as_ref().map_or(0.0, |e| e.score);
                possible += 100.0;
            }
        }
    }

    SubjectTrend {
        subject_id: subject_id.to_string(),
        points: graded
            .into_iter()
            .map(|(r, overall_score)| TrendPoint {
                exam_id: r.id.clone(),
                timestamp: r.timestamp,
                overall_score,
                total_questions: r.total_questions,
            })
            .collect(),
        average_score: if possible > 0.0 {
            earned / possible * 100.0
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerRecord, Evaluation, ExamStatus, RubricDimensions};
    use chrono::Duration;

    fn answer(question_id: u32, score: Option<f64>) -> AnswerRecord {
        AnswerRecord {
            question_id,
            question_text: format!("Q{question_id}"),
            user_answer: "a".into(),
            correct_answer: "r".into(),
            hint_used: false,
            evaluation: score.map(|score| Evaluation {
                score,
                grade: "B".into(),
                dimensions: RubricDimensions::default(),
                feedback: String::new(),
                strengths: vec![],
                improvements: vec![],
                sample_answer: None,
            }),
        }
    }

    fn exam(subject: &str, days_ago: i64, answers: Vec<AnswerRecord>) -> ExamRecord {
        let mut r = ExamRecord::pending(subject, answers);
        r.timestamp = Utc::now() - Duration::days(days_ago);
        r.overall_score = r.mean_score();
        if r.overall_score.is_some() {
            r.status = ExamStatus::Graded;
        }
        r
    }

    fn catalog() -> Vec<SubjectSummary> {
        vec![
            SubjectSummary {
                code: "java".into(),
                name: "Java".into(),
                total_questions: 10,
            },
            SubjectSummary {
                code: "empty".into(),
                name: "Empty".into(),
                total_questions: 0,
            },
        ]
    }

    #[test]
    fn counts_unique_ids_and_individual_attempts() {
        let history = vec![
            exam("java", 2, vec![answer(1, None), answer(2, None)]),
            exam("java", 1, vec![answer(2, Some(50.0)), answer(3, Some(70.0))]),
            exam("react", 1, vec![answer(1, None)]),
        ];
        let stats = compute_subject_stats(&history, &catalog());

        assert_eq!(stats[0].code, "java");
        assert_eq!(stats[0].unique_answered, 3);
        assert_eq!(stats[0].total_attempts, 4);
        assert!((stats[0].coverage - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bank_has_zero_coverage() {
        let history = vec![exam("empty", 1, vec![answer(1, None)])];
        let stats = compute_subject_stats(&history, &catalog());
        assert_eq!(stats[1].unique_answered, 1);
        assert_eq!(stats[1].coverage, 0.0);
    }

    #[test]
    fn stats_do_not_touch_history() {
        let history = vec![exam("java", 1, vec![answer(1, None)])];
        let before = history.clone();
        compute_subject_stats(&history, &catalog());
        assert_eq!(history, before);
    }

    #[test]
    fn trend_is_oldest_first_and_graded_only() {
        let history = vec![
            exam("java", 1, vec![answer(1, Some(90.0))]),
            exam("java", 5, vec![answer(1, Some(50.0))]),
            exam("java", 3, vec![answer(1, None)]),
            exam("react", 2, vec![answer(1, Some(10.0))]),
        ];
        let trend = subject_trend(&history, "java");
        let scores: Vec<f64> = trend.points.iter().map(|p| p.overall_score).collect();
        assert_eq!(scores, vec![50.0, 90.0]);
        assert_eq!(trend.graded_exams(), 2);
    }

    #[test]
    fn average_weighs_answers_not_exams() {
        let history = vec![
            exam("java", 2, vec![answer(1, Some(100.0))]),
            exam(
                "java",
                1,
                vec![answer(1, Some(40.0)), answer(2, Some(40.0)), answer(3, Some(40.0))],
            ),
        ];
        let trend = subject_trend(&history, "java");
        assert!((trend.average_score - 55.0).abs() < 1e-9);
    }

    #[test]
    fn legacy_records_use_overall_score() {
        let mut legacy = exam("java", 1, vec![]);
        legacy.total_questions = 4;
        legacy.overall_score = Some(75.0);
        let history = vec![legacy, exam("java", 0, vec![answer(1, Some(25.0))])];

        let trend = subject_trend(&history, "java");
        assert!((trend.average_score - 65.0).abs() < 1e-9);
    }

    #[test]
    fn no_graded_exams_means_zero_average() {
        let trend = subject_trend(&[], "java");
        assert!(trend.points.is_empty());
        assert_eq!(trend.average_score, 0.0);
    }
}

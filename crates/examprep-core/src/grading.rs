//! Grading orchestration.
//!
//! Answers are graded one at a time in record order. A run commits only if
//! every call succeeds; any failure leaves the stored record untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ExamError, ProviderError, ValidationIssue};
use crate::model::{Evaluation, ExamRecord, ExamStatus};
use crate::store::History;
use crate::traits::{GradeRequest, Grader};

/// Configuration for the grading orchestrator.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Upper bound on a single grading call. Expiry counts as a failure.
    pub call_timeout: Duration,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Progress reporting for a grading run.
pub trait GradingProgress: Send + Sync {
    fn on_answer_start(&self, index: usize, total: usize, question_id: u32);
    /// Called after every answer, graded or skipped, with completed/total.
    fn on_progress(&self, fraction: f64);
    fn on_complete(&self, record: &ExamRecord, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopProgress;

impl GradingProgress for NoopProgress {
    fn on_answer_start(&self, _: usize, _: usize, _: u32) {}
    fn on_progress(&self, _: f64) {}
    fn on_complete(&self, _: &ExamRecord, _: Duration) {}
}

pub struct GradingOrchestrator {
    grader: Arc<dyn Grader>,
    history: History,
    config: GradingConfig,
}

impl GradingOrchestrator {
    pub fn new(grader: Arc<dyn Grader>, history: History, config: GradingConfig) -> Self {
        Self {
            grader,
            history,
            config,
        }
    }

    /// Grade a stored exam and replace it in history.
    ///
    /// With `force`, answers that already carry an evaluation are graded again.
    pub async fn grade(
        &self,
        exam_id: &str,
        force: bool,
        progress: &dyn GradingProgress,
    ) -> Result<ExamRecord, ExamError> {
        let original = self.history.get(exam_id)?;
        let graded = self.grade_record(&original, force, progress).await?;
        self.history.replace(exam_id, graded.clone())?;

        tracing::info!(
            exam_id,
            subject = %graded.subject_id,
            score = graded.overall_score.unwrap_or_default(),
            "exam graded"
        );
        Ok(graded)
    }

    /// Grade a record without persisting it.
    ///
    /// Works on a copy; `record` is never modified.
    pub async fn grade_record(
        &self,
        record: &ExamRecord,
        force: bool,
        progress: &dyn GradingProgress,
    ) -> Result<ExamRecord, ExamError> {
        if record.answers.is_empty() {
            return Err(ValidationIssue::EmptyExam {
                id: record.id.clone(),
            }
            .into());
        }

        let start = Instant::now();
        let total = record.answers.len();
        let mut working = record.clone();

        for (index, answer) in working.answers.iter_mut().enumerate() {
            if force || answer.evaluation.is_none() {
                progress.on_answer_start(index, total, answer.question_id);
                let request = GradeRequest {
                    question_text: answer.question_text.clone(),
                    reference_answer: answer.correct_answer.clone(),
                    candidate_answer: answer.user_answer.clone(),
                };
                let evaluation = self.evaluate_one(&request).await.inspect_err(|e| {
                    tracing::warn!(
                        exam_id = %record.id,
                        question_id = answer.question_id,
                        "grading aborted: {e}"
                    );
                })?;
                tracing::debug!(
                    exam_id = %record.id,
                    question_id = answer.question_id,
                    score = evaluation.score,
                    "answer graded"
                );
                answer.evaluation = Some(evaluation);
            }
            progress.on_progress((index + 1) as f64 / total as f64);
        }

        working.overall_score = working.mean_score();
        working.status = ExamStatus::Graded;

        progress.on_complete(&working, start.elapsed());
        Ok(working)
    }

    async fn evaluate_one(&self, request: &GradeRequest) -> Result<Evaluation, ExamError> {
        let timeout = self.config.call_timeout;
        let evaluation = match tokio::time::timeout(timeout, self.grader.evaluate(request)).await {
            Ok(result) => result.map_err(ExamError::from_grader)?,
            Err(_) => {
                return Err(ExamError::from_grader(
                    ProviderError::Timeout(timeout.as_secs()).into(),
                ))
            }
        };

        if !evaluation.score.is_finite() || !(0.0..=100.0).contains(&evaluation.score) {
            return Err(ExamError::GradingService {
                message: format!(
                    "{} returned an out-of-range score: {}",
                    self.grader.name(),
                    evaluation.score
                ),
            });
        }
        Ok(evaluation)
    }
}

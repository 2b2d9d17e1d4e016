//! Seams to the outside world: the grading service, the question bank and
//! the history store.
//!
//! Graders are implemented by the `examprep-providers` crate; banks and
//! stores have adapters in [`crate::bank`] and [`crate::store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExamError;
use crate::model::{Evaluation, ExamRecord, Subject, SubjectSummary};

// ---------------------------------------------------------------------------
// Grader trait
// ---------------------------------------------------------------------------

/// An external service that scores a free-text answer against a reference.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model used for grading.
    fn model(&self) -> &str;

    /// Grade one answer.
    ///
    /// Failures should be [`crate::ProviderError`]s where possible so callers
    /// can classify them.
    async fn evaluate(&self, request: &GradeRequest) -> anyhow::Result<Evaluation>;
}

/// One answer to grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub question_text: String,
    pub reference_answer: String,
    pub candidate_answer: String,
}

// ---------------------------------------------------------------------------
// Question bank trait
// ---------------------------------------------------------------------------

/// Read-only access to subjects and their questions.
pub trait QuestionBank: Send + Sync {
    /// Look up a subject by code.
    fn subject(&self, code: &str) -> Option<&Subject>;

    /// Catalog of every subject in the bank.
    fn subjects(&self) -> Vec<SubjectSummary>;
}

// ---------------------------------------------------------------------------
// History store trait
// ---------------------------------------------------------------------------

/// The whole exam history together with the revision it was read at.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    pub revision: u64,
    pub records: Vec<ExamRecord>,
}

/// Whole-collection persistence for exam records.
///
/// Implementations only load and save the full collection. `save` must reject
/// with [`ExamError::Concurrency`] when the stored revision no longer matches
/// `expected_revision`, so every read-modify-write is observed atomically.
/// Higher-level operations live on [`crate::store::History`].
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<HistorySnapshot, ExamError>;

    /// Replace the collection, returning the new revision.
    fn save(&self, expected_revision: u64, records: Vec<ExamRecord>) -> Result<u64, ExamError>;
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from a possibly markdown-wrapped model response.
///
/// Handles:
/// - a ```json fenced block (preferred)
/// - a generic ``` fenced block
/// - bare JSON, optionally surrounded by prose (outermost `{...}` is taken)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_blocks.push(current_block.clone());
            } else {
                generic_blocks.push(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block
    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_blocks.push(current_block);
        } else {
            generic_blocks.push(current_block);
        }
    }

    if let Some(block) = json_blocks.into_iter().next() {
        return block.trim().to_string();
    }
    if let Some(block) = generic_blocks.into_iter().next() {
        return block.trim().to_string();
    }

    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

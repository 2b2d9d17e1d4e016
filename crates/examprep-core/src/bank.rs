//! Question bank loading and validation.
//!
//! A bank document is one subject's questions as JSON:
//! `{subject, version, totalQuestions, categories: [{id, title, questions: [{id, question, answer}]}]}`.
//! A bank directory holds one `<code>.json` document per subject.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Category, Subject, SubjectSummary};
use crate::traits::QuestionBank;

/// On-disk shape of a bank document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankDocument {
    subject: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    total_questions: usize,
    #[serde(default)]
    categories: Vec<Category>,
}

/// Parse a bank document file. The subject code is the file stem.
pub fn parse_subject(path: &Path) -> Result<Subject> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;
    let code = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("bank file has no usable name: {}", path.display()))?;

    parse_subject_str(&content, code)
        .with_context(|| format!("failed to parse bank file: {}", path.display()))
}

/// Parse a bank document from a string (useful for testing).
pub fn parse_subject_str(content: &str, code: &str) -> Result<Subject> {
    let doc: BankDocument = serde_json::from_str(content)?;
    Ok(Subject {
        code: code.to_string(),
        display_name: doc.subject,
        version: doc.version,
        total_questions_declared: doc.total_questions,
        categories: doc.categories,
    })
}

/// In-memory bank keyed by subject code.
#[derive(Debug, Default, Clone)]
pub struct StaticBank {
    subjects: BTreeMap<String, Subject>,
}

impl StaticBank {
    pub fn new(subjects: impl IntoIterator<Item = Subject>) -> Self {
        Self {
            subjects: subjects.into_iter().map(|s| (s.code.clone(), s)).collect(),
        }
    }

    pub fn insert(&mut self, subject: Subject) {
        self.subjects.insert(subject.code.clone(), subject);
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl QuestionBank for StaticBank {
    fn subject(&self, code: &str) -> Option<&Subject> {
        self.subjects.get(code)
    }

    fn subjects(&self) -> Vec<SubjectSummary> {
        let mut list: Vec<SubjectSummary> = self.subjects.values().map(Subject::summary).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}

/// Load every `.json` bank document in a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<StaticBank> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut bank = StaticBank::default();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        match parse_subject(&path) {
            Ok(subject) => {
                for w in validate_subject(&subject) {
                    tracing::warn!(subject = %subject.code, "{}", w.message);
                }
                bank.insert(subject);
            }
            Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
        }
    }

    Ok(bank)
}

/// A non-fatal problem found in a bank document.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question id (if applicable).
    pub question_id: Option<u32>,
    pub message: String,
}

/// Check a subject for common authoring mistakes. Never fails.
pub fn validate_subject(subject: &Subject) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let actual = subject.question_count();
    if actual != subject.total_questions_declared {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!(
                "declares {} questions but contains {actual}",
                subject.total_questions_declared
            ),
        });
    }

    for cat in &subject.categories {
        if cat.questions.is_empty() {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!("category '{}' has no questions", cat.title),
            });
        }
    }

    let mut seen = HashSet::new();
    for q in subject.categories.iter().flat_map(|c| &c.questions) {
        if !seen.insert(q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: format!("duplicate question id: {}", q.id),
            });
        }
        if q.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "question text is empty".into(),
            });
        }
        if q.reference_answer.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "reference answer is empty".into(),
            });
        }
    }

    warnings
}

//! Export and import of exam history.
//!
//! The transport format is a flat JSON array of exam records, the same shape
//! the file store keeps on disk. Imports are validated first and merged in a
//! single history write.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExamError, ValidationIssue};
use crate::model::ExamRecord;
use crate::store::History;

/// How imported records are merged into history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing records; append only ids not yet present.
    #[default]
    Add,
    /// Replace every existing record of the subject with the imported ones.
    Override,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Add => write!(f, "add"),
            ImportMode::Override => write!(f, "override"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(ImportMode::Add),
            "override" => Ok(ImportMode::Override),
            other => Err(format!("unknown import mode: {other} (expected add or override)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Reject the whole document if any record belongs to another subject,
    /// instead of discarding those records.
    pub strict: bool,
}

/// What an import did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub mode: ImportMode,
    pub imported: usize,
    /// Records of the subject removed by an override.
    pub removed: usize,
    /// Add mode: records whose id already existed.
    pub skipped_existing: usize,
    /// Candidates missing an id, a subject id or an answers array.
    pub dropped_invalid: usize,
    /// Valid records belonging to a different subject.
    pub discarded_other_subject: usize,
}

impl ImportOutcome {
    /// An add-mode import where every record already existed.
    pub fn is_no_new_data(&self) -> bool {
        self.mode == ImportMode::Add && self.imported == 0
    }
}

/// Records that survived validation, with counts of what was filtered out.
#[derive(Debug, Clone)]
pub struct ImportCandidates {
    pub records: Vec<ExamRecord>,
    pub dropped_invalid: usize,
    pub discarded_other_subject: usize,
}

fn non_empty_str(item: &Value, key: &str) -> bool {
    item.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

/// Validate an import document against the subject it is imported into.
///
/// Candidates without a non-empty `id` and `subjectId` or without an
/// `answers` array are dropped, as are candidates that fail to deserialize.
/// Fails if the document is not an array or nothing usable remains.
pub fn validate_import(
    document: &Value,
    expected_subject: &str,
    strict: bool,
) -> Result<ImportCandidates, ExamError> {
    let items = document.as_array().ok_or(ValidationIssue::NotAnArray)?;

    let mut records = Vec::new();
    let mut dropped_invalid = 0;
    let mut discarded_other_subject = 0;

    for (index, item) in items.iter().enumerate() {
        let shaped = non_empty_str(item, "id")
            && non_empty_str(item, "subjectId")
            && item.get("answers").is_some_and(Value::is_array);
        if !shaped {
            tracing::warn!(index, "dropping import record without id, subjectId or answers");
            dropped_invalid += 1;
            continue;
        }

        let record: ExamRecord = match serde_json::from_value(item.clone()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(index, "dropping unreadable import record: {e}");
                dropped_invalid += 1;
                continue;
            }
        };

        if record.subject_id != expected_subject {
            if strict {
                return Err(ValidationIssue::SubjectMismatch {
                    expected: expected_subject.to_string(),
                    found: record.subject_id,
                }
                .into());
            }
            discarded_other_subject += 1;
            continue;
        }
        records.push(record);
    }

    if discarded_other_subject > 0 {
        tracing::warn!(
            subject = expected_subject,
            discarded = discarded_other_subject,
            "import document contains records for other subjects; they were not imported"
        );
    }

    if records.is_empty() {
        return Err(ValidationIssue::NoValidRecords {
            subject: expected_subject.to_string(),
        }
        .into());
    }

    Ok(ImportCandidates {
        records,
        dropped_invalid,
        discarded_other_subject,
    })
}

/// Moves a subject's history in and out of an installation.
pub struct ImportExportManager {
    history: History,
}

impl ImportExportManager {
    pub fn new(history: History) -> Self {
        Self { history }
    }

    /// Every record of `subject_id`, in storage order.
    pub fn export(&self, subject_id: &str) -> Result<Vec<ExamRecord>, ExamError> {
        let records = self.history.list_by_subject(subject_id)?;
        if records.is_empty() {
            return Err(ValidationIssue::NoData {
                subject: subject_id.to_string(),
            }
            .into());
        }
        Ok(records)
    }

    /// [`ImportExportManager::export`] rendered as the transport document.
    pub fn export_json(&self, subject_id: &str) -> Result<String, ExamError> {
        let records = self.export(subject_id)?;
        serde_json::to_string_pretty(&records)
            .map_err(|e| ExamError::Storage(format!("failed to serialize export: {e}")))
    }

    /// Parse and import a transport document.
    pub fn import_str(
        &self,
        document: &str,
        expected_subject: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ExamError> {
        let value: Value = serde_json::from_str(document)
            .map_err(|e| ValidationIssue::InvalidJson(e.to_string()))?;
        self.import(&value, expected_subject, options)
    }

    /// Validate `document` and merge it into history.
    ///
    /// Validation failures leave history untouched.
    pub fn import(
        &self,
        document: &Value,
        expected_subject: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ExamError> {
        let candidates = validate_import(document, expected_subject, options.strict)?;
        let mut outcome = ImportOutcome {
            mode: options.mode,
            imported: 0,
            removed: 0,
            skipped_existing: 0,
            dropped_invalid: candidates.dropped_invalid,
            discarded_other_subject: candidates.discarded_other_subject,
        };

        match options.mode {
            ImportMode::Override => {
                let incoming = candidates.records;
                let (removed, imported) = self.history.modify(|records| {
                    let before = records.len();
                    records.retain(|r| r.subject_id != expected_subject);
                    let removed = before - records.len();
                    let imported = incoming.len();
                    records.extend(incoming);
                    Ok((removed, imported))
                })?;
                outcome.removed = removed;
                outcome.imported = imported;
            }
            ImportMode::Add => {
                let existing: HashSet<String> =
                    self.history.records()?.into_iter().map(|r| r.id).collect();
                if candidates.records.iter().all(|r| existing.contains(&r.id)) {
                    outcome.skipped_existing = candidates.records.len();
                    tracing::info!(subject = expected_subject, "import found no new records");
                    return Ok(outcome);
                }

                let incoming = candidates.records;
                let (imported, skipped) = self.history.modify(|records| {
                    let mut ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
                    let mut imported = 0;
                    let mut skipped = 0;
                    for record in incoming {
                        if ids.insert(record.id.clone()) {
                            records.push(record);
                            imported += 1;
                        } else {
                            skipped += 1;
                        }
                    }
                    Ok((imported, skipped))
                })?;
                outcome.imported = imported;
                outcome.skipped_existing = skipped;
            }
        }

        tracing::info!(
            subject = expected_subject,
            mode = %outcome.mode,
            imported = outcome.imported,
            removed = outcome.removed,
            "history imported"
        );
        Ok(outcome)
    }
}

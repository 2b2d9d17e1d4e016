//! Error taxonomy for the exam lifecycle.
//!
//! `ProviderError` is defined here rather than in `examprep-providers` so the
//! grading orchestrator can downcast and classify grader failures without
//! string matching.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable category of an [`ExamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    GradingService,
    Concurrency,
    Configuration,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::GradingService => "grading_service",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the exam lifecycle engine.
#[derive(Debug, Error)]
pub enum ExamError {
    /// Malformed input: an import document, an empty bank or selection.
    #[error("validation failed: {0}")]
    Validation(ValidationIssue),

    /// Unknown exam id or subject code.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The external grading call failed or returned something unusable.
    #[error("grading service failed: {message}")]
    GradingService { message: String },

    /// The history changed between read and write.
    #[error("history was modified concurrently (expected revision {expected}, found {found})")]
    Concurrency { expected: u64, found: u64 },

    /// Missing or unusable grading-service configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backing store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ExamError {
    /// The machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExamError::Validation(_) => ErrorKind::Validation,
            ExamError::NotFound { .. } => ErrorKind::NotFound,
            ExamError::GradingService { .. } => ErrorKind::GradingService,
            ExamError::Concurrency { .. } => ErrorKind::Concurrency,
            ExamError::Configuration(_) => ErrorKind::Configuration,
            ExamError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    pub fn exam_not_found(id: impl Into<String>) -> Self {
        ExamError::NotFound {
            entity: "exam",
            id: id.into(),
        }
    }

    pub fn subject_not_found(code: impl Into<String>) -> Self {
        ExamError::NotFound {
            entity: "subject",
            id: code.into(),
        }
    }

    /// Classify a grader failure.
    ///
    /// Missing credentials are a configuration problem; every other failure,
    /// typed or not, is a grading-service failure.
    pub fn from_grader(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ProviderError>() {
            Some(ProviderError::MissingCredentials(provider)) => ExamError::Configuration(
                format!("no API key configured for grading provider '{provider}'"),
            ),
            Some(provider_err) => ExamError::GradingService {
                message: provider_err.to_string(),
            },
            None => ExamError::GradingService {
                message: format!("{err:#}"),
            },
        }
    }
}

impl From<ValidationIssue> for ExamError {
    fn from(issue: ValidationIssue) -> Self {
        ExamError::Validation(issue)
    }
}

/// The specific reason a validation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("no history records for subject '{subject}'")]
    NoData { subject: String },

    #[error("no valid records for subject '{subject}' in import document")]
    NoValidRecords { subject: String },

    #[error("import document is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("import document is not a JSON array")]
    NotAnArray,

    #[error("no questions available for subject '{subject}'")]
    EmptySelection { subject: String },

    #[error("exam '{id}' has no answers to grade")]
    EmptyExam { id: String },

    #[error("unknown selection strategy: {0}")]
    UnknownStrategy(String),

    #[error("import document contains records for subject '{found}', expected '{expected}'")]
    SubjectMismatch { expected: String, found: String },
}

/// Errors that can occur when calling a grading provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The provider rejected the credentials.
    #[error("authentication failed (HTTP {status})")]
    AuthenticationFailed { status: u16 },

    /// No API key is configured for the named provider.
    #[error("missing API key for provider '{0}'")]
    MissingCredentials(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response could not be turned into an evaluation.
    #[error("malformed evaluation response: {0}")]
    MalformedResponse(String),
}

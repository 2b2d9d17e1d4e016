//! examprep-core: Exam lifecycle engine.
//!
//! This crate defines the data model, the storage and grading seams, and the
//! logic that selects questions, runs exam sessions, grades finished exams,
//! and aggregates or merges exam history.

pub mod bank;
pub mod error;
pub mod grading;
pub mod model;
pub mod selection;
pub mod session;
pub mod statistics;
pub mod store;
pub mod traits;
pub mod transfer;

pub use error::{ErrorKind, ExamError, ProviderError, ValidationIssue};

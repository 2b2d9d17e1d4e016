//! History store adapters and the [`History`] facade.
//!
//! Stores only load and save the whole collection; every mutation goes
//! through [`History::modify`], a single read-modify-write that fails with
//! [`ExamError::Concurrency`] if another writer got there first.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::ExamError;
use crate::model::ExamRecord;
use crate::traits::{HistorySnapshot, HistoryStore};

/// Record-level operations over a [`HistoryStore`].
#[derive(Clone)]
pub struct History {
    store: Arc<dyn HistoryStore>,
}

impl History {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Run `f` over the full collection and write the result back.
    ///
    /// If `f` fails nothing is written.
    pub fn modify<T>(
        &self,
        f: impl FnOnce(&mut Vec<ExamRecord>) -> Result<T, ExamError>,
    ) -> Result<T, ExamError> {
        let snapshot = self.store.load()?;
        let mut records = snapshot.records;
        let out = f(&mut records)?;
        self.store.save(snapshot.revision, records)?;
        Ok(out)
    }

    /// All records in storage order.
    pub fn records(&self) -> Result<Vec<ExamRecord>, ExamError> {
        Ok(self.store.load()?.records)
    }

    pub fn append(&self, record: ExamRecord) -> Result<(), ExamError> {
        let id = record.id.clone();
        self.modify(|records| {
            records.push(record);
            Ok(())
        })?;
        tracing::info!(exam_id = %id, "exam record appended");
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<ExamRecord>, ExamError> {
        Ok(self.records()?.into_iter().find(|r| r.id == id))
    }

    /// Like [`History::find_by_id`] but an unknown id is an error.
    pub fn get(&self, id: &str) -> Result<ExamRecord, ExamError> {
        self.find_by_id(id)?
            .ok_or_else(|| ExamError::exam_not_found(id))
    }

    /// Replace the record with the given id. Fails if it is absent.
    pub fn replace(&self, id: &str, record: ExamRecord) -> Result<(), ExamError> {
        self.modify(|records| {
            let slot = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ExamError::exam_not_found(id))?;
            *slot = record;
            Ok(())
        })
    }

    /// Records for one subject, in storage order.
    pub fn list_by_subject(&self, subject_id: &str) -> Result<Vec<ExamRecord>, ExamError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.subject_id == subject_id)
            .collect())
    }

    /// All records, newest first.
    pub fn list_all(&self) -> Result<Vec<ExamRecord>, ExamError> {
        let mut records = self.records()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Revisions count successful saves.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HistorySnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ExamRecord>) -> Self {
        Self {
            inner: Mutex::new(HistorySnapshot {
                revision: 0,
                records,
            }),
        }
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<HistorySnapshot, ExamError> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn save(&self, expected_revision: u64, records: Vec<ExamRecord>) -> Result<u64, ExamError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if guard.revision != expected_revision {
            return Err(ExamError::Concurrency {
                expected: expected_revision,
                found: guard.revision,
            });
        }
        guard.revision += 1;
        guard.records = records;
        Ok(guard.revision)
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Stores the history as a flat JSON array in one file.
///
/// The revision is a fingerprint of the file contents, so writers in other
/// processes are detected on save. Writes go to a temp file that is renamed
/// over the target.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, ExamError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ExamError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), ExamError> {
        let storage_err =
            |e: std::io::Error| ExamError::Storage(format!("failed to write {}: {e}", self.path.display()));

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(storage_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(storage_err)?;
        tmp.write_all(bytes).map_err(storage_err)?;
        tmp.persist(&self.path).map_err(|e| storage_err(e.error))?;
        Ok(())
    }
}

fn fingerprint(bytes: Option<&[u8]>) -> u64 {
    match bytes {
        None => 0,
        Some(bytes) => {
            let mut hasher = DefaultHasher::new();
            bytes.hash(&mut hasher);
            // 0 is reserved for "no file"
            hasher.finish().max(1)
        }
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<HistorySnapshot, ExamError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let bytes = self.read_bytes()?;
        let revision = fingerprint(bytes.as_deref());

        let records = match bytes {
            Some(b) if !b.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(&b)
                .map_err(|e| {
                    ExamError::Storage(format!("failed to parse {}: {e}", self.path.display()))
                })?,
            _ => Vec::new(),
        };

        Ok(HistorySnapshot { revision, records })
    }

    fn save(&self, expected_revision: u64, records: Vec<ExamRecord>) -> Result<u64, ExamError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = fingerprint(self.read_bytes()?.as_deref());
        if current != expected_revision {
            return Err(ExamError::Concurrency {
                expected: expected_revision,
                found: current,
            });
        }

        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| ExamError::Storage(format!("failed to serialize history: {e}")))?;
        self.write_bytes(&json)?;
        Ok(fingerprint(Some(&json)))
    }
}

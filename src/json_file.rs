//! Whole-document JSON persistence.
//!
//! Each store keeps its state in a single JSON file that is rewritten on every
//! mutation. Writers take an exclusive `fs2` lock on a sidecar `<file>.lock`
//! and replace the document through a temp file + rename, so readers never see
//! a torn file and concurrent writers cannot interleave.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is locked by another writer", path.display())]
    Locked { path: PathBuf },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of reading a document without a lock.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    /// The file does not exist yet.
    Absent,
    /// The file exists but could not be read or decoded.
    Corrupt(String),
    Valid(T),
}

/// Exclusive writer lock on a document. Released when dropped.
#[derive(Debug)]
pub struct DocumentLock {
    file: File,
    path: PathBuf,
}

impl DocumentLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// A typed JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonDocument<T> {
    path: PathBuf,
    pretty: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
            _marker: PhantomData,
        }
    }

    /// Toggle pretty-printed output (on by default).
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sidecar(&self.path, "lock")
    }

    fn tmp_path(&self) -> PathBuf {
        sidecar(&self.path, "tmp")
    }

    /// Read the document, distinguishing absent, corrupt and valid content.
    pub fn read(&self) -> ReadOutcome<T> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ReadOutcome::Absent,
            Err(err) => return ReadOutcome::Corrupt(format!("read failed: {}", err)),
        };
        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => ReadOutcome::Valid(value),
            Err(err) => ReadOutcome::Corrupt(format!("decode failed: {}", err)),
        }
    }

    /// Read the document, falling back to an empty value when it is absent or corrupt.
    pub fn load(&self) -> T {
        match self.read() {
            ReadOutcome::Valid(value) => value,
            ReadOutcome::Absent => {
                tracing::debug!("{} does not exist, using empty state", self.path.display());
                T::default()
            }
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(
                    "Ignoring unreadable document {}: {}",
                    self.path.display(),
                    reason
                );
                T::default()
            }
        }
    }

    /// Take the writer lock without blocking.
    pub fn lock(&self) -> Result<DocumentLock, StorageError> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(DocumentLock {
                file,
                path: lock_path,
            }),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                tracing::warn!("Lock contended on {}", self.path.display());
                Err(StorageError::Locked {
                    path: self.path.clone(),
                })
            }
            Err(err) => Err(StorageError::io(&lock_path, err)),
        }
    }

    /// Atomically replace the document. Requires the writer lock.
    pub fn write(&self, lock: &DocumentLock, value: &T) -> Result<(), StorageError> {
        debug_assert_eq!(lock.path(), self.lock_path().as_path());

        let data = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(|source| StorageError::Encode {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        let mut tmp = File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp.write_all(&data)
            .and_then(|_| tmp.sync_all())
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        drop(tmp);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::io(&self.path, e));
        }
        tracing::debug!("Wrote {} ({} bytes)", self.path.display(), data.len());
        Ok(())
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_absent_and_loads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let doc: JsonDocument<Vec<String>> = JsonDocument::new(temp.path().join("missing.json"));

        assert!(matches!(doc.read(), ReadOutcome::Absent));
        assert!(doc.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        fs::write(&path, b"{ not json").expect("write");
        let doc: JsonDocument<BTreeMap<String, u32>> = JsonDocument::new(&path);

        assert!(matches!(doc.read(), ReadOutcome::Corrupt(_)));
        assert!(doc.load().is_empty());
    }

    #[test]
    fn write_replaces_document_and_leaves_no_temp_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/list.json");
        let doc: JsonDocument<Vec<String>> = JsonDocument::new(&path);

        let lock = doc.lock().expect("lock");
        doc.write(&lock, &vec!["a".to_string()]).expect("first write");
        doc.write(&lock, &vec!["b".to_string(), "c".to_string()])
            .expect("second write");
        drop(lock);

        assert_eq!(doc.load(), vec!["b".to_string(), "c".to_string()]);
        assert!(!temp.path().join("nested/list.json.tmp").exists());
    }

    #[test]
    fn second_lock_fails_while_first_is_held() {
        let temp = tempfile::tempdir().expect("tempdir");
        let doc: JsonDocument<Vec<String>> = JsonDocument::new(temp.path().join("list.json"));

        let held = doc.lock().expect("first lock");
        let err = doc.lock().expect_err("lock should be contended");
        assert!(matches!(err, StorageError::Locked { .. }));

        drop(held);
        doc.lock().expect("lock after release");
    }

    #[test]
    fn compact_output_when_pretty_disabled() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("compact.json");
        let doc: JsonDocument<Vec<u32>> = JsonDocument::new(&path).with_pretty(false);

        let lock = doc.lock().expect("lock");
        doc.write(&lock, &vec![1, 2, 3]).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "[1,2,3]");
    }
}

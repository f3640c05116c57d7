//! Storage backends
//!
//! A backend loads the committed store on open and persists a full store
//! image on every commit. It never sees partial transactions.
//!
//! The JSON file backend holds an exclusive advisory lock on a `.lock` file
//! next to the store for as long as it lives. A second handle on the same
//! store, in this process or another, fails to open instead of committing
//! over a stale image.

use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::database::StoreData;
use super::file_io::{read_json_if_exists, write_json_atomic};
use crate::error::{SyncError, SyncResult};

/// Durable home of the committed store image
///
/// # Invariants
///
/// - `persist` either stores the whole image or leaves the previous one intact
/// - `load` returns the image of the last successful `persist`
pub trait StoreBackend: Send + Sync {
    /// Load the last committed image, or an empty store
    fn load(&self) -> SyncResult<StoreData>;

    /// Replace the committed image
    fn persist(&self, data: &StoreData) -> SyncResult<()>;

    /// Short description used in log lines
    fn describe(&self) -> String;
}

impl<B: StoreBackend + ?Sized> StoreBackend for Arc<B> {
    fn load(&self) -> SyncResult<StoreData> {
        (**self).load()
    }

    fn persist(&self, data: &StoreData) -> SyncResult<()> {
        (**self).persist(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Backend that keeps the committed image in memory
#[derive(Default)]
pub struct MemoryBackend {
    image: Mutex<StoreData>,
    reject_commits: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `persist` fail (used to exercise commit failures)
    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> SyncResult<StoreData> {
        Ok(self.image.lock().clone())
    }

    fn persist(&self, data: &StoreData) -> SyncResult<()> {
        if self.reject_commits.load(Ordering::SeqCst) {
            return Err(SyncError::Storage("memory backend is rejecting commits".into()));
        }
        *self.image.lock() = data.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Backend storing the whole image in one JSON file
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    /// Lock file handle, held for exclusive access
    _lock_file: File,
}

impl JsonFileBackend {
    /// Open the store at `path`, taking its lock
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another handle already holds the lock.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = lock_path_for(&path);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(SyncError::StoreLocked(path.display().to_string()));
        }

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// `store.json` -> `store.json.lock`
fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> SyncResult<StoreData> {
        let data: StoreData = read_json_if_exists(&self.path)?.unwrap_or_default();
        data.check_schema()?;
        Ok(data)
    }

    fn persist(&self, data: &StoreData) -> SyncResult<()> {
        write_json_atomic(&self.path, data)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

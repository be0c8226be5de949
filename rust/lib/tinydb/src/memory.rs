use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, TinyDbError};
use crate::traits::FileSystem;

#[derive(Default)]
struct Inner {
    files: RwLock<BTreeMap<PathBuf, String>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
    writes: AtomicUsize,
    renames: AtomicUsize,
    fail_writes: AtomicBool,
    fail_renames: AtomicBool,
}

/// MemoryFs is an in-memory FileSystem.
///
/// Clones share the same state, so a test can hand one clone to a `TinyDb`
/// and keep another to inspect files, count writes, or inject failures.
/// A `write` requires its parent directory to have been created first, which
/// mirrors what the local disk does.
#[derive(Clone, Default)]
pub struct MemoryFs {
    inner: Arc<Inner>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file directly, creating its parent directories.
    /// Does not count as a write.
    pub fn insert_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dirs(parent);
        }
        self.files_mut().insert(path, contents.into());
    }

    /// Current contents of a file, if present.
    pub fn file(&self, path: &Path) -> Option<String> {
        self.files().get(path).cloned()
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    /// Number of successful `write` calls.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Number of successful `rename` calls.
    pub fn rename_count(&self) -> usize {
        self.inner.renames.load(Ordering::SeqCst)
    }

    /// Make every following `write` fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every following `rename` fail with an I/O error.
    pub fn fail_renames(&self, fail: bool) {
        self.inner.fail_renames.store(fail, Ordering::SeqCst);
    }

    fn files(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, String>> {
        self.inner.files.read().unwrap_or_else(|e| e.into_inner())
    }

    fn files_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, String>> {
        self.inner.files.write().unwrap_or_else(|e| e.into_inner())
    }

    fn add_dirs(&self, path: &Path) {
        let mut dirs = self.inner.dirs.write().unwrap_or_else(|e| e.into_inner());
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn has_dir(&self, path: &Path) -> bool {
        if path.as_os_str().is_empty() || path.parent().is_none() {
            return true;
        }
        let dirs = self.inner.dirs.read().unwrap_or_else(|e| e.into_inner());
        dirs.contains(path)
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.files().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.file(path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(TinyDbError::Io(format!(
                "write {}: injected failure",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            if !self.has_dir(parent) {
                return Err(TinyDbError::Io(format!(
                    "write {}: parent directory does not exist",
                    path.display()
                )));
            }
        }
        self.files_mut().insert(path.to_path_buf(), contents.to_string());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dirs(path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.inner.fail_renames.load(Ordering::SeqCst) {
            return Err(TinyDbError::Io(format!(
                "rename {} -> {}: injected failure",
                from.display(),
                to.display()
            )));
        }
        let mut files = self.files_mut();
        let contents = files.remove(from).ok_or_else(|| {
            TinyDbError::Io(format!("rename {}: no such file", from.display()))
        })?;
        files.insert(to.to_path_buf(), contents);
        self.inner.renames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.files_mut().remove(path);
        Ok(())
    }
}

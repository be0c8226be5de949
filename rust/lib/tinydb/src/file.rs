use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Result, TinyDbError};
use crate::traits::FileSystem;

/// LocalFs is a FileSystem implementation backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn io_error(op: &str, path: &Path, e: std::io::Error) -> TinyDbError {
    TinyDbError::Io(format!("{} {}: {}", op, path.display(), e))
}

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", path, e)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).map_err(|e| io_error("write", path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| io_error("create dir", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| {
            TinyDbError::Io(format!(
                "rename {} -> {}: {}",
                from.display(),
                to.display(),
                e
            ))
        })
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", path, e)),
        }
    }
}

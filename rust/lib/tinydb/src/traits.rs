use std::path::Path;

use crate::error::Result;

/// FileSystem is the I/O boundary of a `TinyDb`.
///
/// The store only ever needs whole-file operations plus a rename, so the trait
/// stays small. The default implementation (`LocalFs`) maps onto `std::fs`;
/// `MemoryFs` keeps files in memory for deterministic tests.
pub trait FileSystem: Send + Sync {
    /// Check whether a regular file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8 text. Returns None if the file does not exist.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>>;

    /// Write `contents` to `path`, creating or truncating the file.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Create a directory and all of its missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Rename `from` to `to`, replacing `to` if it exists.
    /// Both paths must live on the same volume for the rename to be atomic.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file. No-op if the file does not exist.
    fn remove_file(&self, path: &Path) -> Result<()>;
}

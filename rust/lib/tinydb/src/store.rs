use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codec::{self, Encode, Scalar};
use crate::config::StoreConfig;
use crate::error::{Result, TinyDbError};
use crate::file::LocalFs;
use crate::traits::FileSystem;

/// Line terminator written between entries.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// Line terminator written between entries.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

const RESERVED_KEY_CHARS: [char; 3] = ['=', '\r', '\n'];

/// TinyDb is a small durable key-value store kept in one text file.
///
/// Every entry is held in memory as its encoded text and written out as one
/// `key=value` line, sorted by key:
///
/// ```text
/// name=Alice
/// ratio=0.75
/// tags=red,green<cm>blue
/// ```
///
/// With auto-save on (the default) each mutation rewrites the file. Batches
/// should go through [`TinyDb::transaction`], which saves once at the end.
/// Saves write a sibling `.tmp` file and rename it over the data file, so a
/// reader never sees a half-written file.
///
/// A store is not synchronized. Sharing one between threads needs an outer
/// lock, and two processes saving the same file simply overwrite each other.
pub struct TinyDb<F: FileSystem = LocalFs> {
    fs: F,
    path: PathBuf,
    tmp: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
    auto_save: bool,
    depth: usize,
}

impl TinyDb<LocalFs> {
    /// Open `{base_dir}/{name}.tinydb` on the local disk.
    pub fn open(base_dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::open_with(LocalFs, &StoreConfig::new(base_dir.as_ref(), name))
    }

    /// Open the store described by `config` on the local disk.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::open_with(LocalFs, config)
    }
}

impl<F: FileSystem> TinyDb<F> {
    /// Open a store on the given filesystem. The data file is loaded if it
    /// exists; otherwise the store starts empty and nothing is written.
    pub fn open_with(fs: F, config: &StoreConfig) -> Result<Self> {
        let mut db = Self {
            fs,
            path: config.resolve_path(),
            tmp: config.resolve_tmp_path(),
            entries: BTreeMap::new(),
            dirty: false,
            auto_save: config.auto_save,
            depth: 0,
        };
        if db.fs.exists(&db.path) {
            db.reload()?;
        } else {
            debug!("TinyDb: {:?} does not exist, starting empty", db.path);
        }
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    /// True if there are mutations not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Turn auto-save on or off. Turning it on with pending changes saves
    /// them right away, unless a transaction is running.
    pub fn set_auto_save(&mut self, auto_save: bool) -> Result<()> {
        self.auto_save = auto_save;
        if auto_save && self.depth == 0 {
            self.save()?;
        }
        Ok(())
    }

    /// Replace the in-memory state with the file contents, dropping unsaved
    /// changes. A missing file empties the store. A line without `=` is a
    /// `Parse` error and an empty or otherwise invalid key a `Validation`
    /// error; either way the store is left as it was.
    pub fn reload(&mut self) -> Result<()> {
        let entries: BTreeMap<String, String> = match self.fs.read_to_string(&self.path)? {
            Some(text) => parse_lines(&text)?.into_iter().collect(),
            None => BTreeMap::new(),
        };
        debug!("TinyDb: loaded {} entries from {:?}", entries.len(), self.path);
        self.entries = entries;
        self.dirty = false;
        Ok(())
    }

    /// Write pending changes. No-op when nothing changed since the last save.
    ///
    /// The text goes to the temp file first, which is then renamed over the
    /// data file. If either step fails the temp file is removed and the store
    /// stays dirty.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.fs.create_dir_all(parent)?;
            }
        }

        let text = self.to_text();
        let written = self
            .fs
            .write(&self.tmp, &text)
            .and_then(|_| self.fs.rename(&self.tmp, &self.path));
        if let Err(e) = written {
            self.discard_tmp();
            return Err(e);
        }

        self.dirty = false;
        debug!("TinyDb: saved {} entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }

    /// Run `action` as one batch: auto-save is held back until the outermost
    /// transaction returns, then a single save runs.
    ///
    /// If `action` fails its error is returned without saving. Changes it made
    /// before failing stay in memory and the store stays dirty. A panic in
    /// `action` is passed on after the nesting depth is restored.
    pub fn transaction<R>(&mut self, action: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.depth += 1;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(self)));
        self.depth -= 1;

        let value = match outcome {
            Ok(result) => result?,
            Err(payload) => panic::resume_unwind(payload),
        };
        if self.depth == 0 && self.auto_save {
            self.save()?;
        }
        Ok(value)
    }

    /// Store an already-encoded value. The key must be non-empty and free of
    /// `=`, `\r`, `\n`; the value must not contain line breaks.
    pub fn set_raw(&mut self, key: &str, encoded: impl Into<String>) -> Result<()> {
        validate_key(key)?;
        let encoded = encoded.into();
        validate_raw_value(key, &encoded)?;
        self.entries.insert(key.to_string(), encoded);
        self.mark_dirty()
    }

    /// Stored text of a key, still encoded.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remove a key. Returns whether it was present; removing an absent key is
    /// not an error.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let existed = self.entries.remove(key).is_some();
        self.mark_dirty()?;
        Ok(existed)
    }

    /// Remove several keys with a single save.
    pub fn remove_all<I, S>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.transaction(|db| {
            for key in keys {
                db.remove(key.as_ref())?;
            }
            Ok(())
        })
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.mark_dirty()
    }

    pub fn set<V: Encode + ?Sized>(&mut self, key: &str, value: &V) -> Result<()> {
        self.set_raw(key, codec::encode(value))
    }

    pub fn set_array<V: Encode>(&mut self, key: &str, values: &[V]) -> Result<()> {
        self.set_raw(key, codec::encode_slice(values))
    }

    /// Read and parse a value. Absent keys give `None`; a stored value that
    /// does not parse as `T` is a `Format` error.
    pub fn get<T: Scalar>(&self, key: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|raw| codec::decode(key, raw))
            .transpose()
    }

    pub fn get_array<T: Scalar>(&self, key: &str) -> Result<Option<Vec<T>>> {
        self.entries
            .get(key)
            .map(|raw| codec::decode_vec(key, raw))
            .transpose()
    }

    /// Like [`TinyDb::get`], but an absent key is set to `default` (saved
    /// under the auto-save rule) and `default` is returned.
    pub fn get_or_default<T: Scalar>(&mut self, key: &str, default: T) -> Result<T> {
        match self.get(key)? {
            Some(value) => Ok(value),
            None => {
                self.set(key, &default)?;
                Ok(default)
            }
        }
    }

    pub fn get_array_or_default<T: Scalar + Clone>(
        &mut self,
        key: &str,
        default: &[T],
    ) -> Result<Vec<T>> {
        match self.get_array(key)? {
            Some(values) => Ok(values),
            None => {
                self.set_array(key, default)?;
                Ok(default.to_vec())
            }
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
    }

    pub fn get_str_array(&self, key: &str) -> Result<Option<Vec<String>>> {
        self.get_array(key)
    }

    pub fn get_str_or_default(&mut self, key: &str, default: &str) -> Result<String> {
        self.get_or_default(key, default.to_string())
    }

    pub fn get_str_array_or_default(&mut self, key: &str, default: &[&str]) -> Result<Vec<String>> {
        let default: Vec<String> = default.iter().map(|s| s.to_string()).collect();
        self.get_array_or_default(key, &default)
    }

    /// The full file contents: one `key=value` line per entry, sorted by key.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push_str(LINE_SEPARATOR);
        }
        out
    }

    /// Merge lines in file format (`key=encoded`) into the store as one
    /// transaction. Nothing changes if any line is malformed.
    pub fn import_text(&mut self, text: &str) -> Result<usize> {
        let lines = parse_lines(text)?;
        for (key, value) in &lines {
            validate_key(key)?;
            validate_raw_value(key, value)?;
        }
        let count = lines.len();
        self.transaction(|db| {
            for (key, value) in lines {
                db.set_raw(&key, value)?;
            }
            Ok(())
        })?;
        debug!("TinyDb: imported {} entries into {:?}", count, self.path);
        Ok(count)
    }

    fn mark_dirty(&mut self) -> Result<()> {
        self.dirty = true;
        if self.auto_save && self.depth == 0 {
            self.save()?;
        }
        Ok(())
    }

    fn discard_tmp(&self) {
        if let Err(e) = self.fs.remove_file(&self.tmp) {
            warn!("TinyDb: failed to remove temp file {:?}: {}", self.tmp, e);
        }
    }
}

// Typed shorthands over the generic accessors, one set per value kind.
macro_rules! typed_accessors {
    ($($ty:ty => $get:ident, $get_array:ident, $get_or_default:ident, $get_array_or_default:ident;)*) => {
        impl<F: FileSystem> TinyDb<F> {
            $(
                pub fn $get(&self, key: &str) -> Result<Option<$ty>> {
                    self.get(key)
                }

                pub fn $get_array(&self, key: &str) -> Result<Option<Vec<$ty>>> {
                    self.get_array(key)
                }

                pub fn $get_or_default(&mut self, key: &str, default: $ty) -> Result<$ty> {
                    self.get_or_default(key, default)
                }

                pub fn $get_array_or_default(&mut self, key: &str, default: &[$ty]) -> Result<Vec<$ty>> {
                    self.get_array_or_default(key, default)
                }
            )*
        }
    };
}

typed_accessors! {
    bool => get_bool, get_bool_array, get_bool_or_default, get_bool_array_or_default;
    i8 => get_byte, get_byte_array, get_byte_or_default, get_byte_array_or_default;
    i16 => get_short, get_short_array, get_short_or_default, get_short_array_or_default;
    i32 => get_int, get_int_array, get_int_or_default, get_int_array_or_default;
    i64 => get_long, get_long_array, get_long_or_default, get_long_array_or_default;
    f32 => get_float, get_float_array, get_float_or_default, get_float_array_or_default;
    f64 => get_double, get_double_array, get_double_or_default, get_double_array_or_default;
}

impl<F: FileSystem> fmt::Debug for TinyDb<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TinyDb")
            .field("path", &self.path)
            .field("tmp", &self.tmp)
            .field("entries", &self.entries.len())
            .field("dirty", &self.dirty)
            .field("auto_save", &self.auto_save)
            .field("depth", &self.depth)
            .finish()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TinyDbError::Validation("key must not be empty".to_string()));
    }
    if key.contains(RESERVED_KEY_CHARS) {
        return Err(TinyDbError::Validation(format!(
            "{:?} contains '=', '\\r' or '\\n'",
            key
        )));
    }
    Ok(())
}

fn validate_raw_value(key: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(TinyDbError::Validation(format!(
            "encoded value for {:?} contains a line break",
            key
        )));
    }
    Ok(())
}

/// Split file text into `(key, value)` pairs on the first `=` of each line.
/// Every line needs a separator and a valid key; only the terminator after
/// the last line may be followed by nothing.
fn parse_lines(text: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let (key, value) = line.split_once('=').ok_or_else(|| TinyDbError::Parse {
            line: index + 1,
            content: line.to_string(),
        })?;
        validate_key(key)?;
        entries.push((key.to_string(), value.to_string()));
    }
    Ok(entries)
}

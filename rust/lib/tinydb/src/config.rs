use std::path::PathBuf;

/// Extension of the data file.
pub const DATA_EXTENSION: &str = "tinydb";

/// Extension of the temporary file written during a save.
pub const TMP_EXTENSION: &str = "tmp";

/// Where a store lives and how it persists.
///
/// The data file is `{base_dir}/{name}.tinydb`; saves go through
/// `{base_dir}/{name}.tmp` in the same directory so the final rename stays on
/// one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the data file. Created on first save.
    pub base_dir: PathBuf,

    /// Logical store name. The extension is appended, never substituted, so
    /// `app.settings` maps to `app.settings.tinydb`.
    pub name: String,

    /// Persist after every mutation outside a transaction.
    pub auto_save: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            name: "tinydb".to_string(),
            auto_save: true,
        }
    }
}

impl StoreConfig {
    pub fn new(base_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--store-dir=PATH`
    /// - `--store-name=NAME`
    /// - `--auto-save=true|false`
    ///
    /// Unknown arguments and unparseable values are ignored.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = StoreConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--store-dir=") {
                config.base_dir = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--store-name=") {
                config.name = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--auto-save=") {
                if let Ok(flag) = val.parse() {
                    config.auto_save = flag;
                }
            }
        }

        config
    }

    /// Path of the data file.
    pub fn resolve_path(&self) -> PathBuf {
        self.resolve_with_extension(DATA_EXTENSION)
    }

    /// Path of the temporary file used while saving.
    pub fn resolve_tmp_path(&self) -> PathBuf {
        self.resolve_with_extension(TMP_EXTENSION)
    }

    fn resolve_with_extension(&self, ext: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", self.name, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--store-dir=/var/lib/app".to_string(),
            "--store-name=settings".to_string(),
            "--auto-save=false".to_string(),
            "--unrelated=1".to_string(),
        ];
        let config = StoreConfig::from_args(&args);
        assert_eq!(config.base_dir, PathBuf::from("/var/lib/app"));
        assert_eq!(config.name, "settings");
        assert!(!config.auto_save);
    }

    #[test]
    fn test_from_args_defaults() {
        let config = StoreConfig::from_args(&["--auto-save=maybe".to_string()]);
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_resolve_paths() {
        let config = StoreConfig::new("/data", "app.settings");
        assert_eq!(
            config.resolve_path(),
            PathBuf::from("/data/app.settings.tinydb")
        );
        assert_eq!(
            config.resolve_tmp_path(),
            PathBuf::from("/data/app.settings.tmp")
        );
    }
}

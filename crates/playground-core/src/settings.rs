//! Persisted local settings
//!
//! `SettingsStore` is the configuration service handed to the orchestrator.
//! Every `set` is written through immediately; there is no batching.

use crate::error::ConfigError;
use crate::types::{BuildSettings, EditorPreferencesPatch, Settings};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Application directory under the platform config dir
const APP_DIR: &str = "gleam-playground";

/// Settings file name
const SETTINGS_FILE: &str = "settings.toml";

/// Partial settings update, one field group per member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub build: Option<BuildSettings>,
    pub editor: Option<EditorPreferencesPatch>,
    pub dark_mode: Option<bool>,
}

impl SettingsPatch {
    /// Replace build settings
    #[must_use]
    pub fn build(build: BuildSettings) -> Self {
        Self {
            build: Some(build),
            ..Self::default()
        }
    }

    /// Merge editor preferences
    #[must_use]
    pub fn editor(patch: EditorPreferencesPatch) -> Self {
        Self {
            editor: Some(patch),
            ..Self::default()
        }
    }

    /// Set theme flag
    #[must_use]
    pub fn dark_mode(enabled: bool) -> Self {
        Self {
            dark_mode: Some(enabled),
            ..Self::default()
        }
    }

    /// Apply to a settings value
    #[must_use]
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(build) = &self.build {
            settings.build = build.clone();
        }
        if let Some(editor) = &self.editor {
            settings.editor = settings.editor.merged(editor);
        }
        if let Some(dark_mode) = self.dark_mode {
            settings.dark_mode = dark_mode;
        }
        settings
    }
}

/// Configuration service
pub trait SettingsStore: Send + Sync {
    /// Read persisted settings, replacing the cached copy
    ///
    /// # Errors
    /// Returns `ConfigError` if the backing storage exists but cannot be read.
    fn load(&self) -> Result<Settings, ConfigError>;

    /// Cached settings
    fn get(&self) -> Settings;

    /// Apply a patch and persist the result
    ///
    /// The cached copy is updated even if persisting fails.
    ///
    /// # Errors
    /// Returns `ConfigError` if the settings could not be written.
    fn set(&self, patch: SettingsPatch) -> Result<Settings, ConfigError>;
}

/// Settings kept in memory only
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    current: RwLock<Settings>,
}

impl InMemorySettingsStore {
    /// Create store holding `settings`
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.get())
    }

    fn get(&self) -> Settings {
        self.current.read().clone()
    }

    fn set(&self, patch: SettingsPatch) -> Result<Settings, ConfigError> {
        let mut current = self.current.write();
        *current = patch.apply(current.clone());
        Ok(current.clone())
    }
}

/// Settings persisted as a TOML file
///
/// A missing file yields defaults; missing fields are defaulted.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl FileSettingsStore {
    /// Store backed by `path`; call `load` to read it
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Settings::default()),
        }
    }

    /// Store at `<config dir>/gleam-playground/settings.toml`
    ///
    /// # Errors
    /// Returns `ConfigError::NoConfigDir` if the platform has no config dir.
    pub fn at_default_location() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR).join(SETTINGS_FILE)))
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, raw).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        let settings = match std::fs::read_to_string(&self.path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        *self.current.write() = settings.clone();
        Ok(settings)
    }

    fn get(&self) -> Settings {
        self.current.read().clone()
    }

    fn set(&self, patch: SettingsPatch) -> Result<Settings, ConfigError> {
        // guard spans the file write: file and cache change together
        let mut current = self.current.write();
        *current = patch.apply(current.clone());
        self.persist(&current)?;
        tracing::debug!(path = %self.path.display(), "settings written");
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CursorStyle, RuntimeKind};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Barrier};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("nested").join("settings.toml"));
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn set_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let store = FileSettingsStore::new(&path);
        store.load().unwrap();

        store.set(SettingsPatch::dark_mode(true)).unwrap();
        store
            .set(SettingsPatch::editor(EditorPreferencesPatch {
                cursor_style: Some(CursorStyle::Underline),
                ..Default::default()
            }))
            .unwrap();

        let reopened = FileSettingsStore::new(&path);
        let settings = reopened.load().unwrap();
        assert!(settings.dark_mode);
        assert_eq!(settings.editor.cursor_style, CursorStyle::Underline);
        assert_eq!(settings.build, BuildSettings::default());
    }

    #[test]
    fn concurrent_groups_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        for _ in 0..50 {
            let store = Arc::new(FileSettingsStore::new(&path));
            store.set(SettingsPatch::default()).unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let build = {
                let (store, barrier) = (store.clone(), barrier.clone());
                std::thread::spawn(move || {
                    barrier.wait();
                    store
                        .set(SettingsPatch::build(BuildSettings {
                            runtime: RuntimeKind::GleamPlayground,
                            auto_format: false,
                        }))
                        .unwrap();
                })
            };
            let theme = {
                let (store, barrier) = (store.clone(), barrier.clone());
                std::thread::spawn(move || {
                    barrier.wait();
                    store.set(SettingsPatch::dark_mode(true)).unwrap();
                })
            };
            build.join().unwrap();
            theme.join().unwrap();

            let on_disk = FileSettingsStore::new(&path).load().unwrap();
            assert_eq!(on_disk, store.get());
            assert!(on_disk.dark_mode);
            assert!(!on_disk.build.auto_format);
        }
    }

    #[test]
    fn partial_file_defaults_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[build]\nruntime = \"OTHER\"\n").unwrap();

        let settings = FileSettingsStore::new(&path).load().unwrap();
        assert_eq!(settings.build.runtime, RuntimeKind::Unknown("OTHER".to_string()));
        assert!(settings.build.auto_format);
        assert!(!settings.dark_mode);
        assert!(settings.editor.minimap);
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "dark_mode = [").unwrap();

        let err = FileSettingsStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn in_memory_last_write_wins_per_group() {
        let store = InMemorySettingsStore::default();
        store
            .set(SettingsPatch::build(BuildSettings {
                runtime: RuntimeKind::GleamPlayground,
                auto_format: false,
            }))
            .unwrap();
        store.set(SettingsPatch::dark_mode(true)).unwrap();
        store
            .set(SettingsPatch::build(BuildSettings {
                runtime: RuntimeKind::GleamPlayground,
                auto_format: true,
            }))
            .unwrap();

        let settings = store.get();
        assert!(settings.build.auto_format);
        assert!(settings.dark_mode);
    }
}

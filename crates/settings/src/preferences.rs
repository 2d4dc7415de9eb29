use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::appearance::{EditorConfig, Layout, Theme};

const PREFERENCES_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 跨重新啟動保存的偏好設定。 / The preference subset of a session that survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub editor_config: EditorConfig,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub sidebar_visible: bool,
    #[serde(default = "default_true")]
    pub scroll_sync: bool,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            editor_config: EditorConfig::default(),
            theme: Theme::Paper,
            layout: Layout::Editor,
            sidebar_visible: false,
            scroll_sync: true,
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.editor_config.sanitize();
    }
}

/// 偏好設定的持久化後端。 / Backend the document store writes its preference record through.
pub trait PreferenceStorage: Send {
    /// 讀取已保存的紀錄；尚未保存時回傳預設值。 / Reads the stored record, returning defaults when nothing was saved yet.
    fn load(&mut self) -> Result<Preferences, PreferencesError>;

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferencesError>;
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let data = read_preferences(&path)?;
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.persist()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.persist()
    }

    /// 將目前資料寫回檔案。 / Writes the in-memory record back to its file.
    pub fn persist(&self) -> Result<(), PreferencesError> {
        write_preferences(&self.path, &self.data, true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        write_preferences(path.as_ref(), &self.data, false)
    }

    pub fn import_from(&mut self, source: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let source = source.as_ref().to_path_buf();
        let contents = fs::read_to_string(&source).map_err(|err| PreferencesError::Read {
            path: source.clone(),
            source: err,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|err| PreferencesError::Parse {
                path: source.clone(),
                source: err,
            })?;
        data.sanitize();
        self.backup_existing()?;
        self.data = data;
        self.persist()
    }

    fn backup_existing(&self) -> Result<(), PreferencesError> {
        if self.path.exists() {
            let backup = self.path.with_extension("bak");
            fs::copy(&self.path, &backup).map_err(|source| PreferencesError::Write {
                path: backup,
                source,
            })?;
        }
        Ok(())
    }
}

impl PreferenceStorage for PreferencesStore {
    fn load(&mut self) -> Result<Preferences, PreferencesError> {
        self.data = read_preferences(&self.path)?;
        Ok(self.data.clone())
    }

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferencesError> {
        self.overwrite(preferences.clone())
    }
}

/// 記憶體內的偏好設定後端，複製後共享同一份資料。 / In-memory backend; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<Preferences>,
    writes: usize,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        let backend = Self::default();
        backend.lock().stored = Some(preferences);
        backend
    }

    /// 目前保存的紀錄。 / The record most recently saved.
    pub fn stored(&self) -> Option<Preferences> {
        self.lock().stored.clone()
    }

    /// 呼叫 `save` 的次數。 / Number of `save` calls received.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock still holds a usable record.
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl PreferenceStorage for MemoryPreferences {
    fn load(&mut self) -> Result<Preferences, PreferencesError> {
        let mut data = self.lock().stored.clone().unwrap_or_default();
        data.sanitize();
        Ok(data)
    }

    fn save(&mut self, preferences: &Preferences) -> Result<(), PreferencesError> {
        let mut state = self.lock();
        state.stored = Some(preferences.clone());
        state.writes += 1;
        Ok(())
    }
}

fn read_preferences(path: &Path) -> Result<Preferences, PreferencesError> {
    if !path.exists() {
        let mut data = Preferences::default();
        data.sanitize();
        return Ok(data);
    }

    let contents = fs::read_to_string(path).map_err(|source| PreferencesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut data: Preferences =
        serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    data.sanitize();
    Ok(data)
}

fn write_preferences(
    path: &Path,
    data: &Preferences,
    atomic: bool,
) -> Result<(), PreferencesError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let payload =
        serde_json::to_string_pretty(data).map_err(|source| PreferencesError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

    if !atomic {
        return fs::write(path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| PreferencesError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_counts_writes_and_shares_state() {
        let backend = MemoryPreferences::new();
        let mut writer = backend.clone();
        let mut prefs = Preferences::default();
        prefs.theme = Theme::Glass;
        writer.save(&prefs).unwrap();
        writer.save(&prefs).unwrap();

        assert_eq!(backend.writes(), 2);
        assert_eq!(backend.stored().map(|p| p.theme), Some(Theme::Glass));
    }

    #[test]
    fn memory_backend_loads_defaults_when_empty() {
        let mut backend = MemoryPreferences::new();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded, Preferences::default());
        assert!(loaded.scroll_sync);
        assert!(!loaded.sidebar_visible);
    }
}

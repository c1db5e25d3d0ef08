//! Local persistence for the chat client.
//!
//! Chats and display preferences are stored as JSON files under the
//! platform's local data directory.

use crate::theme::ThemeSettings;
use crate::types::{Chat, ThemeMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

pub const CHATS_FILE: &str = "chats.json";
pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the client keeps its chat list.
pub trait ChatRepository: Send {
    fn load(&self) -> Result<Vec<Chat>, StorageError>;
    fn save(&self, chats: &[Chat]) -> Result<(), StorageError>;
}

/// Directory holding the client's files.
pub fn storage_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("plawai");
    }

    PathBuf::from("cache")
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CHATS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileRepository {
    fn default() -> Self {
        Self::in_dir(storage_dir())
    }
}

impl ChatRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Chat>, StorageError> {
        read_json(&self.path)
    }

    fn save(&self, chats: &[Chat]) -> Result<(), StorageError> {
        write_json(&self.path, chats)
    }
}

/// Repository that lives only as long as the process. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    chats: Arc<Mutex<Vec<Chat>>>,
}

impl MemoryRepository {
    pub fn with_chats(chats: Vec<Chat>) -> Self {
        Self {
            chats: Arc::new(Mutex::new(chats)),
        }
    }

    pub fn snapshot(&self) -> Vec<Chat> {
        self.chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChatRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<Chat>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, chats: &[Chat]) -> Result<(), StorageError> {
        *self.chats.lock().unwrap_or_else(PoisonError::into_inner) = chats.to_vec();
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme_mode: ThemeMode,
    pub theme: ThemeSettings,
}

pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PREFERENCES_FILE),
        }
    }

    pub fn load(&self) -> Result<Preferences, StorageError> {
        read_json(&self.path)
    }

    pub fn save(&self, preferences: &Preferences) -> Result<(), StorageError> {
        write_json(&self.path, preferences)
    }
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::in_dir(storage_dir())
    }
}

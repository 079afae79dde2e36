//! Saved-track playlist
//!
//! A flat list of tracks with the gains they were saved with, persisted as a
//! JSON array. Entries are never edited in place; every change rewrites the
//! whole file.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::eq::EqGains;
use crate::session::DEFAULT_TAG;

/// File name under the data directory
pub const PLAYLIST_FILE: &str = "playlist.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Gains saved with the entry; malformed vectors read back as `None`
    #[serde(
        default,
        alias = "eqGains",
        deserialize_with = "lenient_gains",
        skip_serializing_if = "Option::is_none"
    )]
    pub eq_gains: Option<EqGains>,
    #[serde(default, alias = "detectedMode")]
    pub detected_mode: Option<String>,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn lenient_gains<'de, D>(deserializer: D) -> Result<Option<EqGains>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| serde_json::from_value::<Vec<f32>>(v).ok())
        .and_then(|values| EqGains::from_slice(&values)))
}

impl PlaylistEntry {
    /// New entry with a fresh id
    pub fn new(
        filename: &str,
        name: &str,
        tag: &str,
        gains: EqGains,
        detected_mode: &str,
    ) -> Self {
        Self {
            id: generate_id(filename),
            filename: filename.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
            eq_gains: Some(gains),
            detected_mode: Some(detected_mode.to_string()),
        }
    }

    /// Name shown in the list
    pub fn display_name(&self) -> &str {
        [self.name.as_str(), self.filename.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("Unknown")
    }
}

/// `{filename}-{unix_millis}-{6 hex}`
pub fn generate_id(filename: &str) -> String {
    let filename = if filename.is_empty() { "track" } else { filename };
    let suffix: u32 = rand::rng().random_range(0..0x100_0000);
    format!(
        "{}-{}-{:06x}",
        filename,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

/// Give every entry an id; true if anything changed
pub fn normalize(entries: &mut [PlaylistEntry]) -> bool {
    let mut changed = false;
    for entry in entries.iter_mut().filter(|e| e.id.is_empty()) {
        entry.id = generate_id(&entry.filename);
        changed = true;
    }
    changed
}

/// Errors that can occur with playlist storage
#[derive(Debug, Clone)]
pub enum StorageError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// In-memory list mirrored to a JSON file
#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    path: Option<PathBuf>,
    entries: Vec<PlaylistEntry>,
}

impl PlaylistStore {
    pub fn default_path() -> PathBuf {
        crate::utils::data_dir().join(PLAYLIST_FILE)
    }

    /// Store without a backing file
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the list at `path`
    ///
    /// A missing or unreadable file yields an empty list. Entries without an
    /// id are given one and the normalized list is written back.
    pub fn open(path: PathBuf) -> Self {
        let entries = match Self::read(&path) {
            Ok(mut entries) => {
                if normalize(&mut entries) {
                    if let Err(e) = Self::write(&path, &entries) {
                        tracing::warn!("Failed to write normalized playlist: {}", e);
                    }
                }
                entries
            }
            Err(StorageError::Io(e)) => {
                tracing::debug!("No playlist at {:?}: {}", path, e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Cannot load playlist from {:?}: {}", path, e);
                Vec::new()
            }
        };
        tracing::info!("Playlist loaded: {} entries", entries.len());
        Self {
            path: Some(path),
            entries,
        }
    }

    fn read(path: &Path) -> Result<Vec<PlaylistEntry>, StorageError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| StorageError::Parse(e.to_string()))
    }

    fn write(path: &Path, entries: &[PlaylistEntry]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let content =
            serde_json::to_string(entries).map_err(|e| StorageError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| StorageError::Io(e.to_string()))
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&PlaylistEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Append and persist; the entry stays in memory even if saving fails
    pub fn add(&mut self, entry: PlaylistEntry) -> Result<(), StorageError> {
        self.entries.push(entry);
        self.save()
    }

    /// Rewrite the whole file
    pub fn save(&self) -> Result<(), StorageError> {
        match &self.path {
            Some(path) => Self::write(path, &self.entries),
            None => Ok(()),
        }
    }
}

//! Durable snapshots for documents that outlive their in-memory session.
//!
//! One JSON blob per document under the archive root:
//!
//! ```text
//! archive/
//! ├── g8hr3K.json     {"text": …, "language": "rust",
//! ├── x2Qpf9.json      "frozen_at": …, "expires_at": …, "size": 214}
//! └── …
//! ```
//!
//! The registry reads a blob once, when a document is first opened, to
//! pre-seed the new session; the persister writes one back whenever the
//! document has changed. Blobs carry their own expiry and are swept by the
//! janitor after the retention window (default 30 days).
//!
//! Document ids become file names, so only ids made of `[A-Za-z0-9._-]`
//! are archivable; anything else is refused before touching the filesystem.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where and for how long documents are archived.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Directory holding one JSON blob per document.
    pub root: PathBuf,
    /// Days before an archived document expires.
    pub retention_days: i64,
    /// Largest document the archive will accept, in bytes of text.
    pub max_bytes: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./archive"),
            retention_days: 30,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("document id {0:?} is not archivable")]
    UnsafeId(String),
    #[error("document is {size} bytes, over the {limit} byte archive limit")]
    TooLarge { size: usize, limit: usize },
}

/// The persisted form of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub text: String,
    pub language: Option<String>,
    pub frozen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub size: usize,
}

/// A directory of per-document JSON blobs.
pub struct ArchiveStore {
    config: ArchiveConfig,
}

impl ArchiveStore {
    /// Open (creating if needed) the archive directory.
    pub fn open(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { config })
    }

    fn blob_path(&self, id: &str) -> Result<PathBuf, ArchiveError> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !safe {
            return Err(ArchiveError::UnsafeId(id.to_owned()));
        }
        Ok(self.config.root.join(format!("{id}.json")))
    }

    /// Load the archived document for `id`, if present and unexpired.
    pub fn load(&self, id: &str) -> Result<Option<PersistedDocument>, ArchiveError> {
        let path = self.blob_path(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document: PersistedDocument = serde_json::from_str(&raw)?;
        if document.expires_at < Utc::now() {
            return Ok(None);
        }
        Ok(Some(document))
    }

    /// Write back the current text and language for `id`, stamping a fresh
    /// retention window.
    pub fn store(&self, id: &str, text: &str, language: Option<&str>) -> Result<(), ArchiveError> {
        if text.len() > self.config.max_bytes {
            return Err(ArchiveError::TooLarge {
                size: text.len(),
                limit: self.config.max_bytes,
            });
        }
        let path = self.blob_path(id)?;
        let frozen_at = Utc::now();
        let document = PersistedDocument {
            text: text.to_owned(),
            language: language.map(str::to_owned),
            frozen_at,
            expires_at: frozen_at + Duration::days(self.config.retention_days),
            size: text.len(),
        };
        fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// Drop the blob for `id`. Returns whether one existed.
    pub fn remove(&self, id: &str) -> Result<bool, ArchiveError> {
        let path = self.blob_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every blob past its expiry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> Result<usize, ArchiveError> {
        let now = Utc::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.config.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_blob(&path) {
                Ok(document) if document.expires_at < now => {
                    fs::remove_file(&path)?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    // a corrupt blob stays on disk for inspection
                    warn!("unreadable archive blob {}: {e}", path.display());
                }
            }
        }
        Ok(removed)
    }
}

fn read_blob(path: &Path) -> Result<PersistedDocument, ArchiveError> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

//! Filesystem persistence for configuration backups.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{BackupError, Result};

/// One persisted configuration capture.
///
/// Created before the first configuration command of a session; read back
/// verbatim by rollback; never mutated. The engine keeps at most the last
/// record live per session — pruning older files is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Host the configuration was captured from.
    pub host: String,

    /// When the capture was taken.
    pub timestamp: DateTime<Local>,

    /// Path of the stored configuration text.
    pub path: PathBuf,
}

/// Directory of `{host}_{timestamp}.cfg` files.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new("backups")
    }
}

impl BackupStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist a captured configuration for `host`.
    ///
    /// An empty capture is refused: rolling back to nothing would wipe the
    /// device, so a blank dump is treated as a failed backup.
    pub fn save(&self, host: &str, config_text: &str) -> Result<BackupRecord> {
        if config_text.trim().is_empty() {
            return Err(BackupError::EmptyCapture {
                host: host.to_string(),
            }
            .into());
        }

        fs::create_dir_all(&self.dir).map_err(BackupError::Io)?;

        let timestamp = Local::now();
        let filename = format!("{host}_{}.cfg", timestamp.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);
        fs::write(&path, config_text).map_err(BackupError::Io)?;

        info!("backup saved: {}", path.display());
        Ok(BackupRecord {
            host: host.to_string(),
            timestamp,
            path,
        })
    }

    /// Read a stored capture back, verbatim.
    pub fn load(&self, record: &BackupRecord) -> Result<String> {
        if !record.path.exists() {
            return Err(BackupError::NotFound {
                path: record.path.clone(),
            }
            .into());
        }
        Ok(fs::read_to_string(&record.path).map_err(BackupError::Io)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let text = "hostname sw1\ninterface Gi0/1\n no shutdown\n";
        let record = store.save("10.0.0.1", text).unwrap();
        assert_eq!(record.host, "10.0.0.1");
        assert!(record.path.exists());

        assert_eq!(store.load(&record).unwrap(), text);
    }

    #[test]
    fn test_empty_capture_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        assert!(store.save("10.0.0.1", "  \n ").is_err());
    }

    #[test]
    fn test_missing_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        let record = store.save("10.0.0.1", "hostname sw1").unwrap();
        std::fs::remove_file(&record.path).unwrap();
        assert!(store.load(&record).is_err());
    }
}

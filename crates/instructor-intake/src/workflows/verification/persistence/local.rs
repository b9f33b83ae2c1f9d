use std::sync::Arc;

use tracing::{debug, warn};

use super::migration::migrate;
use super::projection::LocalSnapshot;
use super::storage::{LocalStorage, StorageError};

pub const DEFAULT_STORAGE_KEY: &str = "instructor-application-storage";
pub const DEFAULT_SNAPSHOT_LIMIT_BYTES: usize = 4 * 1024 * 1024;
pub const RETAINED_NOTIFICATIONS_ON_TRIM: usize = 2;

/// What happened to a snapshot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved { bytes: usize },
    /// Notifications and error maps were dropped to fit.
    Trimmed { bytes: usize },
    /// Nothing fit; the stored snapshot was removed and the server copy is authoritative.
    Wiped,
}

/// Writes reduced snapshots under one namespaced key, degrading under quota pressure.
#[derive(Clone)]
pub struct LocalPersistence {
    storage: Arc<dyn LocalStorage>,
    key: String,
    limit_bytes: usize,
    retained_notifications: usize,
}

impl std::fmt::Debug for LocalPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPersistence")
            .field("key", &self.key)
            .field("limit_bytes", &self.limit_bytes)
            .finish_non_exhaustive()
    }
}

impl LocalPersistence {
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>, limit_bytes: usize) -> Self {
        Self {
            storage,
            key: key.into(),
            limit_bytes,
            retained_notifications: RETAINED_NOTIFICATIONS_ON_TRIM,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn persist(&self, snapshot: &LocalSnapshot) -> Result<PersistOutcome, StorageError> {
        let encoded = serde_json::to_string(snapshot)?;
        if encoded.len() <= self.limit_bytes {
            match self.storage.set(&self.key, &encoded) {
                Ok(()) => {
                    return Ok(PersistOutcome::Saved {
                        bytes: encoded.len(),
                    })
                }
                Err(StorageError::QuotaExceeded {
                    required,
                    available,
                }) => {
                    warn!(key = %self.key, required, available, "local storage quota exceeded, trimming snapshot");
                }
                Err(other) => return Err(other),
            }
        } else {
            warn!(key = %self.key, bytes = encoded.len(), limit = self.limit_bytes, "snapshot over size threshold, trimming");
        }

        let trimmed = serde_json::to_string(&snapshot.trimmed(self.retained_notifications))?;
        if trimmed.len() <= self.limit_bytes {
            match self.storage.set(&self.key, &trimmed) {
                Ok(()) => {
                    return Ok(PersistOutcome::Trimmed {
                        bytes: trimmed.len(),
                    })
                }
                Err(StorageError::QuotaExceeded { .. }) => {}
                Err(other) => return Err(other),
            }
        }

        warn!(key = %self.key, "trimmed snapshot still does not fit, wiping local copy");
        self.storage.remove(&self.key)?;
        Ok(PersistOutcome::Wiped)
    }

    /// Load the stored snapshot. Missing, corrupt, or unsupported data yields `None`
    /// and corrupt entries are removed.
    pub fn restore(&self) -> Option<LocalSnapshot> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %self.key, error = %err, "local snapshot unreadable");
                return None;
            }
        };

        let decoded = serde_json::from_str::<serde_json::Value>(&raw)
            .map_err(|err| err.to_string())
            .and_then(|value| migrate(value).map_err(|err| err.to_string()))
            .and_then(|value| {
                serde_json::from_value::<LocalSnapshot>(value).map_err(|err| err.to_string())
            });

        match decoded {
            Ok(snapshot) => {
                debug!(key = %self.key, version = snapshot.version, "local snapshot restored");
                Some(snapshot)
            }
            Err(reason) => {
                warn!(key = %self.key, %reason, "discarding corrupt local snapshot");
                if let Err(err) = self.storage.remove(&self.key) {
                    warn!(key = %self.key, error = %err, "failed to remove corrupt snapshot");
                }
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}

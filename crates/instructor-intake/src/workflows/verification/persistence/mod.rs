mod local;
mod migration;
mod projection;
mod storage;

pub use local::{
    LocalPersistence, PersistOutcome, DEFAULT_SNAPSHOT_LIMIT_BYTES, DEFAULT_STORAGE_KEY,
    RETAINED_NOTIFICATIONS_ON_TRIM,
};
pub use migration::{migrate, MigrationError, CURRENT_SNAPSHOT_VERSION};
pub use projection::{LocalSnapshot, StoredDocument, StoredDocuments, StoredUi};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};

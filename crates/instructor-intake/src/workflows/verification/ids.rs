use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::domain::EntryId;

/// Timestamp-based entry ids, strictly increasing within a session.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    last: AtomicU64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> EntryId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return EntryId(candidate.to_string()),
                Err(actual) => previous = actual,
            }
        }
    }

    /// Account for an id minted elsewhere (hydrated state) so it is never handed out again.
    pub fn observe(&self, id: &EntryId) {
        if let Ok(value) = id.0.parse::<u64>() {
            self.last.fetch_max(value, Ordering::Relaxed);
        }
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key for errors raised while loading or saving the application as a whole.
pub const APPLICATION_FIELD: &str = "application";
/// Key for errors raised by the submission gate.
pub const SUBMISSION_FIELD: &str = "submission";
/// Key for local persistence problems.
pub const STORAGE_FIELD: &str = "storage";

pub const DEFAULT_NOTIFICATION_CAP: usize = 10;

/// Transient presentation flags plus keyed error/warning maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub is_loading: bool,
    pub is_saving: bool,
    pub is_submitting: bool,
    pub has_unsaved_changes: bool,
    pub auto_save_enabled: bool,
    pub errors: BTreeMap<String, Vec<String>>,
    pub warnings: BTreeMap<String, Vec<String>>,
    pub notifications: Vec<Notification>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            is_loading: false,
            is_saving: false,
            is_submitting: false,
            has_unsaved_changes: false,
            auto_save_enabled: true,
            errors: BTreeMap::new(),
            warnings: BTreeMap::new(),
            notifications: Vec::new(),
        }
    }
}

impl UiState {
    pub fn set_field_errors(&mut self, field: &str, messages: Vec<String>) {
        if messages.is_empty() {
            self.errors.remove(field);
        } else {
            self.errors.insert(field.to_string(), messages);
        }
    }

    pub fn clear_field_errors(&mut self, field: &str) {
        self.errors.remove(field);
    }

    /// Append a notification, dropping the oldest entries beyond `cap`.
    pub fn push_notification(&mut self, notification: Notification, cap: usize) {
        self.notifications.push(notification);
        if self.notifications.len() > cap {
            let excess = self.notifications.len() - cap;
            self.notifications.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

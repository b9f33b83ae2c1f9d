//! The application state engine: one shared, observable document per session.
//!
//! All mutation goes through [`VerificationStore`]. State sits behind a single mutex and
//! no guard is ever held across an `.await`, so async actions (uploads, remote saves)
//! re-enter the store through the same paths as synchronous edits.

mod autosave;
mod documents;
mod mutators;
mod navigation;
mod sync;

pub use autosave::AutoSaver;
pub use sync::{LoadOutcome, SaveOutcome, SkipReason, SubmitOutcome};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::domain::{EntryId, VerificationId, VerificationStatus};
use super::gateway::{
    GatewayError, Notifier, Session, UploadError, UploadGateway, VerificationGateway,
};
use super::ids::EntryIdGenerator;
use super::persistence::{
    LocalPersistence, LocalSnapshot, LocalStorage, PersistOutcome, StorageError,
};
use super::scheduler::RevalidationScheduler;
use super::state::StoreState;
use super::steps::StepId;
use super::ui::{Notification, NotificationKind, STORAGE_FIELD};
use super::validation::StepGate;
use crate::config::EngineConfig;

/// External collaborators the store drives.
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn VerificationGateway>,
    pub uploads: Arc<dyn UploadGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub storage: Arc<dyn LocalStorage>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("please sign in again to continue")]
    Unauthenticated,
    #[error("application is {} and can no longer be edited", .0.label())]
    Locked(VerificationStatus),
    #[error("no {collection} entry with id {id}")]
    NotFound {
        collection: &'static str,
        id: EntryId,
    },
    #[error("application is not ready to submit ({} issue(s))", .errors.len())]
    Validation { errors: Vec<String> },
    #[error("{} is incomplete", .step.title())]
    StepIncomplete { step: StepId, errors: Vec<String> },
    #[error("a submission is already in progress")]
    SubmissionInFlight,
    #[error(transparent)]
    Gateway(GatewayError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<GatewayError> for StoreError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unauthorized => StoreError::Unauthenticated,
            other => StoreError::Gateway(other),
        }
    }
}

impl StoreError {
    /// Detail lines suitable for inline display next to the failing field.
    pub fn messages(&self) -> Vec<String> {
        match self {
            StoreError::Validation { errors } | StoreError::StepIncomplete { errors, .. } => {
                errors.clone()
            }
            StoreError::Gateway(GatewayError::Rejected { message, errors }) if !errors.is_empty() => {
                std::iter::once(message.clone())
                    .chain(errors.iter().cloned())
                    .collect()
            }
            other => vec![other.to_string()],
        }
    }
}

/// Serializable read model: the state plus values derived from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    #[serde(flatten)]
    pub state: StoreState,
    pub overall_progress: f32,
    pub can_proceed: bool,
    pub is_locked: bool,
}

/// Cloneable handle to the shared application state.
#[derive(Clone)]
pub struct VerificationStore {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    state: Mutex<StoreState>,
    remote: Arc<dyn VerificationGateway>,
    uploads: Arc<dyn UploadGateway>,
    notifier: Arc<dyn Notifier>,
    local: LocalPersistence,
    gate: Arc<dyn StepGate>,
    scheduler: RevalidationScheduler,
    ids: EntryIdGenerator,
    config: EngineConfig,
    session: Mutex<Option<Session>>,
    /// Held for the whole of a remote draft push, and by submit across its final push.
    save_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for VerificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationStore")
            .field("local", &self.inner.local)
            .field("gate", &self.inner.gate)
            .finish_non_exhaustive()
    }
}

impl VerificationStore {
    /// Build a store, hydrating from the local snapshot when one is readable.
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let gate = config.step_gate.build();
        Self::with_gate(collaborators, config, gate)
    }

    pub fn with_gate(
        collaborators: Collaborators,
        config: EngineConfig,
        gate: Arc<dyn StepGate>,
    ) -> Self {
        let Collaborators {
            remote,
            uploads,
            notifier,
            storage,
        } = collaborators;

        let local = LocalPersistence::new(
            storage,
            config.storage_key.clone(),
            config.snapshot_limit_bytes,
        );
        let ids = EntryIdGenerator::new();

        let mut state = match local.restore() {
            Some(snapshot) => snapshot.into_state(),
            None => StoreState {
                ui: super::ui::UiState {
                    auto_save_enabled: config.auto_save_enabled,
                    ..Default::default()
                },
                ..StoreState::default()
            },
        };
        state.normalize(&ids);
        state.revalidate_all(Utc::now());

        let scheduler = RevalidationScheduler::new(config.revalidation_delay);

        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(state),
                remote,
                uploads,
                notifier,
                local,
                gate,
                scheduler,
                ids,
                config,
                session: Mutex::new(None),
                save_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.inner.state().clone()
    }

    pub fn view(&self) -> StoreView {
        let state = self.inner.state();
        StoreView {
            overall_progress: state.overall_progress(),
            can_proceed: self
                .inner
                .gate
                .can_proceed(state.current_step_state(), &state.document),
            is_locked: state.is_locked(),
            state: state.clone(),
        }
    }

    pub fn verification_id(&self) -> Option<VerificationId> {
        self.inner.state().verification_id.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.state().is_locked()
    }

    pub fn overall_progress(&self) -> f32 {
        self.inner.state().overall_progress()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Credentials of the last caller that loaded the application, for background saves.
    pub fn session(&self) -> Option<Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn remember_session(&self, session: &Session) {
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, change: impl FnOnce(&mut StoreState) -> R) -> R {
        change(&mut *self.inner.state())
    }

    /// Number of step revalidations still waiting on the debounce timer.
    pub fn pending_revalidations(&self) -> usize {
        self.inner.scheduler.pending_count()
    }

    /// Run every queued revalidation immediately.
    pub fn flush_validation(&self) {
        for step in self.inner.scheduler.take_pending() {
            self.inner.revalidate_now(step);
        }
    }

    /// Revalidate every step now, regardless of what is queued.
    pub fn validate_all(&self) {
        self.inner.scheduler.take_pending();
        let mut state = self.inner.state();
        state.revalidate_all(Utc::now());
        self.inner.persist_locally(&mut state);
    }

    pub(crate) fn schedule_revalidation(&self, step: StepId) {
        let weak = Arc::downgrade(&self.inner);
        let deferred = self.inner.scheduler.schedule(step, move || {
            if let Some(inner) = weak.upgrade() {
                inner.revalidate_now(step);
            }
        });
        if !deferred {
            self.inner.revalidate_now(step);
        }
    }

    /// Record a failed action: field-scoped error, user notification, local write.
    pub(crate) fn fail(&self, field: &str, title: &str, error: StoreError) -> StoreError {
        warn!(field, error = %error, "{title}");
        let mut state = self.inner.state();
        state.ui.set_field_errors(field, error.messages());
        self.inner
            .notify(&mut state, NotificationKind::Error, title, &error.to_string());
        self.inner.persist_locally(&mut state);
        error
    }
}

impl StoreInner {
    pub(crate) fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn revalidate_now(&self, step: StepId) {
        let mut state = self.state();
        state.revalidate(step, Utc::now());
        self.persist_locally(&mut state);
    }

    /// Push to the in-state list and the external sink. The sink must not call back
    /// into the store.
    pub(crate) fn notify(
        &self,
        state: &mut StoreState,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) {
        let notification = Notification {
            id: format!("notification-{}", self.ids.next_id()),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };
        self.notifier.notify(&notification);
        state
            .ui
            .push_notification(notification, self.config.notification_cap);
    }

    /// Snapshot the reduced projection after a state change.
    pub(crate) fn persist_locally(&self, state: &mut StoreState) {
        match self.local.persist(&LocalSnapshot::capture(state)) {
            Ok(PersistOutcome::Saved { .. }) | Ok(PersistOutcome::Trimmed { .. }) => {}
            Ok(PersistOutcome::Wiped) => {
                self.notify(
                    state,
                    NotificationKind::Warning,
                    "Local storage full",
                    "Progress could not be kept on this device; save your draft to avoid losing changes",
                );
            }
            Err(err) => {
                warn!(error = %err, "local snapshot write failed");
                state.ui.set_field_errors(STORAGE_FIELD, vec![err.to_string()]);
            }
        }
    }
}

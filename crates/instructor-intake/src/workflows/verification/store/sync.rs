use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{StoreError, VerificationStore};
use crate::workflows::verification::domain::{VerificationId, VerificationStatus};
use crate::workflows::verification::gateway::{DraftPayload, GatewayError, Session};
use crate::workflows::verification::persistence::{
    LocalSnapshot, StoredDocuments, RETAINED_NOTIFICATIONS_ON_TRIM,
};
use crate::workflows::verification::ui::{
    NotificationKind, UiState, APPLICATION_FIELD, SUBMISSION_FIELD,
};
use crate::workflows::verification::validation::{
    validate_consents_for_submission, validate_document,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LoadOutcome {
    /// Remote sections replaced the local document.
    #[serde(rename_all = "camelCase")]
    Hydrated { verification_id: VerificationId },
    /// The record is with reviewers; only its id and status were taken.
    #[serde(rename_all = "camelCase")]
    Locked {
        verification_id: VerificationId,
        status: VerificationStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    AutoSaveDisabled,
    NoChanges,
    SaveInFlight,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SaveOutcome {
    #[serde(rename_all = "camelCase")]
    Saved {
        verification_id: VerificationId,
        saved_at: DateTime<Utc>,
    },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub verification_id: VerificationId,
    pub status: VerificationStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveMode {
    /// Interval-driven; skipped when disabled or clean.
    Auto,
    Silent,
    Manual,
}

const LOAD_FAILED: &str = "Could not load application";
const SAVE_FAILED: &str = "Could not save application";
const SUBMIT_FAILED: &str = "Submission failed";

impl VerificationStore {
    /// Fetch the caller's verification record, creating one remotely if needed.
    pub async fn load_application(&self, session: &Session) -> Result<LoadOutcome, StoreError> {
        let Some((user_id, token)) = session.credentials() else {
            return Err(self.fail(APPLICATION_FIELD, LOAD_FAILED, StoreError::Unauthenticated));
        };
        self.remember_session(session);
        self.inner.state().ui.is_loading = true;

        let fetched = self
            .inner
            .remote
            .load_or_create(user_id, token)
            .await
            .and_then(|response| response.into_result())
            .and_then(|record| {
                record.ok_or_else(|| GatewayError::Rejected {
                    message: "verification service returned no record".to_string(),
                    errors: Vec::new(),
                })
            });

        let record = match fetched {
            Ok(record) => record,
            Err(err) => {
                self.inner.state().ui.is_loading = false;
                return Err(self.fail(APPLICATION_FIELD, LOAD_FAILED, err.into()));
            }
        };

        let mut state = self.inner.state();
        state.ui.is_loading = false;
        state.verification_id = Some(record.id.clone());
        state.status = record.status;
        state.ui.clear_field_errors(APPLICATION_FIELD);

        if record.status.locks_editing() {
            info!(verification_id = %record.id, status = record.status.label(), "application is locked for review");
            self.inner.persist_locally(&mut state);
            return Ok(LoadOutcome::Locked {
                verification_id: record.id,
                status: record.status,
            });
        }

        let document = &mut state.document;
        if let Some(personal_info) = record.personal_info {
            document.personal_info = personal_info;
        }
        if let Some(background) = record.professional_background {
            document.professional_background = background;
        }
        if let Some(teaching) = record.teaching_information {
            document.teaching_information = teaching;
        }
        if let Some(documents) = record.documents {
            document.documents = documents;
        }
        if let Some(consents) = record.consents {
            document.consents = consents;
        }

        state.normalize(&self.inner.ids);
        state.revalidate_all(Utc::now());
        state.ui.has_unsaved_changes = false;
        self.inner.persist_locally(&mut state);
        info!(verification_id = %record.id, "application hydrated from remote");

        Ok(LoadOutcome::Hydrated {
            verification_id: record.id,
        })
    }

    /// Silent draft upsert, as used by auto-save.
    pub async fn save_draft(&self, session: &Session) -> Result<SaveOutcome, StoreError> {
        self.save(session, SaveMode::Silent).await
    }

    /// Draft upsert that reports success to the user.
    pub async fn save_application(&self, session: &Session) -> Result<SaveOutcome, StoreError> {
        self.save(session, SaveMode::Manual).await
    }

    /// Save only when auto-save is on, the draft is dirty and nothing else is saving.
    pub async fn trigger_auto_save(&self, session: &Session) -> Result<SaveOutcome, StoreError> {
        self.save(session, SaveMode::Auto).await
    }

    async fn save(&self, session: &Session, mode: SaveMode) -> Result<SaveOutcome, StoreError> {
        let Ok(_exclusive) = self.inner.save_lock.try_lock() else {
            debug!(?mode, "save skipped while another push is running");
            return Ok(SaveOutcome::Skipped {
                reason: SkipReason::SaveInFlight,
            });
        };
        self.push_draft(session, mode).await
    }

    /// Upsert the current document. Callers hold `save_lock`.
    async fn push_draft(
        &self,
        session: &Session,
        mode: SaveMode,
    ) -> Result<SaveOutcome, StoreError> {
        let Some((user_id, token)) = session.credentials() else {
            return Err(self.fail(APPLICATION_FIELD, SAVE_FAILED, StoreError::Unauthenticated));
        };

        {
            let mut state = self.inner.state();
            let skip = if mode == SaveMode::Auto && !state.ui.auto_save_enabled {
                Some(SkipReason::AutoSaveDisabled)
            } else if mode == SaveMode::Auto && !state.ui.has_unsaved_changes {
                Some(SkipReason::NoChanges)
            } else if state.is_locked() {
                Some(SkipReason::Locked)
            } else {
                None
            };

            match skip {
                Some(SkipReason::Locked) if mode == SaveMode::Manual => {
                    let status = state.status;
                    drop(state);
                    return Err(self.fail(APPLICATION_FIELD, SAVE_FAILED, StoreError::Locked(status)));
                }
                Some(reason) => {
                    debug!(?reason, ?mode, "save skipped");
                    return Ok(SaveOutcome::Skipped { reason });
                }
                None => state.ui.is_saving = true,
            }
        }
        let _busy = BusyFlag::saving(self);

        let verification_id = match self.ensure_verification_id(user_id, token).await {
            Ok(id) => id,
            Err(err) => return Err(self.fail(APPLICATION_FIELD, SAVE_FAILED, err)),
        };

        let saved_at = Utc::now();
        let (draft, revision) = {
            let state = self.inner.state();
            let document = &state.document;
            let draft = DraftPayload {
                personal_info: document.personal_info.clone(),
                professional_background: document.professional_background.clone(),
                teaching_information: document.teaching_information.clone(),
                documents: StoredDocuments::from(&document.documents),
                consents: document.consents,
                current_step: state.current_step,
                saved_at,
            };
            (draft, state.revision)
        };

        let pushed = self
            .inner
            .remote
            .save_draft(&verification_id, &draft, token)
            .await
            .and_then(|response| response.into_result());

        if let Err(err) = pushed {
            return Err(self.fail(APPLICATION_FIELD, SAVE_FAILED, err.into()));
        }

        let mut state = self.inner.state();
        state.ui.is_saving = false;
        state.last_saved_at = Some(saved_at);
        state.synced_revision = Some(revision);
        if state.revision == revision {
            state.ui.has_unsaved_changes = false;
        }
        state.ui.clear_field_errors(APPLICATION_FIELD);
        if mode == SaveMode::Manual {
            self.inner.notify(
                &mut state,
                NotificationKind::Success,
                "Application saved",
                "Your progress has been saved",
            );
        }
        self.inner.persist_locally(&mut state);
        debug!(verification_id = %verification_id, ?mode, "draft saved");

        Ok(SaveOutcome::Saved {
            verification_id,
            saved_at,
        })
    }

    /// The remote record id, created on first use. Only the id and status are taken
    /// from a freshly fetched record.
    async fn ensure_verification_id(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<VerificationId, StoreError> {
        if let Some(id) = self.verification_id() {
            return Ok(id);
        }

        let record = self
            .inner
            .remote
            .load_or_create(user_id, token)
            .await
            .and_then(|response| response.into_result())?
            .ok_or_else(|| GatewayError::Rejected {
                message: "verification service returned no record".to_string(),
                errors: Vec::new(),
            })?;

        let mut state = self.inner.state();
        let id = state
            .verification_id
            .get_or_insert_with(|| record.id.clone())
            .clone();
        state.status = record.status;
        info!(verification_id = %id, "verification record created");
        Ok(id)
    }

    /// Validate everything, push the latest draft and hand the application to reviewers.
    /// Waits for a running save to finish, and edits are refused until submission settles.
    pub async fn submit_application(&self, session: &Session) -> Result<SubmitOutcome, StoreError> {
        let Some((_, token)) = session.credentials() else {
            return Err(self.fail(SUBMISSION_FIELD, SUBMIT_FAILED, StoreError::Unauthenticated));
        };
        self.flush_validation();

        let gate = {
            let mut state = self.inner.state();
            state.revalidate_all(Utc::now());
            if state.ui.is_submitting {
                Err(StoreError::SubmissionInFlight)
            } else if state.is_locked() {
                Err(StoreError::Locked(state.status))
            } else {
                let mut errors = validate_document(&state.document).errors;
                errors.extend(validate_consents_for_submission(&state.document.consents).errors);
                if errors.is_empty() {
                    state.ui.is_submitting = true;
                    Ok(())
                } else {
                    Err(StoreError::Validation { errors })
                }
            }
        };
        if let Err(err) = gate {
            return Err(self.fail(SUBMISSION_FIELD, "Application incomplete", err));
        }
        let _busy = BusyFlag::submitting(self);

        let _exclusive = self.inner.save_lock.lock().await;
        let verification_id = loop {
            let verification_id = match self.push_draft(session, SaveMode::Silent).await? {
                SaveOutcome::Saved {
                    verification_id, ..
                } => verification_id,
                SaveOutcome::Skipped { reason } => {
                    let status = self.inner.state().status;
                    debug!(?reason, "final draft push skipped");
                    return Err(self.fail(SUBMISSION_FIELD, SUBMIT_FAILED, StoreError::Locked(status)));
                }
            };
            let in_sync = {
                let state = self.inner.state();
                state.synced_revision == Some(state.revision)
            };
            if in_sync {
                break verification_id;
            }
            debug!(verification_id = %verification_id, "application changed during the final push, pushing again");
        };

        let consents = self.inner.state().document.consents;
        let submitted = self
            .inner
            .remote
            .submit(&verification_id, &consents, token)
            .await
            .and_then(|response| response.into_result());

        if let Err(err) = submitted {
            return Err(self.fail(SUBMISSION_FIELD, SUBMIT_FAILED, err.into()));
        }

        let submitted_at = Utc::now();
        let mut state = self.inner.state();
        state.ui.is_submitting = false;
        state.status = VerificationStatus::Submitted;
        state.ui.has_unsaved_changes = false;
        state.ui.clear_field_errors(SUBMISSION_FIELD);
        self.inner.notify(
            &mut state,
            NotificationKind::Success,
            "Application submitted",
            "Your application is now with our review team",
        );

        let trimmed = LocalSnapshot::capture(&state).trimmed(RETAINED_NOTIFICATIONS_ON_TRIM);
        if let Err(err) = self.inner.local.persist(&trimmed) {
            warn!(error = %err, "could not trim local snapshot after submission");
        }
        info!(verification_id = %verification_id, "application submitted");

        Ok(SubmitOutcome {
            verification_id,
            status: state.status,
            submitted_at,
        })
    }
}

/// Clears `is_saving` or `is_submitting` when dropped, so a failed or cancelled action
/// never leaves the store busy. Must be declared before any state guard in its scope.
struct BusyFlag<'a> {
    store: &'a VerificationStore,
    flag: fn(&mut UiState) -> &mut bool,
}

impl<'a> BusyFlag<'a> {
    fn saving(store: &'a VerificationStore) -> Self {
        fn flag(ui: &mut UiState) -> &mut bool {
            &mut ui.is_saving
        }
        Self { store, flag }
    }

    fn submitting(store: &'a VerificationStore) -> Self {
        fn flag(ui: &mut UiState) -> &mut bool {
            &mut ui.is_submitting
        }
        Self { store, flag }
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        *(self.flag)(&mut self.store.inner.state().ui) = false;
    }
}

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{ApplicationDocument, EntryId, VerificationId, VerificationStatus};
use super::ids::EntryIdGenerator;
use super::steps::{default_steps, fix_step_ids, StepId, StepState};
use super::ui::UiState;
use super::validation::{overall_progress, validate_step};

/// Root aggregate held by the store: form data plus derived and transient state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub verification_id: Option<VerificationId>,
    pub status: VerificationStatus,
    pub document: ApplicationDocument,
    pub steps: Vec<StepState>,
    pub current_step: usize,
    pub ui: UiState,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Bumped by every edit; a save only clears the dirty flag when it is unchanged.
    #[serde(skip)]
    pub(crate) revision: u64,
    /// Revision carried by the last draft the server accepted.
    #[serde(skip)]
    pub(crate) synced_revision: Option<u64>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            verification_id: None,
            status: VerificationStatus::NotStarted,
            document: ApplicationDocument::default(),
            steps: default_steps(),
            current_step: 0,
            ui: UiState::default(),
            last_saved_at: None,
            revision: 0,
            synced_revision: None,
        }
    }
}

impl StoreState {
    pub fn step(&self, id: StepId) -> &StepState {
        &self.steps[id.index()]
    }

    pub fn current_step_state(&self) -> &StepState {
        &self.steps[self.current_step.min(StepId::ALL.len() - 1)]
    }

    pub fn overall_progress(&self) -> f32 {
        overall_progress(&self.steps)
    }

    pub fn is_locked(&self) -> bool {
        self.status.locks_editing()
    }

    /// Flag an edit: the document differs from the last saved draft.
    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        self.ui.has_unsaved_changes = true;
    }

    pub(crate) fn revalidate(&mut self, step: StepId, now: DateTime<Utc>) {
        let outcome = validate_step(step, &self.document);
        outcome.write_into(&mut self.steps[step.index()], now);
        if outcome.warnings.is_empty() {
            self.ui.warnings.remove(step.slug());
        } else {
            self.ui
                .warnings
                .insert(step.slug().to_string(), outcome.warnings.clone());
        }
        debug!(
            step = step.slug(),
            valid = outcome.is_valid,
            completion = outcome.completion_percentage,
            "step revalidated"
        );
    }

    pub(crate) fn revalidate_all(&mut self, now: DateTime<Utc>) {
        for step in StepId::ALL {
            self.revalidate(step, now);
        }
    }

    /// Central repair pass run whenever state enters the store from outside: canonical
    /// step ids, an in-range cursor, and ids for entries that arrived without one.
    pub(crate) fn normalize(&mut self, ids: &EntryIdGenerator) {
        self.steps = fix_step_ids(std::mem::take(&mut self.steps));
        self.current_step = self.current_step.min(StepId::ALL.len() - 1);

        let teaching = &mut self.document.teaching_information;
        assign_missing_ids(
            teaching.subjects_to_teach.iter_mut().map(|entry| &mut entry.id),
            ids,
        );
        assign_missing_ids(
            teaching.teaching_experience.iter_mut().map(|entry| &mut entry.id),
            ids,
        );
        let background = &mut self.document.professional_background;
        assign_missing_ids(background.education.iter_mut().map(|entry| &mut entry.id), ids);
        assign_missing_ids(background.experience.iter_mut().map(|entry| &mut entry.id), ids);
        assign_missing_ids(background.references.iter_mut().map(|entry| &mut entry.id), ids);
    }
}

/// Blank and duplicated ids are replaced; the first holder of an id keeps it.
fn assign_missing_ids<'a>(slots: impl Iterator<Item = &'a mut EntryId>, ids: &EntryIdGenerator) {
    let mut seen = HashSet::new();
    for id in slots {
        if id.is_blank() || !seen.insert(id.clone()) {
            *id = ids.next_id();
            seen.insert(id.clone());
        } else {
            ids.observe(id);
        }
    }
}

use tracing::debug;

use super::{StoreError, VerificationStore};
use crate::workflows::verification::domain::{
    ApplicationDocument, DayAvailability, Education, EntryId, Experience, Reference,
    SubjectToTeach, TeachingExperience, Weekday,
};
use crate::workflows::verification::ids::EntryIdGenerator;
use crate::workflows::verification::patch::{
    ConsentsPatch, EducationPatch, EmergencyContactPatch, ExperiencePatch, PersonalInfoPatch,
    ProfessionalProfilePatch, ReferencePatch, SubjectPatch, TeachingExperiencePatch,
    TeachingInformationPatch,
};
use crate::workflows::verification::state::StoreState;
use crate::workflows::verification::steps::StepId;
use crate::workflows::verification::ui::APPLICATION_FIELD;

/// An id-addressed entry in one of the document's collections.
trait CollectionEntry: Default {
    const COLLECTION: &'static str;
    const STEP: StepId;
    type Patch;

    fn id(&self) -> &EntryId;
    fn set_id(&mut self, id: EntryId);
    fn apply(&mut self, patch: Self::Patch);
    fn collection(document: &mut ApplicationDocument) -> &mut Vec<Self>;
}

macro_rules! collection_entry {
    ($entry:ty, $patch:ty, $name:literal, $step:expr, |$doc:ident| $field:expr) => {
        impl CollectionEntry for $entry {
            const COLLECTION: &'static str = $name;
            const STEP: StepId = $step;
            type Patch = $patch;

            fn id(&self) -> &EntryId {
                &self.id
            }

            fn set_id(&mut self, id: EntryId) {
                self.id = id;
            }

            fn apply(&mut self, patch: Self::Patch) {
                patch.apply(self);
            }

            fn collection($doc: &mut ApplicationDocument) -> &mut Vec<Self> {
                &mut $field
            }
        }
    };
}

collection_entry!(Education, EducationPatch, "education", StepId::ProfessionalBackground, |doc| doc.professional_background.education);
collection_entry!(Experience, ExperiencePatch, "experience", StepId::ProfessionalBackground, |doc| doc.professional_background.experience);
collection_entry!(Reference, ReferencePatch, "references", StepId::ProfessionalBackground, |doc| doc.professional_background.references);
collection_entry!(SubjectToTeach, SubjectPatch, "subjectsToTeach", StepId::TeachingInformation, |doc| doc.teaching_information.subjects_to_teach);
collection_entry!(TeachingExperience, TeachingExperiencePatch, "teachingExperience", StepId::TeachingInformation, |doc| doc.teaching_information.teaching_experience);

fn missing<E: CollectionEntry>(id: &EntryId) -> StoreError {
    StoreError::NotFound {
        collection: E::COLLECTION,
        id: id.clone(),
    }
}

impl VerificationStore {
    /// Apply a document edit, mark the draft dirty and queue revalidation of `step`.
    /// Rejected while the remote status locks editing or a submission is running.
    pub(crate) fn edit<T>(
        &self,
        step: StepId,
        change: impl FnOnce(&mut StoreState, &EntryIdGenerator) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.edit_scoped(step, APPLICATION_FIELD, "Could not update application", change)
    }

    /// [`Self::edit`] with failures recorded under `field`.
    pub(crate) fn edit_scoped<T>(
        &self,
        step: StepId,
        field: &str,
        title: &str,
        change: impl FnOnce(&mut StoreState, &EntryIdGenerator) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let outcome = {
            let mut state = self.inner.state();
            if state.is_locked() {
                Err(StoreError::Locked(state.status))
            } else if state.ui.is_submitting {
                Err(StoreError::SubmissionInFlight)
            } else {
                let changed = change(&mut *state, &self.inner.ids);
                if changed.is_ok() {
                    state.touch();
                    self.inner.persist_locally(&mut state);
                }
                changed
            }
        };

        match outcome {
            Ok(value) => {
                self.schedule_revalidation(step);
                Ok(value)
            }
            Err(err) => Err(self.fail(field, title, err)),
        }
    }

    fn add_entry<E: CollectionEntry>(&self, patch: E::Patch) -> Result<EntryId, StoreError> {
        self.edit(E::STEP, |state, ids| {
            let mut entry = E::default();
            entry.apply(patch);
            let id = ids.next_id();
            entry.set_id(id.clone());
            E::collection(&mut state.document).push(entry);
            debug!(collection = E::COLLECTION, id = %id, "entry added");
            Ok(id)
        })
    }

    fn update_entry<E: CollectionEntry>(
        &self,
        id: &EntryId,
        patch: E::Patch,
    ) -> Result<(), StoreError> {
        self.edit(E::STEP, |state, _| {
            let entry = E::collection(&mut state.document)
                .iter_mut()
                .find(|entry| entry.id() == id)
                .ok_or_else(|| missing::<E>(id))?;
            entry.apply(patch);
            Ok(())
        })
    }

    fn remove_entry<E: CollectionEntry>(&self, id: &EntryId) -> Result<(), StoreError> {
        self.edit(E::STEP, |state, _| {
            let entries = E::collection(&mut state.document);
            let position = entries
                .iter()
                .position(|entry| entry.id() == id)
                .ok_or_else(|| missing::<E>(id))?;
            entries.remove(position);
            debug!(collection = E::COLLECTION, id = %id, "entry removed");
            Ok(())
        })
    }

    pub fn update_personal_info(&self, patch: PersonalInfoPatch) -> Result<(), StoreError> {
        self.edit(StepId::PersonalInformation, |state, _| {
            patch.apply(&mut state.document.personal_info);
            Ok(())
        })
    }

    pub fn update_emergency_contact(&self, patch: EmergencyContactPatch) -> Result<(), StoreError> {
        self.edit(StepId::PersonalInformation, |state, _| {
            patch.apply(&mut state.document.personal_info.emergency_contact);
            Ok(())
        })
    }

    pub fn update_professional_profile(
        &self,
        patch: ProfessionalProfilePatch,
    ) -> Result<(), StoreError> {
        self.edit(StepId::ProfessionalBackground, |state, _| {
            patch.apply(&mut state.document.professional_background);
            Ok(())
        })
    }

    pub fn add_education(&self, patch: EducationPatch) -> Result<EntryId, StoreError> {
        self.add_entry::<Education>(patch)
    }

    pub fn update_education(&self, id: &EntryId, patch: EducationPatch) -> Result<(), StoreError> {
        self.update_entry::<Education>(id, patch)
    }

    pub fn remove_education(&self, id: &EntryId) -> Result<(), StoreError> {
        self.remove_entry::<Education>(id)
    }

    pub fn add_experience(&self, patch: ExperiencePatch) -> Result<EntryId, StoreError> {
        self.add_entry::<Experience>(patch)
    }

    pub fn update_experience(&self, id: &EntryId, patch: ExperiencePatch) -> Result<(), StoreError> {
        self.update_entry::<Experience>(id, patch)
    }

    pub fn remove_experience(&self, id: &EntryId) -> Result<(), StoreError> {
        self.remove_entry::<Experience>(id)
    }

    pub fn add_reference(&self, patch: ReferencePatch) -> Result<EntryId, StoreError> {
        self.add_entry::<Reference>(patch)
    }

    pub fn update_reference(&self, id: &EntryId, patch: ReferencePatch) -> Result<(), StoreError> {
        self.update_entry::<Reference>(id, patch)
    }

    pub fn remove_reference(&self, id: &EntryId) -> Result<(), StoreError> {
        self.remove_entry::<Reference>(id)
    }

    pub fn add_subject(&self, patch: SubjectPatch) -> Result<EntryId, StoreError> {
        self.add_entry::<SubjectToTeach>(patch)
    }

    pub fn update_subject(&self, id: &EntryId, patch: SubjectPatch) -> Result<(), StoreError> {
        self.update_entry::<SubjectToTeach>(id, patch)
    }

    pub fn remove_subject(&self, id: &EntryId) -> Result<(), StoreError> {
        self.remove_entry::<SubjectToTeach>(id)
    }

    pub fn add_teaching_experience(
        &self,
        patch: TeachingExperiencePatch,
    ) -> Result<EntryId, StoreError> {
        self.add_entry::<TeachingExperience>(patch)
    }

    pub fn update_teaching_experience(
        &self,
        id: &EntryId,
        patch: TeachingExperiencePatch,
    ) -> Result<(), StoreError> {
        self.update_entry::<TeachingExperience>(id, patch)
    }

    pub fn remove_teaching_experience(&self, id: &EntryId) -> Result<(), StoreError> {
        self.remove_entry::<TeachingExperience>(id)
    }

    pub fn update_teaching_information(
        &self,
        patch: TeachingInformationPatch,
    ) -> Result<(), StoreError> {
        self.edit(StepId::TeachingInformation, |state, _| {
            patch.apply(&mut state.document.teaching_information);
            Ok(())
        })
    }

    /// Replace one day of the weekly availability.
    pub fn set_availability(
        &self,
        day: Weekday,
        availability: DayAvailability,
    ) -> Result<(), StoreError> {
        self.edit(StepId::TeachingInformation, |state, _| {
            state
                .document
                .teaching_information
                .weekly_availability
                .insert(day, availability);
            Ok(())
        })
    }

    pub fn update_consents(&self, patch: ConsentsPatch) -> Result<(), StoreError> {
        self.edit(StepId::Review, |state, _| {
            patch.apply(&mut state.document.consents);
            Ok(())
        })
    }

    pub fn set_auto_save_enabled(&self, enabled: bool) {
        let mut state = self.inner.state();
        state.ui.auto_save_enabled = enabled;
        self.inner.persist_locally(&mut state);
    }

    pub fn clear_field_errors(&self, field: &str) {
        let mut state = self.inner.state();
        state.ui.clear_field_errors(field);
        self.inner.persist_locally(&mut state);
    }

    /// Returns whether a notification with that id was present.
    pub fn dismiss_notification(&self, id: &str) -> bool {
        let mut state = self.inner.state();
        let before = state.ui.notifications.len();
        state.ui.notifications.retain(|notification| notification.id != id);
        let removed = state.ui.notifications.len() != before;
        if removed {
            self.inner.persist_locally(&mut state);
        }
        removed
    }
}

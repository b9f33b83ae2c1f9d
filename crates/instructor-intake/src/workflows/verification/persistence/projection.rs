use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{
    ApplicationDocument, Consents, DocumentUpload, Documents, EntryId, PersonalInfo,
    ProfessionalBackground, ReviewStatus, TeachingInformation, VerificationId,
    VerificationStatus,
};
use super::super::state::StoreState;
use super::super::steps::{default_steps, StepState};
use super::super::ui::{Notification, UiState};
use super::migration::CURRENT_SNAPSHOT_VERSION;

/// Upload metadata as it is allowed to leave memory: no inline preview, no bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: EntryId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub verification_status: ReviewStatus,
}

impl From<&DocumentUpload> for StoredDocument {
    fn from(upload: &DocumentUpload) -> Self {
        Self {
            id: upload.id.clone(),
            name: upload.name.clone(),
            size: upload.size,
            mime_type: upload.mime_type.clone(),
            url: upload.url.clone(),
            preview_url: upload.preview_url.clone(),
            upload_date: upload.upload_date,
            verification_status: upload.verification_status,
        }
    }
}

impl From<StoredDocument> for DocumentUpload {
    fn from(stored: StoredDocument) -> Self {
        Self {
            id: stored.id,
            name: stored.name,
            size: stored.size,
            mime_type: stored.mime_type,
            url: stored.url,
            preview_url: stored.preview_url,
            data_url: None,
            upload_date: stored.upload_date,
            verification_status: stored.verification_status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredDocuments {
    pub identity_document: Option<StoredDocument>,
    pub profile_photo: Option<StoredDocument>,
    pub video_introduction: Option<StoredDocument>,
    pub teaching_demo: Option<StoredDocument>,
    pub resume: Option<StoredDocument>,
    pub education_certificates: Vec<StoredDocument>,
    pub professional_certifications: Vec<StoredDocument>,
    pub employment_verification: Vec<StoredDocument>,
}

fn stored_list(uploads: &[DocumentUpload]) -> Vec<StoredDocument> {
    uploads.iter().map(StoredDocument::from).collect()
}

fn restored_list(stored: Vec<StoredDocument>) -> Vec<DocumentUpload> {
    stored.into_iter().map(DocumentUpload::from).collect()
}

impl From<&Documents> for StoredDocuments {
    fn from(documents: &Documents) -> Self {
        Self {
            identity_document: documents.identity_document.as_ref().map(StoredDocument::from),
            profile_photo: documents.profile_photo.as_ref().map(StoredDocument::from),
            video_introduction: documents.video_introduction.as_ref().map(StoredDocument::from),
            teaching_demo: documents.teaching_demo.as_ref().map(StoredDocument::from),
            resume: documents.resume.as_ref().map(StoredDocument::from),
            education_certificates: stored_list(&documents.education_certificates),
            professional_certifications: stored_list(&documents.professional_certifications),
            employment_verification: stored_list(&documents.employment_verification),
        }
    }
}

impl From<StoredDocuments> for Documents {
    fn from(stored: StoredDocuments) -> Self {
        Self {
            identity_document: stored.identity_document.map(DocumentUpload::from),
            profile_photo: stored.profile_photo.map(DocumentUpload::from),
            video_introduction: stored.video_introduction.map(DocumentUpload::from),
            teaching_demo: stored.teaching_demo.map(DocumentUpload::from),
            resume: stored.resume.map(DocumentUpload::from),
            education_certificates: restored_list(stored.education_certificates),
            professional_certifications: restored_list(stored.professional_certifications),
            employment_verification: restored_list(stored.employment_verification),
        }
    }
}

/// The part of the UI state worth surviving a reload. Busy flags are left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredUi {
    pub auto_save_enabled: bool,
    pub has_unsaved_changes: bool,
    pub errors: BTreeMap<String, Vec<String>>,
    pub warnings: BTreeMap<String, Vec<String>>,
    pub notifications: Vec<Notification>,
}

impl Default for StoredUi {
    fn default() -> Self {
        Self {
            auto_save_enabled: true,
            has_unsaved_changes: false,
            errors: BTreeMap::new(),
            warnings: BTreeMap::new(),
            notifications: Vec::new(),
        }
    }
}

/// Reduced projection of [`StoreState`] written to local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub version: u32,
    #[serde(default)]
    pub verification_id: Option<VerificationId>,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub professional_background: ProfessionalBackground,
    #[serde(default)]
    pub teaching_information: TeachingInformation,
    #[serde(default)]
    pub documents: StoredDocuments,
    #[serde(default)]
    pub consents: Consents,
    #[serde(default = "default_steps")]
    pub steps: Vec<StepState>,
    #[serde(default)]
    pub current_step: usize,
    #[serde(default)]
    pub ui: StoredUi,
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl LocalSnapshot {
    pub fn capture(state: &StoreState) -> Self {
        let document = &state.document;
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            verification_id: state.verification_id.clone(),
            status: state.status,
            personal_info: document.personal_info.clone(),
            professional_background: document.professional_background.clone(),
            teaching_information: document.teaching_information.clone(),
            documents: StoredDocuments::from(&document.documents),
            consents: document.consents,
            steps: state.steps.clone(),
            current_step: state.current_step,
            ui: StoredUi {
                auto_save_enabled: state.ui.auto_save_enabled,
                has_unsaved_changes: state.ui.has_unsaved_changes,
                errors: state.ui.errors.clone(),
                warnings: state.ui.warnings.clone(),
                notifications: state.ui.notifications.clone(),
            },
            last_saved_at: state.last_saved_at,
        }
    }

    /// Drop everything but the newest `keep` notifications and the transient maps.
    pub fn trimmed(&self, keep: usize) -> Self {
        let mut trimmed = self.clone();
        let excess = trimmed.ui.notifications.len().saturating_sub(keep);
        trimmed.ui.notifications.drain(..excess);
        trimmed.ui.errors.clear();
        trimmed.ui.warnings.clear();
        trimmed
    }

    /// Rebuild a store state. Busy flags always start cleared.
    pub fn into_state(self) -> StoreState {
        StoreState {
            verification_id: self.verification_id,
            status: self.status,
            document: ApplicationDocument {
                personal_info: self.personal_info,
                professional_background: self.professional_background,
                teaching_information: self.teaching_information,
                documents: Documents::from(self.documents),
                consents: self.consents,
            },
            steps: self.steps,
            current_step: self.current_step,
            ui: UiState {
                auto_save_enabled: self.ui.auto_save_enabled,
                has_unsaved_changes: self.ui.has_unsaved_changes,
                errors: self.ui.errors,
                warnings: self.ui.warnings,
                notifications: self.ui.notifications,
                ..UiState::default()
            },
            last_saved_at: self.last_saved_at,
            revision: 0,
            synced_revision: None,
        }
    }
}

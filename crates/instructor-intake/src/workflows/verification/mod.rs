//! Multi-step instructor application engine: document model, per-step validation,
//! local snapshots, remote draft sync and gated navigation.

pub mod domain;
pub mod gateway;
pub mod ids;
pub mod patch;
pub mod persistence;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod steps;
pub mod store;
pub mod ui;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationDocument, Consents, DayAvailability, DocumentSlot, DocumentUpload, Documents,
    Education, EmergencyContact, EntryId, Experience, LanguageSkill, PersonalInfo, Proficiency,
    ProfessionalBackground, Reference, ReviewStatus, SlotKind, SubjectLevel, SubjectToTeach,
    TeachingExperience, TeachingInformation, TimeSlot, VerificationId, VerificationStatus,
    Weekday,
};
pub use gateway::{
    ContentCategory, DraftPayload, FileUpload, GatewayError, GatewayResponse, Notifier,
    RemoteVerification, Session, TracingNotifier, UploadError, UploadGateway, UploadMetadata,
    UploadedFile, VerificationGateway,
};
pub use persistence::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use router::verification_router;
pub use state::StoreState;
pub use steps::{StepId, StepState};
pub use store::{
    AutoSaver, Collaborators, LoadOutcome, SaveOutcome, SkipReason, StoreError, StoreView,
    SubmitOutcome, VerificationStore,
};
pub use ui::{Notification, NotificationKind, UiState};
pub use validation::{
    overall_progress, validate_consents_for_submission, validate_document, validate_step,
    AlwaysProceed, GatePolicy, RequireValidStep, StepGate, StepValidation, ValidationReport,
};

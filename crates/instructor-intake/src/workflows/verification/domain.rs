use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of the verification record backing a draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationId(pub String);

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-generated identifier for collection entries. Never reused within a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the server-side verification record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    #[default]
    #[serde(alias = "not started", alias = "not_started")]
    NotStarted,
    Submitted,
    UnderReview,
    RequiresMoreInfo,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::NotStarted => "not started",
            VerificationStatus::Submitted => "submitted",
            VerificationStatus::UnderReview => "under review",
            VerificationStatus::RequiresMoreInfo => "requires more info",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Records already in flight must not be resumed for local editing.
    pub const fn locks_editing(self) -> bool {
        matches!(
            self,
            VerificationStatus::Submitted | VerificationStatus::UnderReview
        )
    }
}

/// Outcome of an external reviewer's check on a single entry or upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Verified,
    Failed,
}

/// The form data of an instructor application, one sub-tree per wizard step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicationDocument {
    pub personal_info: PersonalInfo,
    pub professional_background: ProfessionalBackground,
    pub teaching_information: TeachingInformation,
    pub documents: Documents,
    pub consents: Consents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub nationality: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub timezone: String,
    pub languages_spoken: Vec<LanguageSkill>,
    pub emergency_contact: EmergencyContact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LanguageSkill {
    pub language: String,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    #[default]
    Basic,
    Conversational,
    Fluent,
    Native,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    pub email: String,
}

impl EmergencyContact {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.phone_number.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfessionalBackground {
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub references: Vec<Reference>,
    pub skills: Vec<String>,
    pub linkedin_profile: String,
    pub portfolio_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Education {
    pub id: EntryId,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_current: bool,
    pub gpa: Option<String>,
    pub description: String,
    pub verification_status: ReviewStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Experience {
    pub id: EntryId,
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_current: bool,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub verification_status: ReviewStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reference {
    pub id: EntryId,
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub relationship: String,
    pub years_known: u8,
    pub verification_status: ReviewStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeachingInformation {
    pub subjects_to_teach: Vec<SubjectToTeach>,
    pub teaching_experience: Vec<TeachingExperience>,
    pub teaching_motivation: String,
    pub teaching_philosophy: String,
    pub teaching_methodology: String,
    pub target_audience: Vec<String>,
    pub weekly_availability: BTreeMap<Weekday, DayAvailability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectToTeach {
    pub id: EntryId,
    pub subject: String,
    pub category: String,
    pub level: SubjectLevel,
    pub experience: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeachingExperience {
    pub id: EntryId,
    pub institution: String,
    pub role: String,
    pub subject: String,
    pub level: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_current: bool,
    pub description: String,
    pub student_count: Option<u32>,
    pub verification_status: ReviewStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| day.label() == normalized || day.label()[..3] == normalized)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DayAvailability {
    pub available: bool,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

/// Metadata of an uploaded file. `data_url` is an inline preview for small images only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub id: EntryId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub verification_status: ReviewStatus,
}

/// Fixed-shape record of upload slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Documents {
    pub identity_document: Option<DocumentUpload>,
    pub profile_photo: Option<DocumentUpload>,
    pub video_introduction: Option<DocumentUpload>,
    pub teaching_demo: Option<DocumentUpload>,
    pub resume: Option<DocumentUpload>,
    pub education_certificates: Vec<DocumentUpload>,
    pub professional_certifications: Vec<DocumentUpload>,
    pub employment_verification: Vec<DocumentUpload>,
}

impl Documents {
    pub fn single(&self, slot: DocumentSlot) -> Option<&DocumentUpload> {
        match slot {
            DocumentSlot::IdentityDocument => self.identity_document.as_ref(),
            DocumentSlot::ProfilePhoto => self.profile_photo.as_ref(),
            DocumentSlot::VideoIntroduction => self.video_introduction.as_ref(),
            DocumentSlot::TeachingDemo => self.teaching_demo.as_ref(),
            DocumentSlot::Resume => self.resume.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn single_mut(&mut self, slot: DocumentSlot) -> Option<&mut Option<DocumentUpload>> {
        match slot {
            DocumentSlot::IdentityDocument => Some(&mut self.identity_document),
            DocumentSlot::ProfilePhoto => Some(&mut self.profile_photo),
            DocumentSlot::VideoIntroduction => Some(&mut self.video_introduction),
            DocumentSlot::TeachingDemo => Some(&mut self.teaching_demo),
            DocumentSlot::Resume => Some(&mut self.resume),
            _ => None,
        }
    }

    pub fn list(&self, slot: DocumentSlot) -> &[DocumentUpload] {
        match slot {
            DocumentSlot::EducationCertificates => &self.education_certificates,
            DocumentSlot::ProfessionalCertifications => &self.professional_certifications,
            DocumentSlot::EmploymentVerification => &self.employment_verification,
            _ => &[],
        }
    }

    pub(crate) fn list_mut(&mut self, slot: DocumentSlot) -> Option<&mut Vec<DocumentUpload>> {
        match slot {
            DocumentSlot::EducationCertificates => Some(&mut self.education_certificates),
            DocumentSlot::ProfessionalCertifications => Some(&mut self.professional_certifications),
            DocumentSlot::EmploymentVerification => Some(&mut self.employment_verification),
            _ => None,
        }
    }

    /// Every upload currently held, across singular and list slots.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentSlot, &DocumentUpload)> {
        DocumentSlot::ALL.into_iter().flat_map(move |slot| {
            let uploads: Vec<&DocumentUpload> = match slot.kind() {
                SlotKind::Single => self.single(slot).into_iter().collect(),
                SlotKind::List => self.list(slot).iter().collect(),
            };
            uploads.into_iter().map(move |upload| (slot, upload))
        })
    }
}

/// Named position in the documents sub-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSlot {
    IdentityDocument,
    ProfilePhoto,
    VideoIntroduction,
    TeachingDemo,
    Resume,
    EducationCertificates,
    ProfessionalCertifications,
    EmploymentVerification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Single,
    List,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 8] = [
        DocumentSlot::IdentityDocument,
        DocumentSlot::ProfilePhoto,
        DocumentSlot::VideoIntroduction,
        DocumentSlot::TeachingDemo,
        DocumentSlot::Resume,
        DocumentSlot::EducationCertificates,
        DocumentSlot::ProfessionalCertifications,
        DocumentSlot::EmploymentVerification,
    ];

    pub const fn kind(self) -> SlotKind {
        match self {
            DocumentSlot::EducationCertificates
            | DocumentSlot::ProfessionalCertifications
            | DocumentSlot::EmploymentVerification => SlotKind::List,
            _ => SlotKind::Single,
        }
    }

    /// Wire name of the slot, also used as the key for field-scoped errors.
    pub const fn field_name(self) -> &'static str {
        match self {
            DocumentSlot::IdentityDocument => "identityDocument",
            DocumentSlot::ProfilePhoto => "profilePhoto",
            DocumentSlot::VideoIntroduction => "videoIntroduction",
            DocumentSlot::TeachingDemo => "teachingDemo",
            DocumentSlot::Resume => "resume",
            DocumentSlot::EducationCertificates => "educationCertificates",
            DocumentSlot::ProfessionalCertifications => "professionalCertifications",
            DocumentSlot::EmploymentVerification => "employmentVerification",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        DocumentSlot::ALL
            .into_iter()
            .find(|slot| slot.field_name().to_ascii_lowercase() == normalized)
    }
}

/// Six independent consents. Only three of them gate submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Consents {
    pub term_of_service: bool,
    pub privacy_policy: bool,
    pub background_check: bool,
    pub data_processing: bool,
    pub marketing_communications: bool,
    pub code_of_conduct: bool,
}

impl Consents {
    pub fn mandatory(&self) -> [(MandatoryConsent, bool); 3] {
        [
            (MandatoryConsent::TermOfService, self.term_of_service),
            (MandatoryConsent::PrivacyPolicy, self.privacy_policy),
            (MandatoryConsent::BackgroundCheck, self.background_check),
        ]
    }

    pub fn accepted_mandatory(&self) -> usize {
        self.mandatory()
            .iter()
            .filter(|(_, accepted)| *accepted)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryConsent {
    TermOfService,
    PrivacyPolicy,
    BackgroundCheck,
}

impl MandatoryConsent {
    pub const fn requirement(self) -> &'static str {
        match self {
            MandatoryConsent::TermOfService => "You must accept the term of service",
            MandatoryConsent::PrivacyPolicy => "You must accept the privacy policy",
            MandatoryConsent::BackgroundCheck => "You must consent to the background check",
        }
    }
}

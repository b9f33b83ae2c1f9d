use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::domain::{
    Consents, DocumentSlot, Documents, PersonalInfo, ProfessionalBackground, TeachingInformation,
    VerificationId, VerificationStatus,
};
use super::persistence::StoredDocuments;
use super::ui::{Notification, NotificationKind};

/// Caller identity forwarded to the remote collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Both halves of the credentials, or `None` when the caller must sign in again.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.user_id.as_deref().filter(|value| !value.trim().is_empty())?;
        let token = self.token.as_deref().filter(|value| !value.trim().is_empty())?;
        Some((user, token))
    }
}

/// Envelope shared by every verification service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> GatewayResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
        }
    }

    /// Collapse an unsuccessful envelope into a [`GatewayError::Rejected`].
    pub fn into_result(self) -> Result<Option<T>, GatewayError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(GatewayError::Rejected {
                message: self.message,
                errors: self.errors,
            })
        }
    }
}

/// Remote verification record. Every section is optional so older or partial server
/// schemas still hydrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVerification {
    pub id: VerificationId,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default)]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default)]
    pub professional_background: Option<ProfessionalBackground>,
    #[serde(default)]
    pub teaching_information: Option<TeachingInformation>,
    #[serde(default)]
    pub documents: Option<Documents>,
    #[serde(default)]
    pub consents: Option<Consents>,
}

/// Full document upserted as a draft. Uploads travel as metadata only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayload {
    pub personal_info: PersonalInfo,
    pub professional_background: ProfessionalBackground,
    pub teaching_information: TeachingInformation,
    pub documents: StoredDocuments,
    pub consents: Consents,
    pub current_step: usize,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{message}")]
    Rejected {
        message: String,
        errors: Vec<String>,
    },
    #[error("verification service unavailable: {0}")]
    Transport(String),
}

/// Remote draft/verification service.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn load_or_create(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<GatewayResponse<RemoteVerification>, GatewayError>;

    async fn save_draft(
        &self,
        verification_id: &VerificationId,
        draft: &DraftPayload,
        token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError>;

    async fn submit(
        &self,
        verification_id: &VerificationId,
        consents: &Consents,
        token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError>;
}

/// Binary payload handed to the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Coarse content class the upload service routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Image,
    Video,
    Pdf,
    Document,
}

impl ContentCategory {
    pub fn from_mime(raw: &str) -> Self {
        match raw.trim().parse::<mime::Mime>() {
            Ok(parsed) if parsed.type_() == mime::IMAGE => Self::Image,
            Ok(parsed) if parsed.type_() == mime::VIDEO => Self::Video,
            Ok(parsed) if parsed.subtype() == mime::PDF => Self::Pdf,
            _ => Self::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub slot: DocumentSlot,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<VerificationId>,
}

/// Upload service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload service unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload_file(
        &self,
        file: &FileUpload,
        category: ContentCategory,
        metadata: &UploadMetadata,
        token: &str,
    ) -> Result<UploadedFile, UploadError>;
}

/// Fire-and-forget side channel for user-facing messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Notifier that only logs, for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Error => {
                error!(title = %notification.title, body = %notification.message, "notification")
            }
            NotificationKind::Warning => {
                warn!(title = %notification.title, body = %notification.message, "notification")
            }
            NotificationKind::Success | NotificationKind::Info => {
                info!(title = %notification.title, body = %notification.message, "notification")
            }
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use instructor_intake::config::EngineConfig;
use instructor_intake::workflows::verification::{
    Consents, ContentCategory, DraftPayload, FileStorage, FileUpload, GatewayError,
    GatewayResponse, LocalStorage, MemoryStorage, RemoteVerification, UploadError,
    UploadGateway, UploadMetadata, UploadedFile, VerificationGateway, VerificationId,
    VerificationStatus,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Verification service backed by a map keyed on user id. Saved drafts are replayed
/// on the next load.
#[derive(Default)]
pub(crate) struct InMemoryVerificationService {
    records: Mutex<HashMap<String, RemoteVerification>>,
    next_id: AtomicU64,
}

impl InMemoryVerificationService {
    pub(crate) fn status_of(&self, user_id: &str) -> Option<VerificationStatus> {
        let guard = self.records.lock().expect("verification mutex poisoned");
        guard.get(user_id).map(|record| record.status)
    }

    fn owner_of<'a>(
        records: &'a mut HashMap<String, RemoteVerification>,
        verification_id: &VerificationId,
    ) -> Result<&'a mut RemoteVerification, GatewayError> {
        records
            .values_mut()
            .find(|record| &record.id == verification_id)
            .ok_or_else(|| GatewayError::Rejected {
                message: format!("verification {verification_id} not found"),
                errors: Vec::new(),
            })
    }
}

fn require_token(token: &str) -> Result<(), GatewayError> {
    if token.trim().is_empty() {
        Err(GatewayError::Unauthorized)
    } else {
        Ok(())
    }
}

#[async_trait]
impl VerificationGateway for InMemoryVerificationService {
    async fn load_or_create(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<GatewayResponse<RemoteVerification>, GatewayError> {
        require_token(token)?;
        let mut guard = self.records.lock().expect("verification mutex poisoned");
        let record = guard.entry(user_id.to_string()).or_insert_with(|| {
            let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(user_id, sequence, "created verification record");
            RemoteVerification {
                id: VerificationId(format!("ver-{sequence:05}")),
                status: VerificationStatus::NotStarted,
                personal_info: None,
                professional_background: None,
                teaching_information: None,
                documents: None,
                consents: None,
            }
        });
        Ok(GatewayResponse::ok("verification loaded", Some(record.clone())))
    }

    async fn save_draft(
        &self,
        verification_id: &VerificationId,
        draft: &DraftPayload,
        token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError> {
        require_token(token)?;
        let mut guard = self.records.lock().expect("verification mutex poisoned");
        let record = match Self::owner_of(&mut guard, verification_id) {
            Ok(record) => record,
            Err(GatewayError::Rejected { message, errors }) => {
                return Ok(GatewayResponse::failure(message, errors))
            }
            Err(other) => return Err(other),
        };
        if record.status.locks_editing() {
            return Ok(GatewayResponse::failure(
                "verification is already under review",
                Vec::new(),
            ));
        }

        record.personal_info = Some(draft.personal_info.clone());
        record.professional_background = Some(draft.professional_background.clone());
        record.teaching_information = Some(draft.teaching_information.clone());
        record.documents = Some(draft.documents.clone().into());
        record.consents = Some(draft.consents);
        Ok(GatewayResponse::ok("draft saved", None))
    }

    async fn submit(
        &self,
        verification_id: &VerificationId,
        consents: &Consents,
        token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError> {
        require_token(token)?;
        let mut guard = self.records.lock().expect("verification mutex poisoned");
        let record = Self::owner_of(&mut guard, verification_id)?;
        record.consents = Some(*consents);
        record.status = VerificationStatus::Submitted;
        Ok(GatewayResponse::ok("verification submitted", None))
    }
}

/// Upload service that keeps nothing but a counter and hands out `memory://` URLs.
#[derive(Default)]
pub(crate) struct InMemoryUploadService {
    uploaded: AtomicU64,
}

impl InMemoryUploadService {
    pub(crate) fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UploadGateway for InMemoryUploadService {
    async fn upload_file(
        &self,
        file: &FileUpload,
        category: ContentCategory,
        metadata: &UploadMetadata,
        token: &str,
    ) -> Result<UploadedFile, UploadError> {
        if token.trim().is_empty() {
            return Err(UploadError::Rejected("missing upload token".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(UploadError::Rejected(format!("{} is empty", file.name)));
        }
        if file.size() > MAX_UPLOAD_BYTES {
            return Err(UploadError::Rejected(format!(
                "{} exceeds the {} MiB limit",
                file.name,
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let sequence = self.uploaded.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("file-{sequence:06}");
        debug!(?category, slot = metadata.slot.field_name(), %id, "stored upload");
        Ok(UploadedFile {
            url: format!(
                "memory://uploads/{}/{}/{id}",
                metadata.user_id,
                metadata.slot.field_name()
            ),
            id,
            name: file.name.clone(),
            size: file.size(),
            content_type: file.mime_type.clone(),
            uploaded_at: Utc::now(),
        })
    }
}

/// Directory-backed storage when a directory is configured, memory otherwise.
pub(crate) fn local_storage(config: &EngineConfig) -> Arc<dyn LocalStorage> {
    match (&config.storage_dir, config.storage_quota_bytes) {
        (Some(dir), Some(quota)) => Arc::new(FileStorage::new(dir).with_quota(quota)),
        (Some(dir), None) => Arc::new(FileStorage::new(dir)),
        (None, Some(quota)) => Arc::new(MemoryStorage::with_quota(quota)),
        (None, None) => Arc::new(MemoryStorage::new()),
    }
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::EngineConfig;
use crate::workflows::verification::domain::{
    Consents, DocumentUpload, EntryId, ReviewStatus, VerificationId, VerificationStatus,
};
use crate::workflows::verification::gateway::{
    ContentCategory, DraftPayload, FileUpload, GatewayError, GatewayResponse, Notifier,
    RemoteVerification, Session, UploadError, UploadGateway, UploadMetadata, UploadedFile,
    VerificationGateway,
};
use crate::workflows::verification::patch::{
    ConsentsPatch, EducationPatch, ExperiencePatch, PersonalInfoPatch, ReferencePatch,
    SubjectPatch, TeachingInformationPatch,
};
use crate::workflows::verification::persistence::{LocalStorage, MemoryStorage};
use crate::workflows::verification::store::{Collaborators, VerificationStore};
use crate::workflows::verification::ui::Notification;

pub(super) const VERIFICATION_ID: &str = "ver-1001";

pub(super) fn session() -> Session {
    Session::new("user-42", "token-abc")
}

pub(super) fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

/// In-memory verification service recording every call.
#[derive(Default)]
pub(super) struct FakeVerificationService {
    record: Mutex<Option<RemoteVerification>>,
    drafts: Mutex<Vec<DraftPayload>>,
    submissions: Mutex<Vec<(VerificationId, Consents)>>,
    load_calls: AtomicUsize,
    reject_saves: AtomicBool,
    offline: AtomicBool,
    revoked: AtomicBool,
    load_gate: Mutex<Option<Arc<Notify>>>,
    save_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeVerificationService {
    pub(super) fn with_record(record: RemoteVerification) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ..Self::default()
        }
    }

    pub(super) fn drafts(&self) -> Vec<DraftPayload> {
        self.drafts.lock().expect("drafts lock").clone()
    }

    pub(super) fn submissions(&self) -> Vec<(VerificationId, Consents)> {
        self.submissions.lock().expect("submissions lock").clone()
    }

    pub(super) fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub(super) fn reject_saves(&self) {
        self.reject_saves.store(true, Ordering::SeqCst);
    }

    pub(super) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Answer every call as if the bearer token had expired.
    pub(super) fn revoke_token(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Park every subsequent load until the returned handle is notified.
    pub(super) fn hold_loads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.load_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    /// Park every subsequent save until the returned handle is notified.
    pub(super) fn hold_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.save_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }
}

pub(super) fn remote_record(status: VerificationStatus) -> RemoteVerification {
    RemoteVerification {
        id: VerificationId(VERIFICATION_ID.to_string()),
        status,
        personal_info: None,
        professional_background: None,
        teaching_information: None,
        documents: None,
        consents: None,
    }
}

#[async_trait]
impl VerificationGateway for FakeVerificationService {
    async fn load_or_create(
        &self,
        _user_id: &str,
        _token: &str,
    ) -> Result<GatewayResponse<RemoteVerification>, GatewayError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.load_gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.revoked.load(Ordering::SeqCst) {
            return Err(GatewayError::Unauthorized);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        let mut record = self.record.lock().expect("record lock");
        let record = record
            .get_or_insert_with(|| remote_record(VerificationStatus::NotStarted))
            .clone();
        Ok(GatewayResponse::ok("loaded", Some(record)))
    }

    async fn save_draft(
        &self,
        _verification_id: &VerificationId,
        draft: &DraftPayload,
        _token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError> {
        let gate = self.save_gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        if self.reject_saves.load(Ordering::SeqCst) {
            return Ok(GatewayResponse::failure(
                "draft rejected",
                vec!["payload too large".to_string()],
            ));
        }
        self.drafts.lock().expect("drafts lock").push(draft.clone());
        Ok(GatewayResponse::ok("saved", None))
    }

    async fn submit(
        &self,
        verification_id: &VerificationId,
        consents: &Consents,
        _token: &str,
    ) -> Result<GatewayResponse<()>, GatewayError> {
        self.submissions
            .lock()
            .expect("submissions lock")
            .push((verification_id.clone(), *consents));
        Ok(GatewayResponse::ok("submitted", None))
    }
}

/// Upload service that answers with predictable URLs.
#[derive(Default)]
pub(super) struct FakeUploads {
    calls: Mutex<Vec<(ContentCategory, UploadMetadata)>>,
    reject: AtomicBool,
    started: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeUploads {
    /// Uploads that have reached the service, finished or not.
    pub(super) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Park every subsequent upload until the returned handle is notified.
    pub(super) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    pub(super) fn calls(&self) -> Vec<(ContentCategory, UploadMetadata)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(super) fn reject(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub(super) fn accept(&self) {
        self.reject.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl UploadGateway for FakeUploads {
    async fn upload_file(
        &self,
        file: &FileUpload,
        category: ContentCategory,
        metadata: &UploadMetadata,
        _token: &str,
    ) -> Result<UploadedFile, UploadError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected("file type not allowed".to_string()));
        }
        let mut calls = self.calls.lock().expect("calls lock");
        calls.push((category, metadata.clone()));
        let index = calls.len();
        Ok(UploadedFile {
            id: format!("file-{index}"),
            name: file.name.clone(),
            size: file.size(),
            content_type: file.mime_type.clone(),
            url: format!("https://files.example.test/{index}/{}", file.name),
            uploaded_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(super) fn titles(&self) -> Vec<String> {
        self.seen
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|notification| notification.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen
            .lock()
            .expect("notifier lock")
            .push(notification.clone());
    }
}

pub(super) struct Harness {
    pub store: VerificationStore,
    pub remote: Arc<FakeVerificationService>,
    pub uploads: Arc<FakeUploads>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<MemoryStorage>,
}

pub(super) fn harness() -> Harness {
    harness_with(
        FakeVerificationService::default(),
        Arc::new(MemoryStorage::new()),
        engine_config(),
    )
}

pub(super) fn harness_with(
    remote: FakeVerificationService,
    storage: Arc<MemoryStorage>,
    config: EngineConfig,
) -> Harness {
    let remote = Arc::new(remote);
    let uploads = Arc::new(FakeUploads::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = VerificationStore::new(
        Collaborators {
            remote: remote.clone(),
            uploads: uploads.clone(),
            notifier: notifier.clone(),
            storage: storage.clone() as Arc<dyn LocalStorage>,
        },
        config,
    );
    Harness {
        store,
        remote,
        uploads,
        notifier,
        storage,
    }
}

pub(super) fn motivation(chars: usize) -> String {
    "m".repeat(chars)
}

pub(super) fn complete_personal_info() -> PersonalInfoPatch {
    PersonalInfoPatch {
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        email: Some("ada@example.test".to_string()),
        phone_number: Some("+44 20 7946 0000".to_string()),
        date_of_birth: Some("1815-12-10".to_string()),
        nationality: Some("British".to_string()),
        street_address: Some("12 St James's Square".to_string()),
        city: Some("London".to_string()),
        country: Some("United Kingdom".to_string()),
        ..PersonalInfoPatch::default()
    }
}

pub(super) fn education() -> EducationPatch {
    EducationPatch {
        institution: Some("University of London".to_string()),
        degree: Some("BSc".to_string()),
        field_of_study: Some("Mathematics".to_string()),
        start_date: Some("2010-09".to_string()),
        ..EducationPatch::default()
    }
}

pub(super) fn experience() -> ExperiencePatch {
    ExperiencePatch {
        company: Some("Analytical Engines Ltd".to_string()),
        position: Some("Analyst".to_string()),
        start_date: Some("2014-01".to_string()),
        is_current: Some(true),
        ..ExperiencePatch::default()
    }
}

pub(super) fn reference(name: &str) -> ReferencePatch {
    ReferencePatch {
        name: Some(name.to_string()),
        email: Some(format!("{}@example.test", name.to_lowercase())),
        relationship: Some("Manager".to_string()),
        years_known: Some(4),
        ..ReferencePatch::default()
    }
}

pub(super) fn subject() -> SubjectPatch {
    SubjectPatch {
        subject: Some("Calculus".to_string()),
        category: Some("Mathematics".to_string()),
        ..SubjectPatch::default()
    }
}

pub(super) fn teaching_details(motivation_chars: usize) -> TeachingInformationPatch {
    TeachingInformationPatch {
        teaching_motivation: Some(motivation(motivation_chars)),
        teaching_philosophy: Some("Learning by doing".to_string()),
        target_audience: Some(vec!["University students".to_string()]),
        ..TeachingInformationPatch::default()
    }
}

pub(super) fn stored_upload(id: &str, mime_type: &str) -> DocumentUpload {
    DocumentUpload {
        id: EntryId(id.to_string()),
        name: format!("{id}.bin"),
        size: 2048,
        mime_type: mime_type.to_string(),
        url: format!("https://files.example.test/{id}"),
        preview_url: None,
        data_url: None,
        upload_date: Utc::now(),
        verification_status: ReviewStatus::Pending,
    }
}

/// Fill every content step with valid data. Consents are left untouched.
pub(super) fn fill_content_steps(store: &VerificationStore) {
    store
        .update_personal_info(complete_personal_info())
        .expect("personal info");
    store.add_education(education()).expect("education");
    store.add_experience(experience()).expect("experience");
    store.add_reference(reference("Grace")).expect("reference");
    store.add_reference(reference("Alan")).expect("reference");
    store.add_subject(subject()).expect("subject");
    store
        .update_teaching_information(teaching_details(120))
        .expect("teaching information");
    store.with_state(|state| {
        let documents = &mut state.document.documents;
        documents.identity_document = Some(stored_upload("passport", "application/pdf"));
        documents.profile_photo = Some(stored_upload("photo", "image/png"));
        documents.resume = Some(stored_upload("resume", "application/pdf"));
    });
    store.validate_all();
}

pub(super) fn accept_mandatory_consents(store: &VerificationStore) {
    store
        .update_consents(ConsentsPatch {
            term_of_service: Some(true),
            privacy_policy: Some(true),
            background_check: Some(true),
            ..ConsentsPatch::default()
        })
        .expect("consents");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected response status");
}

//! End-to-end scenarios for the instructor application wizard.
//!
//! Everything goes through the public store facade and the HTTP router, with in-memory
//! stand-ins for the verification and upload services.

mod common {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use chrono::Utc;
    use serde_json::Value;

    use instructor_intake::config::EngineConfig;
    use instructor_intake::workflows::verification::{
        Collaborators, Consents, ContentCategory, DraftPayload, FileUpload, GatewayError,
        GatewayResponse, LocalStorage, MemoryStorage, RemoteVerification, TracingNotifier,
        UploadError, UploadGateway, UploadMetadata, UploadedFile, VerificationGateway,
        VerificationId, VerificationStatus, VerificationStore,
    };

    pub(super) const USER: &str = "instructor-7";
    pub(super) const TOKEN: &str = "token-xyz";

    #[derive(Default)]
    pub(super) struct RecordingService {
        status: Mutex<Option<VerificationStatus>>,
        drafts: Mutex<Vec<DraftPayload>>,
        submissions: AtomicUsize,
    }

    impl RecordingService {
        pub(super) fn drafts(&self) -> Vec<DraftPayload> {
            self.drafts.lock().expect("drafts lock").clone()
        }

        pub(super) fn submissions(&self) -> usize {
            self.submissions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VerificationGateway for RecordingService {
        async fn load_or_create(
            &self,
            _user_id: &str,
            _token: &str,
        ) -> Result<GatewayResponse<RemoteVerification>, GatewayError> {
            let status = *self
                .status
                .lock()
                .expect("status lock")
                .get_or_insert(VerificationStatus::NotStarted);
            Ok(GatewayResponse::ok(
                "loaded",
                Some(RemoteVerification {
                    id: VerificationId("ver-77".to_string()),
                    status,
                    personal_info: None,
                    professional_background: None,
                    teaching_information: None,
                    documents: None,
                    consents: None,
                }),
            ))
        }

        async fn save_draft(
            &self,
            _verification_id: &VerificationId,
            draft: &DraftPayload,
            _token: &str,
        ) -> Result<GatewayResponse<()>, GatewayError> {
            self.drafts.lock().expect("drafts lock").push(draft.clone());
            Ok(GatewayResponse::ok("saved", None))
        }

        async fn submit(
            &self,
            _verification_id: &VerificationId,
            _consents: &Consents,
            _token: &str,
        ) -> Result<GatewayResponse<()>, GatewayError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            *self.status.lock().expect("status lock") = Some(VerificationStatus::Submitted);
            Ok(GatewayResponse::ok("submitted", None))
        }
    }

    #[derive(Default)]
    pub(super) struct CountingUploads {
        count: AtomicUsize,
    }

    #[async_trait]
    impl UploadGateway for CountingUploads {
        async fn upload_file(
            &self,
            file: &FileUpload,
            _category: ContentCategory,
            metadata: &UploadMetadata,
            _token: &str,
        ) -> Result<UploadedFile, UploadError> {
            let index = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(UploadedFile {
                id: format!("upload-{index}"),
                name: file.name.clone(),
                size: file.size(),
                content_type: file.mime_type.clone(),
                url: format!(
                    "https://cdn.example.test/{}/{}/{}",
                    metadata.user_id,
                    metadata.slot.field_name(),
                    file.name
                ),
                uploaded_at: Utc::now(),
            })
        }
    }

    pub(super) struct Wizard {
        pub store: VerificationStore,
        pub service: Arc<RecordingService>,
        pub storage: Arc<MemoryStorage>,
    }

    pub(super) fn wizard() -> Wizard {
        wizard_on(Arc::new(MemoryStorage::new()))
    }

    pub(super) fn wizard_on(storage: Arc<MemoryStorage>) -> Wizard {
        let service = Arc::new(RecordingService::default());
        let store = VerificationStore::new(
            Collaborators {
                remote: service.clone(),
                uploads: Arc::new(CountingUploads::default()),
                notifier: Arc::new(TracingNotifier),
                storage: storage.clone() as Arc<dyn LocalStorage>,
            },
            EngineConfig::default(),
        );
        Wizard {
            store,
            service,
            storage,
        }
    }

    pub(super) fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", USER)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    pub(super) async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }
}

mod http_flow {
    use axum::http::{Method, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::json;
    use tower::ServiceExt;

    use instructor_intake::workflows::verification::{verification_router, VerificationStatus};

    use super::common::{json_body, request, wizard};

    #[tokio::test]
    async fn applicant_completes_and_submits_the_wizard() {
        let wizard = wizard();
        let app = verification_router(wizard.store.clone());

        let steps = vec![
            (Method::POST, "/api/v1/verification/load", None, StatusCode::OK),
            (
                Method::PATCH,
                "/api/v1/verification/personal-info",
                Some(json!({
                    "firstName": "Maya",
                    "lastName": "Angelou",
                    "email": "maya@example.test",
                    "phoneNumber": "+1 555 0100",
                    "dateOfBirth": "1928-04-04",
                    "nationality": "American",
                    "streetAddress": "1 Caged Bird Lane",
                    "city": "St. Louis",
                    "country": "United States"
                })),
                StatusCode::OK,
            ),
            (Method::POST, "/api/v1/verification/navigation/next", None, StatusCode::OK),
            (
                Method::POST,
                "/api/v1/verification/entries/education",
                Some(json!({
                    "institution": "Wake Forest University",
                    "degree": "MA",
                    "fieldOfStudy": "American Studies",
                    "startDate": "1981-09"
                })),
                StatusCode::CREATED,
            ),
            (
                Method::POST,
                "/api/v1/verification/entries/experience",
                Some(json!({
                    "company": "Wake Forest University",
                    "position": "Professor",
                    "startDate": "1982-01",
                    "isCurrent": true
                })),
                StatusCode::CREATED,
            ),
            (
                Method::POST,
                "/api/v1/verification/entries/references",
                Some(json!({
                    "name": "James",
                    "email": "james@example.test",
                    "relationship": "Colleague",
                    "yearsKnown": 10
                })),
                StatusCode::CREATED,
            ),
            (
                Method::POST,
                "/api/v1/verification/entries/references",
                Some(json!({
                    "name": "Toni",
                    "email": "toni@example.test",
                    "relationship": "Peer",
                    "yearsKnown": 8
                })),
                StatusCode::CREATED,
            ),
            (Method::POST, "/api/v1/verification/navigation/next", None, StatusCode::OK),
            (
                Method::POST,
                "/api/v1/verification/entries/subjects",
                Some(json!({ "subject": "Poetry", "category": "Literature", "level": "expert" })),
                StatusCode::CREATED,
            ),
            (
                Method::PATCH,
                "/api/v1/verification/teaching-information",
                Some(json!({
                    "teachingMotivation": "p".repeat(150),
                    "teachingPhilosophy": "Words are things",
                    "targetAudience": ["Undergraduates"]
                })),
                StatusCode::OK,
            ),
            (Method::POST, "/api/v1/verification/navigation/next", None, StatusCode::OK),
        ];

        for (method, uri, body, expected) in steps {
            let response = app
                .clone()
                .oneshot(request(method.clone(), uri, body))
                .await
                .expect("response");
            assert_eq!(response.status(), expected, "{method} {uri}");
        }

        for (slot, name, mime_type) in [
            ("identity-document", "passport.pdf", "application/pdf"),
            ("profile-photo", "portrait.jpg", "image/jpeg"),
            ("resume", "cv.pdf", "application/pdf"),
        ] {
            let response = app
                .clone()
                .oneshot(request(
                    Method::POST,
                    &format!("/api/v1/verification/documents/{slot}"),
                    Some(json!({
                        "name": name,
                        "mimeType": mime_type,
                        "content": STANDARD.encode(name.as_bytes()),
                    })),
                ))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::CREATED, "upload {slot}");
        }

        let advanced = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/verification/navigation/next", None))
            .await
            .expect("response");
        assert_eq!(advanced.status(), StatusCode::OK);
        assert_eq!(json_body(advanced).await["step"], json!("review"));

        let premature = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/verification/submit", None))
            .await
            .expect("response");
        assert_eq!(premature.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let consents = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                "/api/v1/verification/consents",
                Some(json!({
                    "termOfService": true,
                    "privacyPolicy": true,
                    "backgroundCheck": true
                })),
            ))
            .await
            .expect("response");
        assert_eq!(consents.status(), StatusCode::OK);

        let submitted = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/verification/submit", None))
            .await
            .expect("response");
        assert_eq!(submitted.status(), StatusCode::ACCEPTED);
        let body = json_body(submitted).await;
        assert_eq!(body["verificationId"], json!("ver-77"));
        assert_eq!(body["status"], json!("SUBMITTED"));

        assert_eq!(wizard.service.submissions(), 1);
        let drafts = wizard.service.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].personal_info.first_name, "Maya");
        assert!(drafts[0]
            .documents
            .profile_photo
            .as_ref()
            .is_some_and(|photo| photo.url.contains("/profilePhoto/")));
        assert_eq!(wizard.store.snapshot().status, VerificationStatus::Submitted);

        let locked = app
            .oneshot(request(
                Method::PATCH,
                "/api/v1/verification/personal-info",
                Some(json!({ "city": "Winston-Salem" })),
            ))
            .await
            .expect("response");
        assert_eq!(locked.status(), StatusCode::CONFLICT);
        assert!(wizard
            .storage
            .raw("instructor-application-storage")
            .is_some_and(|raw| raw.contains("\"SUBMITTED\"")));
    }
}

mod background_sync {
    use std::time::Duration;

    use instructor_intake::workflows::verification::patch::PersonalInfoPatch;
    use instructor_intake::workflows::verification::{AutoSaver, PersonalInfo, Session, StepId};

    use super::common::{wizard, wizard_on, TOKEN, USER};

    #[tokio::test(start_paused = true)]
    async fn auto_saver_pushes_dirty_drafts_on_its_interval() {
        let wizard = wizard();
        wizard
            .store
            .load_application(&Session::new(USER, TOKEN))
            .await
            .expect("load");
        let saver = AutoSaver::spawn(wizard.store.clone(), Duration::from_secs(30));

        wizard
            .store
            .update_personal_info(PersonalInfoPatch {
                first_name: Some("Maya".to_string()),
                ..PersonalInfoPatch::default()
            })
            .expect("edit");

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(wizard.service.drafts().len(), 1);
        assert!(!wizard.store.snapshot().ui.has_unsaved_changes);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(wizard.service.drafts().len(), 1, "clean drafts are not re-sent");

        assert!(saver.is_running());
        saver.stop();
    }

    #[test]
    fn stores_resume_where_the_applicant_left_off() {
        let first = wizard();
        first
            .store
            .update_personal_info(PersonalInfoPatch {
                first_name: Some("Maya".to_string()),
                ..PersonalInfoPatch::default()
            })
            .expect("edit");
        first.store.go_to_step(StepId::TeachingInformation);

        let resumed = wizard_on(first.storage.clone()).store;

        let state = resumed.snapshot();
        assert_eq!(
            state.document.personal_info,
            PersonalInfo {
                first_name: "Maya".to_string(),
                ..PersonalInfo::default()
            }
        );
        assert_eq!(resumed.current_step(), StepId::TeachingInformation);
    }
}

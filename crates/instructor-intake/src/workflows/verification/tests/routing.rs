use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::config::EngineConfig;
use crate::workflows::verification::persistence::MemoryStorage;
use crate::workflows::verification::router::{
    add_entry_handler, load_handler, save_handler, session_from_headers, submit_handler,
    upload_handler, verification_router, view_handler, UploadRequest, USER_ID_HEADER,
};

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn signed_in_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-42"));
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer token-abc"),
    );
    headers
}

#[test]
fn sessions_come_from_user_and_bearer_headers() {
    assert_eq!(session_from_headers(&signed_in_headers()), session());

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert!(session_from_headers(&basic).credentials().is_none());
}

#[tokio::test]
async fn view_reports_derived_values() {
    let h = harness();

    let response = view_handler(State(h.store.clone())).await;

    assert_status(&response, StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["currentStep"], json!(0));
    assert_eq!(body["canProceed"], json!(false));
    assert_eq!(body["isLocked"], json!(false));
    assert_eq!(body["steps"].as_array().map(Vec::len), Some(5));
    assert!(body["overallProgress"].is_number());
}

#[tokio::test]
async fn personal_info_patches_merge_over_http() {
    let h = harness();
    let app = verification_router(h.store.clone());

    let response = app
        .oneshot(json_request(
            Method::PATCH,
            "/api/v1/verification/personal-info",
            json!({ "firstName": "Ada", "city": "London" }),
        ))
        .await
        .expect("response");

    assert_status(&response, StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["document"]["personalInfo"]["firstName"], json!("Ada"));
    assert_eq!(body["ui"]["hasUnsavedChanges"], json!(true));
}

#[tokio::test]
async fn entries_are_created_with_fresh_ids() {
    let h = harness();

    let response = add_entry_handler(
        State(h.store.clone()),
        Path("references".to_string()),
        Json(json!({ "name": "Grace", "email": "grace@example.test" })),
    )
    .await;

    assert_status(&response, StatusCode::CREATED);
    let body = read_json_body(response).await;
    let id = body["id"].as_str().expect("id").to_string();
    let references = h.store.snapshot().document.professional_background.references;
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].id.0, id);
}

#[tokio::test]
async fn unknown_collections_are_bad_requests() {
    let h = harness();

    let response = add_entry_handler(
        State(h.store.clone()),
        Path("hobbies".to_string()),
        Json(json!({})),
    )
    .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("unknown collection 'hobbies'"));
}

#[tokio::test]
async fn removing_unknown_entries_is_not_found() {
    let h = harness();
    let app = verification_router(h.store.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/v1/verification/entries/education/missing")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_without_credentials_is_unauthorized() {
    let h = harness();

    let response = save_handler(State(h.store.clone()), HeaderMap::new()).await;

    assert_status(&response, StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("please sign in again to continue"));
}

#[tokio::test]
async fn load_then_save_round_trips_through_the_gateway() {
    let h = harness();

    let loaded = load_handler(State(h.store.clone()), signed_in_headers()).await;
    assert_status(&loaded, StatusCode::OK);
    assert_eq!(read_json_body(loaded).await["outcome"], json!("hydrated"));

    let saved = save_handler(State(h.store.clone()), signed_in_headers()).await;
    assert_status(&saved, StatusCode::OK);
    let body = read_json_body(saved).await;
    assert_eq!(body["outcome"], json!("saved"));
    assert_eq!(body["verificationId"], json!(VERIFICATION_ID));
    assert_eq!(h.remote.drafts().len(), 1);
}

#[tokio::test]
async fn incomplete_submissions_are_unprocessable() {
    let h = harness();

    let response = submit_handler(State(h.store.clone()), signed_in_headers()).await;

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(!body["details"].as_array().expect("details").is_empty());
}

#[tokio::test]
async fn uploads_accept_base64_content() {
    let h = harness();

    let response = upload_handler(
        State(h.store.clone()),
        Path("profile-photo".to_string()),
        signed_in_headers(),
        Json(UploadRequest {
            name: "me.png".to_string(),
            mime_type: "image/png".to_string(),
            content: STANDARD.encode([7u8; 12]),
        }),
    )
    .await;

    assert_status(&response, StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["size"], json!(12));
    assert!(body["dataUrl"]
        .as_str()
        .expect("inline preview")
        .starts_with("data:image/png;base64,"));
    assert!(h.store.snapshot().document.documents.profile_photo.is_some());
}

#[tokio::test]
async fn malformed_upload_content_is_rejected() {
    let h = harness();

    let response = upload_handler(
        State(h.store.clone()),
        Path("resume".to_string()),
        signed_in_headers(),
        Json(UploadRequest {
            name: "cv.pdf".to_string(),
            mime_type: String::new(),
            content: "***".to_string(),
        }),
    )
    .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(h.uploads.calls().is_empty());
}

#[tokio::test]
async fn navigation_is_gated_over_http() {
    let h = harness();
    let app = verification_router(h.store.clone());

    let blocked = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/verification/navigation/next",
            json!({}),
        ))
        .await
        .expect("response");
    assert_status(&blocked, StatusCode::UNPROCESSABLE_ENTITY);

    let jumped = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/verification/navigation/goto/documents",
            json!({}),
        ))
        .await
        .expect("response");
    assert_status(&jumped, StatusCode::OK);
    let body = read_json_body(jumped).await;
    assert_eq!(body["currentStep"], json!(3));
    assert_eq!(body["step"], json!("documents"));
}

fn signed_in_upload(slot: &str, name: &str, mime_type: &str, bytes: &[u8]) -> Request<Body> {
    let body = json!({
        "name": name,
        "mimeType": mime_type,
        "content": STANDARD.encode(bytes),
    });
    let mut request = json_request(
        Method::POST,
        &format!("/api/v1/verification/documents/{slot}"),
        body,
    );
    request.headers_mut().extend(signed_in_headers());
    request
}

#[tokio::test]
async fn large_video_uploads_clear_the_body_limit() {
    let h = harness();
    let app = verification_router(h.store.clone());
    let video = vec![0x42u8; 2 * 1024 * 1024 + 512];

    let response = app
        .oneshot(signed_in_upload(
            "videoIntroduction",
            "hello.mp4",
            "video/mp4",
            &video,
        ))
        .await
        .expect("response");

    assert_status(&response, StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["size"], json!(video.len()));
    assert!(body.get("dataUrl").map_or(true, Value::is_null));
    let stored = h.store.snapshot().document.documents.video_introduction;
    assert_eq!(stored.map(|upload| upload.size), Some(video.len() as u64));
}

#[tokio::test]
async fn uploads_beyond_the_configured_limit_are_refused() {
    let config = EngineConfig {
        upload_limit_bytes: 64 * 1024,
        ..engine_config()
    };
    let h = harness_with(
        FakeVerificationService::default(),
        Arc::new(MemoryStorage::new()),
        config,
    );
    let app = verification_router(h.store.clone());

    let response = app
        .oneshot(signed_in_upload(
            "resume",
            "cv.pdf",
            "application/pdf",
            &vec![1u8; 128 * 1024],
        ))
        .await
        .expect("response");

    assert_status(&response, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.uploads.calls().is_empty());
}

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{DayAvailability, DocumentSlot, EntryId, Weekday};
use super::gateway::{FileUpload, GatewayError, Session, UploadError};
use super::patch::{
    ConsentsPatch, EducationPatch, EmergencyContactPatch, ExperiencePatch, PersonalInfoPatch,
    ProfessionalProfilePatch, ReferencePatch, SubjectPatch, TeachingExperiencePatch,
    TeachingInformationPatch,
};
use super::steps::StepId;
use super::store::{StoreError, VerificationStore};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Router builder exposing the application engine over HTTP.
pub fn verification_router(store: VerificationStore) -> Router {
    let upload_limit = store.config().upload_limit_bytes;
    Router::new()
        .route("/api/v1/verification", get(view_handler))
        .route("/api/v1/verification/load", post(load_handler))
        .route("/api/v1/verification/personal-info", patch(personal_info_handler))
        .route(
            "/api/v1/verification/emergency-contact",
            patch(emergency_contact_handler),
        )
        .route(
            "/api/v1/verification/professional-profile",
            patch(professional_profile_handler),
        )
        .route(
            "/api/v1/verification/teaching-information",
            patch(teaching_information_handler),
        )
        .route("/api/v1/verification/availability/:day", put(availability_handler))
        .route("/api/v1/verification/consents", patch(consents_handler))
        .route(
            "/api/v1/verification/entries/:collection",
            post(add_entry_handler),
        )
        .route(
            "/api/v1/verification/entries/:collection/:id",
            patch(update_entry_handler).delete(remove_entry_handler),
        )
        .route(
            "/api/v1/verification/documents/:slot",
            post(upload_handler)
                .delete(remove_document_handler)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/verification/auto-save", put(auto_save_handler))
        .route("/api/v1/verification/errors/:field", delete(clear_errors_handler))
        .route(
            "/api/v1/verification/notifications/:id",
            delete(dismiss_notification_handler),
        )
        .route("/api/v1/verification/save", post(save_handler))
        .route("/api/v1/verification/submit", post(submit_handler))
        .route("/api/v1/verification/navigation/next", post(next_step_handler))
        .route(
            "/api/v1/verification/navigation/previous",
            post(previous_step_handler),
        )
        .route(
            "/api/v1/verification/navigation/goto/:step",
            post(go_to_step_handler),
        )
        .with_state(store)
}

/// Caller identity from `x-user-id` and `authorization: Bearer <token>`.
pub fn session_from_headers(headers: &HeaderMap) -> Session {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    Session { user_id, token }
}

fn error_response(error: StoreError) -> Response {
    let status = match &error {
        StoreError::Unauthenticated | StoreError::Gateway(GatewayError::Unauthorized) => {
            StatusCode::UNAUTHORIZED
        }
        StoreError::Locked(_) | StoreError::SubmissionInFlight => StatusCode::CONFLICT,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Validation { .. }
        | StoreError::StepIncomplete { .. }
        | StoreError::Gateway(GatewayError::Rejected { .. })
        | StoreError::Upload(UploadError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Gateway(GatewayError::Transport(_))
        | StoreError::Upload(UploadError::Transport(_)) => StatusCode::BAD_GATEWAY,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
        "details": error.messages(),
    });
    (status, Json(payload)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn view_response(store: &VerificationStore) -> Response {
    (StatusCode::OK, Json(store.view())).into_response()
}

fn edited(store: &VerificationStore, outcome: Result<(), StoreError>) -> Response {
    match outcome {
        Ok(()) => view_response(store),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler(State(store): State<VerificationStore>) -> Response {
    view_response(&store)
}

pub(crate) async fn load_handler(
    State(store): State<VerificationStore>,
    headers: HeaderMap,
) -> Response {
    match store.load_application(&session_from_headers(&headers)).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn personal_info_handler(
    State(store): State<VerificationStore>,
    Json(patch): Json<PersonalInfoPatch>,
) -> Response {
    let outcome = store.update_personal_info(patch);
    edited(&store, outcome)
}

async fn emergency_contact_handler(
    State(store): State<VerificationStore>,
    Json(patch): Json<EmergencyContactPatch>,
) -> Response {
    let outcome = store.update_emergency_contact(patch);
    edited(&store, outcome)
}

async fn professional_profile_handler(
    State(store): State<VerificationStore>,
    Json(patch): Json<ProfessionalProfilePatch>,
) -> Response {
    let outcome = store.update_professional_profile(patch);
    edited(&store, outcome)
}

async fn teaching_information_handler(
    State(store): State<VerificationStore>,
    Json(patch): Json<TeachingInformationPatch>,
) -> Response {
    let outcome = store.update_teaching_information(patch);
    edited(&store, outcome)
}

async fn availability_handler(
    State(store): State<VerificationStore>,
    Path(day): Path<String>,
    Json(availability): Json<DayAvailability>,
) -> Response {
    let Some(day) = Weekday::parse(&day) else {
        return bad_request(format!("unknown weekday '{day}'"));
    };
    let outcome = store.set_availability(day, availability);
    edited(&store, outcome)
}

async fn consents_handler(
    State(store): State<VerificationStore>,
    Json(patch): Json<ConsentsPatch>,
) -> Response {
    let outcome = store.update_consents(patch);
    edited(&store, outcome)
}

/// Id-addressed collections reachable over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Education,
    Experience,
    References,
    Subjects,
    TeachingExperience,
}

impl Collection {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "education" => Some(Self::Education),
            "experience" => Some(Self::Experience),
            "references" => Some(Self::References),
            "subjects" | "subjects-to-teach" => Some(Self::Subjects),
            "teaching-experience" => Some(Self::TeachingExperience),
            _ => None,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, Response> {
    serde_json::from_value(body).map_err(|err| bad_request(format!("invalid payload: {err}")))
}

pub(crate) async fn add_entry_handler(
    State(store): State<VerificationStore>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(kind) = Collection::parse(&collection) else {
        return bad_request(format!("unknown collection '{collection}'"));
    };

    let added = match kind {
        Collection::Education => decode::<EducationPatch>(body).map(|p| store.add_education(p)),
        Collection::Experience => decode::<ExperiencePatch>(body).map(|p| store.add_experience(p)),
        Collection::References => decode::<ReferencePatch>(body).map(|p| store.add_reference(p)),
        Collection::Subjects => decode::<SubjectPatch>(body).map(|p| store.add_subject(p)),
        Collection::TeachingExperience => {
            decode::<TeachingExperiencePatch>(body).map(|p| store.add_teaching_experience(p))
        }
    };

    match added {
        Ok(Ok(id)) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(rejection) => rejection,
    }
}

async fn update_entry_handler(
    State(store): State<VerificationStore>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let Some(kind) = Collection::parse(&collection) else {
        return bad_request(format!("unknown collection '{collection}'"));
    };
    let id = EntryId(id);

    let updated = match kind {
        Collection::Education => {
            decode::<EducationPatch>(body).map(|p| store.update_education(&id, p))
        }
        Collection::Experience => {
            decode::<ExperiencePatch>(body).map(|p| store.update_experience(&id, p))
        }
        Collection::References => {
            decode::<ReferencePatch>(body).map(|p| store.update_reference(&id, p))
        }
        Collection::Subjects => decode::<SubjectPatch>(body).map(|p| store.update_subject(&id, p)),
        Collection::TeachingExperience => decode::<TeachingExperiencePatch>(body)
            .map(|p| store.update_teaching_experience(&id, p)),
    };

    match updated {
        Ok(outcome) => edited(&store, outcome),
        Err(rejection) => rejection,
    }
}

async fn remove_entry_handler(
    State(store): State<VerificationStore>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let Some(kind) = Collection::parse(&collection) else {
        return bad_request(format!("unknown collection '{collection}'"));
    };
    let id = EntryId(id);

    let outcome = match kind {
        Collection::Education => store.remove_education(&id),
        Collection::Experience => store.remove_experience(&id),
        Collection::References => store.remove_reference(&id),
        Collection::Subjects => store.remove_subject(&id),
        Collection::TeachingExperience => store.remove_teaching_experience(&id),
    };
    edited(&store, outcome)
}

/// JSON upload body; `content` is base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub content: String,
}

pub(crate) async fn upload_handler(
    State(store): State<VerificationStore>,
    Path(slot): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Response {
    let Some(slot) = DocumentSlot::parse(&slot) else {
        return bad_request(format!("unknown document slot '{slot}'"));
    };
    let bytes = match STANDARD.decode(request.content.trim()) {
        Ok(bytes) => bytes,
        Err(err) => return bad_request(format!("content is not valid base64: {err}")),
    };
    let mime_type = if request.mime_type.trim().is_empty() {
        mime::APPLICATION_OCTET_STREAM.to_string()
    } else {
        request.mime_type
    };

    let file = FileUpload::new(request.name, mime_type, bytes);
    match store
        .upload_document(slot, file, &session_from_headers(&headers))
        .await
    {
        Ok(upload) => (StatusCode::CREATED, Json(upload)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RemoveDocumentQuery {
    id: Option<String>,
}

async fn remove_document_handler(
    State(store): State<VerificationStore>,
    Path(slot): Path<String>,
    Query(query): Query<RemoveDocumentQuery>,
) -> Response {
    let Some(slot) = DocumentSlot::parse(&slot) else {
        return bad_request(format!("unknown document slot '{slot}'"));
    };
    let id = query.id.map(EntryId);
    let outcome = store.remove_document(slot, id.as_ref());
    edited(&store, outcome)
}

#[derive(Debug, Deserialize)]
struct AutoSaveToggle {
    enabled: bool,
}

async fn auto_save_handler(
    State(store): State<VerificationStore>,
    Json(toggle): Json<AutoSaveToggle>,
) -> Response {
    store.set_auto_save_enabled(toggle.enabled);
    view_response(&store)
}

async fn clear_errors_handler(
    State(store): State<VerificationStore>,
    Path(field): Path<String>,
) -> Response {
    store.clear_field_errors(&field);
    view_response(&store)
}

async fn dismiss_notification_handler(
    State(store): State<VerificationStore>,
    Path(id): Path<String>,
) -> Response {
    if store.dismiss_notification(&id) {
        view_response(&store)
    } else {
        let payload = json!({ "error": format!("no notification with id {id}") });
        (StatusCode::NOT_FOUND, Json(payload)).into_response()
    }
}

pub(crate) async fn save_handler(
    State(store): State<VerificationStore>,
    headers: HeaderMap,
) -> Response {
    match store
        .save_application(&session_from_headers(&headers))
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler(
    State(store): State<VerificationStore>,
    headers: HeaderMap,
) -> Response {
    match store
        .submit_application(&session_from_headers(&headers))
        .await
    {
        Ok(outcome) => (StatusCode::ACCEPTED, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

fn step_response(store: &VerificationStore, step: StepId) -> Response {
    let payload = json!({
        "currentStep": step.index(),
        "step": step,
        "canProceed": store.can_proceed(),
        "overallProgress": store.overall_progress(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

async fn next_step_handler(State(store): State<VerificationStore>) -> Response {
    match store.next_step() {
        Ok(step) => step_response(&store, step),
        Err(error) => error_response(error),
    }
}

async fn previous_step_handler(State(store): State<VerificationStore>) -> Response {
    let step = store.previous_step();
    step_response(&store, step)
}

async fn go_to_step_handler(
    State(store): State<VerificationStore>,
    Path(step): Path<String>,
) -> Response {
    let target = step
        .parse::<usize>()
        .ok()
        .and_then(StepId::from_index)
        .or_else(|| serde_json::from_value::<StepId>(Value::String(step.clone())).ok());
    let Some(target) = target else {
        return bad_request(format!("unknown step '{step}'"));
    };
    let step = store.go_to_step(target);
    step_response(&store, step)
}

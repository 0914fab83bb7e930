use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::audit::{AuditQuery, UploadOutcome, DEFAULT_AUDIT_LIMIT};
use super::domain::{
    Actor, DepartmentId, Role, StructuredForm, SubmissionId, SubmissionStatus, UserId,
};
use super::intake::{FileUpload, IntakeError, IntakeLimits, UploadIntake};
use super::notify::Notifier;
use super::repository::{SubmissionRecord, SubmissionRepository};
use super::service::{ClearanceWorkflowService, SubmissionDraft, WorkflowError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_DEPARTMENT_HEADER: &str = "x-actor-department";

/// Room for the structured form and JSON framing around the encoded files.
const BODY_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Shared state behind the clearance endpoints.
pub struct ClearanceApi<R, N> {
    pub workflow: Arc<ClearanceWorkflowService<R, N>>,
    pub intake: Arc<UploadIntake>,
}

impl<R, N> Clone for ClearanceApi<R, N> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            intake: self.intake.clone(),
        }
    }
}

/// File carried inline in a JSON body.
#[derive(Debug, Clone, Deserialize)]
pub struct EncodedFile {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl EncodedFile {
    fn decode(&self) -> Result<FileUpload, IntakeError> {
        FileUpload::from_base64(&self.file_name, &self.content_type, &self.data_base64)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Upload {
        photo: EncodedFile,
        scanned_form: EncodedFile,
    },
    Structured {
        photo: EncodedFile,
        form: StructuredForm,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionPayload {
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficerPayload {
    pub officer_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// `status` is `accepted`, `rejected`, or `all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub student_id: Option<String>,
}

/// Largest JSON body a submission can need: both files base64-encoded at the
/// configured limits, plus overhead.
pub fn request_body_limit(limits: IntakeLimits) -> usize {
    let encoded = |bytes: u64| bytes.div_ceil(3).saturating_mul(4);
    let total = encoded(limits.photo_max_bytes)
        .saturating_add(encoded(limits.form_max_bytes))
        .saturating_add(BODY_OVERHEAD_BYTES);
    usize::try_from(total).unwrap_or(usize::MAX)
}

/// Router builder exposing the clearance workflow over HTTP.
pub fn clearance_router<R, N>(api: ClearanceApi<R, N>) -> Router
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let body_limit = request_body_limit(api.intake.limits());
    Router::new()
        .route(
            "/api/v1/clearance/submissions",
            post(submit_handler::<R, N>).get(list_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/mine",
            get(my_submission_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id",
            get(submission_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/resubmit",
            post(resubmit_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/department-approval",
            post(department_approval_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/department-rejection",
            post(department_rejection_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/final-approval",
            post(final_approval_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/final-rejection",
            post(final_rejection_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/submissions/:submission_id/certificate",
            post(regenerate_certificate_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/queues/department",
            get(department_queue_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/queues/final",
            get(final_queue_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/certificates/missing",
            get(awaiting_certificate_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/certificates/:student_id",
            get(certificate_handler::<R, N>),
        )
        .route("/api/v1/clearance/stats", get(stats_handler::<R, N>))
        .route("/api/v1/clearance/officer", post(assign_officer_handler::<R, N>))
        .route("/api/v1/clearance/audits", get(upload_audits_handler::<R, N>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(api)
}

pub(crate) async fn submit_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SubmissionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    if let Err(error) = api.workflow.ensure_can_submit(&actor) {
        return workflow_error_response(error);
    }
    let draft = match build_draft(&api.intake, &actor, payload) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    match api.workflow.submit(&actor, draft) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn resubmit_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(payload): axum::Json<SubmissionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let submission_id = SubmissionId(submission_id);
    if let Err(error) = api.workflow.ensure_can_resubmit(&actor, &submission_id) {
        return workflow_error_response(error);
    }
    let draft = match build_draft(&api.intake, &actor, payload) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    record_response(api.workflow.resubmit(&actor, &submission_id, draft))
}

pub(crate) async fn department_approval_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    record_response(api.workflow.department_approve(
        &actor,
        &SubmissionId(submission_id),
        payload.remarks,
    ))
}

pub(crate) async fn department_rejection_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    record_response(api.workflow.department_reject(
        &actor,
        &SubmissionId(submission_id),
        payload.remarks.as_deref().unwrap_or_default(),
    ))
}

pub(crate) async fn final_approval_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    record_response(api.workflow.final_approve(
        &actor,
        &SubmissionId(submission_id),
        payload.remarks,
    ))
}

pub(crate) async fn final_rejection_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    record_response(api.workflow.final_reject(
        &actor,
        &SubmissionId(submission_id),
        payload.remarks.as_deref().unwrap_or_default(),
    ))
}

pub(crate) async fn regenerate_certificate_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api
        .workflow
        .regenerate_certificate(&actor, &SubmissionId(submission_id))
    {
        Ok(certificate) => (StatusCode::OK, axum::Json(certificate)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn submission_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    record_response(
        api.workflow
            .submission(&actor, &SubmissionId(submission_id)),
    )
}

pub(crate) async fn my_submission_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.workflow.my_submission(&actor) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(None) => workflow_error_response(WorkflowError::NotFound(format!(
            "submission for student {}",
            actor.id
        ))),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let status = match query.status.as_deref().map(parse_status).transpose() {
        Ok(status) => status,
        Err(response) => return response,
    };
    views_response(api.workflow.list(&actor, status))
}

pub(crate) async fn department_queue_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    views_response(api.workflow.department_queue(&actor))
}

pub(crate) async fn final_queue_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    views_response(api.workflow.final_queue(&actor))
}

pub(crate) async fn awaiting_certificate_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    views_response(api.workflow.awaiting_certificate(&actor))
}

pub(crate) async fn certificate_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.workflow.certificate(&actor, &UserId(student_id)) {
        Ok(certificate) => (StatusCode::OK, axum::Json(certificate)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn stats_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api.workflow.stats(&actor) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn assign_officer_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<OfficerPayload>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match api
        .workflow
        .assign_officer(&actor, UserId(payload.officer_id))
    {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn upload_audits_handler<R, N>(
    State(api): State<ClearanceApi<R, N>>,
    headers: HeaderMap,
    Query(query): Query<AuditListQuery>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match resolve_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let query = match audit_query(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    match api.intake.upload_audits(&actor, &query) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

/// Build the caller from identity headers; anything unresolvable is a 401.
pub(crate) fn resolve_actor(headers: &HeaderMap) -> Result<Actor, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let Some(id) = header(ACTOR_ID_HEADER) else {
        return Err(unauthenticated("missing x-actor-id header"));
    };
    let Some(role) = header(ACTOR_ROLE_HEADER).and_then(Role::parse) else {
        return Err(unauthenticated("missing or unknown x-actor-role header"));
    };

    Ok(Actor {
        id: UserId(id.to_string()),
        role,
        department: header(ACTOR_DEPARTMENT_HEADER)
            .map(|department| DepartmentId(department.to_string())),
    })
}

fn build_draft(
    intake: &UploadIntake,
    actor: &Actor,
    payload: SubmissionPayload,
) -> Result<SubmissionDraft, Response> {
    let draft = match payload {
        SubmissionPayload::Upload {
            photo,
            scanned_form,
        } => photo
            .decode()
            .and_then(|photo| intake.accept_photo(&actor.id, photo))
            .and_then(|photo| {
                let scanned_form = intake.accept_form(&actor.id, scanned_form.decode()?)?;
                Ok(SubmissionDraft::Upload {
                    photo,
                    scanned_form,
                })
            }),
        SubmissionPayload::Structured { photo, form } => photo
            .decode()
            .and_then(|photo| intake.accept_photo(&actor.id, photo))
            .map(|photo| SubmissionDraft::Structured { photo, form }),
    };
    draft.map_err(intake_error_response)
}

fn audit_query(query: AuditListQuery) -> Result<AuditQuery, Response> {
    let outcome = match query.status.as_deref().map(str::trim) {
        None | Some("all") => None,
        Some("accepted") => Some(UploadOutcome::Accepted),
        Some("rejected") => Some(UploadOutcome::Rejected),
        Some(other) => {
            return Err(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                format!("unknown audit status '{other}'"),
            ))
        }
    };
    let mut audit = AuditQuery::with_limit(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT))
        .map_err(|violation| workflow_error_response(violation.into()))?;
    if let Some(outcome) = outcome {
        audit = audit.with_outcome(outcome);
    }
    if let Some(student) = query.student_id.filter(|id| !id.trim().is_empty()) {
        audit = audit.for_student(UserId(student.trim().to_string()));
    }
    Ok(audit)
}

fn parse_status(raw: &str) -> Result<SubmissionStatus, Response> {
    SubmissionStatus::ordered()
        .into_iter()
        .find(|status| status.label() == raw.trim())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                format!("unknown status '{raw}'"),
            )
        })
}

fn record_response(result: Result<SubmissionRecord, WorkflowError>) -> Response {
    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

fn views_response(result: Result<Vec<SubmissionRecord>, WorkflowError>) -> Response {
    match result {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(SubmissionRecord::status_view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Authorization(_) => StatusCode::FORBIDDEN,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Repository(_)
        | WorkflowError::Directory(_)
        | WorkflowError::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
        WorkflowError::Certificate(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.kind(), error.to_string())
}

fn intake_error_response(error: IntakeError) -> Response {
    let (status, kind) = match &error {
        IntakeError::Validator(_) | IntakeError::Blob(_) | IntakeError::Audit(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
        IntakeError::Forbidden(_) => (StatusCode::FORBIDDEN, "authorization"),
        IntakeError::PhotoRejected { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "photo_rejected"),
        IntakeError::UnsupportedType { .. }
        | IntakeError::TooLarge { .. }
        | IntakeError::Empty { .. }
        | IntakeError::Encoding(_) => (StatusCode::UNPROCESSABLE_ENTITY, "intake"),
    };
    error_response(status, kind, error.to_string())
}

fn unauthenticated(message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, "unauthenticated", message.to_string())
}

fn error_response(status: StatusCode, kind: &str, message: String) -> Response {
    let payload = json!({
        "error": message,
        "kind": kind,
    });
    (status, axum::Json(payload)).into_response()
}

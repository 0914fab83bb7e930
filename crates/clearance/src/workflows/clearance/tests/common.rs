use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use base64::Engine as _;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::config::WorkflowConfig;
use crate::workflows::clearance::audit::{
    AuditError, AuditLog, AuditQuery, AuditSink, UploadAuditRecord,
};
use crate::workflows::clearance::certificate::{
    CertificateRenderer, CertificateRequest, RenderError,
};
use crate::workflows::clearance::directory::{
    DepartmentProfile, DirectoryError, StudentDirectory, StudentProfile,
};
use crate::workflows::clearance::domain::{
    Actor, ArtifactKind, ArtifactRef, DepartmentId, StructuredForm, SubmissionId, UserId,
};
use crate::workflows::clearance::intake::{
    AcceptedPhoto, BlobError, BlobStore, FileUpload, IntakeLimits, PhotoValidator, PhotoVerdict,
    UploadIntake, ValidatorError,
};
use crate::workflows::clearance::memory::MemorySubmissionStore;
use crate::workflows::clearance::notify::{Notification, Notifier, NotifyError};
use crate::workflows::clearance::officer::ActiveOfficerSlot;
use crate::workflows::clearance::repository::{
    RepositoryError, Revision, SubmissionFilter, SubmissionRecord, SubmissionRepository,
};
use crate::workflows::clearance::router::{clearance_router, ClearanceApi};
use crate::workflows::clearance::service::{
    ClearanceWorkflowService, SubmissionDraft, WorkflowCollaborators,
};

pub(super) const JPEG_BYTES: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
pub(super) const PDF_BYTES: [u8; 8] = *b"%PDF-1.7";

pub(super) type TestService = ClearanceWorkflowService<MemorySubmissionStore, RecordingNotifier>;

pub(super) fn student() -> Actor {
    Actor::student("s-1")
}

pub(super) fn classmate() -> Actor {
    Actor::student("s-2")
}

pub(super) fn hod() -> Actor {
    Actor::department_head("h-csc", "csc")
}

pub(super) fn other_hod() -> Actor {
    Actor::department_head("h-mth", "mth")
}

pub(super) fn officer() -> Actor {
    Actor::admissions_officer("ao-1")
}

pub(super) fn admin() -> Actor {
    Actor::administrator("admin-1")
}

pub(super) fn accepted_photo(student: &str) -> AcceptedPhoto {
    AcceptedPhoto::new(
        UserId(student.to_string()),
        ArtifactRef {
            kind: ArtifactKind::Photo,
            url: format!("memory://{student}/photo.jpg"),
        },
    )
}

pub(super) fn upload_draft(student: &str) -> SubmissionDraft {
    SubmissionDraft::Upload {
        photo: accepted_photo(student),
        scanned_form: ArtifactRef {
            kind: ArtifactKind::Form,
            url: format!("memory://{student}/form.pdf"),
        },
    }
}

pub(super) fn structured_form() -> StructuredForm {
    StructuredForm {
        name: "Ada Obi".to_string(),
        email: "ada@example.edu".to_string(),
        matric_number: "CSC/2019/001".to_string(),
        phone: Some("08030000000".to_string()),
        sex: Some("female".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2000, 2, 14),
        marital_status: Some("single".to_string()),
        state_of_origin: Some("Ekiti".to_string()),
        lga: Some("Ado".to_string()),
        graduation_date: NaiveDate::from_ymd_opt(2024, 7, 30),
        course_of_study: Some("Computer Science".to_string()),
    }
}

pub(super) fn structured_draft(student: &str) -> SubmissionDraft {
    SubmissionDraft::Structured {
        photo: accepted_photo(student),
        form: structured_form(),
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) store: Arc<MemorySubmissionStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) renderer: Arc<StubRenderer>,
    pub(super) intake: Arc<UploadIntake>,
    pub(super) validator: Arc<StubValidator>,
    pub(super) blobs: Arc<MemoryBlobs>,
    pub(super) audit: Arc<MemoryAudit>,
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        clearance_router(ClearanceApi {
            workflow: self.service.clone(),
            intake: self.intake.clone(),
        })
    }

    pub(super) fn stored(&self, id: &SubmissionId) -> SubmissionRecord {
        self.store
            .fetch(id)
            .expect("store reachable")
            .expect("record present")
    }

    /// Submit for `s-1` and walk it up to department approval.
    pub(super) fn department_approved(&self) -> SubmissionRecord {
        let submitted = self
            .service
            .submit(&student(), upload_draft("s-1"))
            .expect("submit");
        self.service
            .department_approve(&hod(), &submitted.id, None)
            .expect("department approval")
    }
}

pub(super) fn harness() -> Harness {
    harness_with_limits(IntakeLimits::from(&WorkflowConfig::default()))
}

pub(super) fn harness_with_limits(limits: IntakeLimits) -> Harness {
    let store = Arc::new(MemorySubmissionStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let renderer = Arc::new(StubRenderer::default());
    let validator = Arc::new(StubValidator::accepting());
    let blobs = Arc::new(MemoryBlobs::default());
    let audit = Arc::new(MemoryAudit::default());

    let service = ClearanceWorkflowService::new(
        store.clone(),
        notifier.clone(),
        WorkflowCollaborators {
            renderer: renderer.clone(),
            directory: Arc::new(StaticDirectory::seeded()),
            officers: Arc::new(ActiveOfficerSlot::with_officer(UserId("ao-1".to_string()))),
        },
        &WorkflowConfig::default(),
    );
    let intake = UploadIntake::new(validator.clone(), blobs.clone(), audit.clone(), limits);

    Harness {
        service: Arc::new(service),
        store,
        notifier,
        renderer,
        intake: Arc::new(intake),
        validator,
        blobs,
        audit,
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp offline".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct StubRenderer {
    requests: Mutex<Vec<CertificateRequest>>,
    failing: AtomicBool,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl StubRenderer {
    /// Park the next render call. The first receiver fires once the call is
    /// inside the renderer; sending on the returned sender lets it finish.
    pub(super) fn hold_next(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().expect("renderer gate poisoned") = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    pub(super) fn requests(&self) -> Vec<CertificateRequest> {
        self.requests.lock().expect("renderer mutex poisoned").clone()
    }

    pub(super) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl CertificateRenderer for StubRenderer {
    fn render(&self, request: &CertificateRequest) -> Result<String, RenderError> {
        let gate = self.gate.lock().expect("renderer gate poisoned").take();
        if let Some((entered, release)) = gate {
            entered.send(()).expect("test waits for render");
            release.recv().expect("test releases render");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RenderError::Failed("pdf worker crashed".to_string()));
        }
        self.requests
            .lock()
            .expect("renderer mutex poisoned")
            .push(request.clone());
        Ok(format!("memory://certificates/{}.pdf", request.clearance_id))
    }
}

pub(super) struct StaticDirectory {
    students: HashMap<UserId, StudentProfile>,
    departments: HashMap<DepartmentId, DepartmentProfile>,
    staff: HashMap<UserId, String>,
}

impl StaticDirectory {
    pub(super) fn seeded() -> Self {
        let students = [("s-1", "Ada Obi", "csc"), ("s-2", "Bayo Ade", "csc"), ("s-3", "Chidi Eze", "mth")]
            .into_iter()
            .map(|(id, name, department)| {
                let profile = StudentProfile {
                    id: UserId(id.to_string()),
                    name: name.to_string(),
                    email: format!("{id}@example.edu"),
                    matric_number: format!("{}/2019/{id}", department.to_ascii_uppercase()),
                    department: DepartmentId(department.to_string()),
                    phone: None,
                    sex: None,
                    date_of_birth: None,
                    marital_status: None,
                    state_of_origin: None,
                    lga: None,
                    graduation_date: None,
                    course_of_study: None,
                };
                (profile.id.clone(), profile)
            })
            .collect();

        let departments = [("csc", "Computer Science"), ("mth", "Mathematics")]
            .into_iter()
            .map(|(id, name)| {
                (
                    DepartmentId(id.to_string()),
                    DepartmentProfile {
                        id: DepartmentId(id.to_string()),
                        name: name.to_string(),
                        faculty: Some("Science".to_string()),
                    },
                )
            })
            .collect();

        let staff = [("h-csc", "Dr. Kemi Ojo"), ("ao-1", "Mr. Tunde Bello")]
            .into_iter()
            .map(|(id, name)| (UserId(id.to_string()), name.to_string()))
            .collect();

        Self {
            students,
            departments,
            staff,
        }
    }
}

impl StudentDirectory for StaticDirectory {
    fn student(&self, id: &UserId) -> Result<Option<StudentProfile>, DirectoryError> {
        Ok(self.students.get(id).cloned())
    }

    fn department(&self, id: &DepartmentId) -> Result<Option<DepartmentProfile>, DirectoryError> {
        Ok(self.departments.get(id).cloned())
    }

    fn display_name(&self, id: &UserId) -> Result<Option<String>, DirectoryError> {
        Ok(self.staff.get(id).cloned())
    }
}

pub(super) struct StubValidator {
    accept: AtomicBool,
    calls: AtomicUsize,
}

impl StubValidator {
    pub(super) fn accepting() -> Self {
        Self {
            accept: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn reject_all(&self) {
        self.accept.store(false, Ordering::SeqCst);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PhotoValidator for StubValidator {
    fn validate(&self, bytes: &[u8], _content_type: &str) -> Result<PhotoVerdict, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept.load(Ordering::SeqCst) {
            Ok(PhotoVerdict {
                accepted: true,
                reasons: Vec::new(),
                details: json!({ "faces": 1, "bytes": bytes.len() }),
            })
        } else {
            Ok(PhotoVerdict {
                accepted: false,
                reasons: vec!["no face detected".to_string()],
                details: json!({ "faces": 0 }),
            })
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryBlobs {
    stored: Mutex<Vec<(UserId, ArtifactKind, String)>>,
}

impl MemoryBlobs {
    pub(super) fn stored(&self) -> Vec<(UserId, ArtifactKind, String)> {
        self.stored.lock().expect("blob mutex poisoned").clone()
    }
}

impl BlobStore for MemoryBlobs {
    fn store(
        &self,
        owner: &UserId,
        kind: ArtifactKind,
        upload: &FileUpload,
    ) -> Result<String, BlobError> {
        let url = format!("memory://{owner}/{}/{}", kind.label(), upload.file_name);
        self.stored
            .lock()
            .expect("blob mutex poisoned")
            .push((owner.clone(), kind, url.clone()));
        Ok(url)
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    records: Mutex<Vec<UploadAuditRecord>>,
    failing: AtomicBool,
}

impl MemoryAudit {
    pub(super) fn records(&self) -> Vec<UploadAuditRecord> {
        self.records.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: UploadAuditRecord) -> Result<(), AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("audit log offline".to_string()));
        }
        self.records
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }
}

impl AuditLog for MemoryAudit {
    fn recent(&self, query: &AuditQuery) -> Result<Vec<UploadAuditRecord>, AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("audit log offline".to_string()));
        }
        let records = self.records.lock().expect("audit mutex poisoned");
        Ok(query.select(records.iter()))
    }
}

pub(super) struct UnavailableStore;

impl SubmissionRepository for UnavailableStore {
    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_by_student(
        &self,
        _student: &UserId,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected: Revision,
        _record: SubmissionRecord,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &SubmissionFilter) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn unavailable_service() -> ClearanceWorkflowService<UnavailableStore, RecordingNotifier> {
    ClearanceWorkflowService::new(
        Arc::new(UnavailableStore),
        Arc::new(RecordingNotifier::default()),
        WorkflowCollaborators {
            renderer: Arc::new(StubRenderer::default()),
            directory: Arc::new(StaticDirectory::seeded()),
            officers: Arc::new(ActiveOfficerSlot::with_officer(UserId("ao-1".to_string()))),
        },
        &WorkflowConfig::default(),
    )
}

pub(super) fn jpeg_upload(file_name: &str) -> FileUpload {
    FileUpload {
        file_name: file_name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: JPEG_BYTES.to_vec(),
    }
}

pub(super) fn encoded(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub(super) fn upload_payload() -> Value {
    json!({
        "mode": "upload",
        "photo": {
            "file_name": "passport.jpg",
            "content_type": "image/jpeg",
            "data_base64": encoded(&JPEG_BYTES),
        },
        "scanned_form": {
            "file_name": "clearance.pdf",
            "content_type": "application/pdf",
            "data_base64": encoded(&PDF_BYTES),
        },
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

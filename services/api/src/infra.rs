use clearance::workflows::clearance::{
    ArtifactKind, AuditError, AuditLog, AuditQuery, AuditSink, BlobError, BlobStore,
    CertificateRenderer, CertificateRequest, DepartmentId, DepartmentProfile, DirectoryError,
    FileUpload, Notification, Notifier, NotifyError, PhotoValidator, PhotoVerdict, RenderError,
    StudentDirectory, StudentProfile, UploadAuditRecord, UserId, ValidatorError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Smallest byte count we will treat as a real photograph.
const MIN_PHOTO_BYTES: usize = 8;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fixed campus roster used by `serve` and `demo`.
pub(crate) struct SeededDirectory {
    students: HashMap<UserId, StudentProfile>,
    departments: HashMap<DepartmentId, DepartmentProfile>,
    staff: HashMap<UserId, String>,
}

impl SeededDirectory {
    pub(crate) fn campus() -> Self {
        let students = [
            ("stu-001", "Adaeze Okafor", "CSC/2019/1043", "csc", "2024-07-30"),
            ("stu-002", "Tunde Balogun", "CSC/2019/1108", "csc", "2024-07-30"),
            ("stu-003", "Zainab Musa", "MTH/2019/0311", "mth", "2024-11-15"),
        ]
        .into_iter()
        .map(|(id, name, matric, department, graduated)| {
            let profile = StudentProfile {
                id: UserId(id.to_string()),
                name: name.to_string(),
                email: format!("{id}@students.example.edu"),
                matric_number: matric.to_string(),
                department: DepartmentId(department.to_string()),
                phone: None,
                sex: None,
                date_of_birth: None,
                marital_status: None,
                state_of_origin: None,
                lga: None,
                graduation_date: Some(graduated.to_string()),
                course_of_study: None,
            };
            (profile.id.clone(), profile)
        })
        .collect();

        let departments = [
            ("csc", "Computer Science", "Science"),
            ("mth", "Mathematics", "Science"),
        ]
        .into_iter()
        .map(|(id, name, faculty)| {
            (
                DepartmentId(id.to_string()),
                DepartmentProfile {
                    id: DepartmentId(id.to_string()),
                    name: name.to_string(),
                    faculty: Some(faculty.to_string()),
                },
            )
        })
        .collect();

        let staff = [
            ("hod-csc", "Prof. Ngozi Eze"),
            ("hod-mth", "Dr. Ibrahim Sule"),
            ("ao-001", "Mrs. Folake Adeyemi"),
        ]
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

impl StudentDirectory for SeededDirectory {
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

/// Writes notifications to the log and keeps them for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl LoggingNotifier {
    pub(crate) fn outbox(&self) -> Vec<Notification> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Notifier for LoggingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient_email,
            template = notification.template.label(),
            submission = %notification.submission_id,
            "notification queued"
        );
        self.outbox
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryBlobStore {
    sequence: AtomicU64,
    blobs: Mutex<HashMap<String, usize>>,
}

impl BlobStore for InMemoryBlobStore {
    fn store(
        &self,
        owner: &UserId,
        kind: ArtifactKind,
        upload: &FileUpload,
    ) -> Result<String, BlobError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!(
            "memory://uploads/{owner}/{}/{id:04}-{}",
            kind.label(),
            upload.file_name
        );
        self.blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob index mutex poisoned".to_string()))?
            .insert(url.clone(), upload.bytes.len());
        Ok(url)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    records: Arc<Mutex<Vec<UploadAuditRecord>>>,
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, record: UploadAuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError::Unavailable("audit mutex poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

impl AuditLog for InMemoryAuditLog {
    fn recent(&self, query: &AuditQuery) -> Result<Vec<UploadAuditRecord>, AuditError> {
        let records = self
            .records
            .lock()
            .map_err(|_| AuditError::Unavailable("audit mutex poisoned".to_string()))?;
        Ok(query.select(records.iter()))
    }
}

/// Stand-in for the face-detection service: checks that the bytes really are
/// the image format the client declared.
pub(crate) struct SignaturePhotoValidator;

fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        _ => None,
    }
}

impl PhotoValidator for SignaturePhotoValidator {
    fn validate(&self, bytes: &[u8], content_type: &str) -> Result<PhotoVerdict, ValidatorError> {
        let detected = detect_image_type(bytes);
        let mut reasons = Vec::new();
        match detected {
            None => reasons.push("file is not a JPEG or PNG image".to_string()),
            Some(detected) if detected != content_type => reasons.push(format!(
                "declared {content_type} but file contents are {detected}"
            )),
            Some(_) => {}
        }
        if bytes.len() < MIN_PHOTO_BYTES {
            reasons.push("image is truncated".to_string());
        }

        Ok(PhotoVerdict {
            accepted: reasons.is_empty(),
            reasons,
            details: json!({
                "detected_type": detected,
                "declared_type": content_type,
                "bytes": bytes.len(),
            }),
        })
    }
}

/// Produces predictable document links; can be switched off to simulate an outage.
#[derive(Default)]
pub(crate) struct LinkRenderer {
    offline: AtomicBool,
}

impl LinkRenderer {
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl CertificateRenderer for LinkRenderer {
    fn render(&self, request: &CertificateRequest) -> Result<String, RenderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RenderError::Failed(
                "certificate renderer offline".to_string(),
            ));
        }
        info!(
            clearance = %request.clearance_id,
            student = %request.student.matric_number,
            department = %request.department.name,
            "certificate rendered"
        );
        Ok(format!(
            "memory://certificates/{}.pdf",
            request.clearance_id
        ))
    }
}

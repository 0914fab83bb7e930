use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CertificateRef, ClearanceId, DepartmentId, SubmissionContent, SubmissionId, SubmissionMode,
    SubmissionStatus, UserId,
};
use super::history::History;

/// Stored submission: one per student, mutated only through workflow transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub student_id: UserId,
    pub department: DepartmentId,
    pub status: SubmissionStatus,
    pub content: SubmissionContent,
    #[serde(default)]
    pub remarks: Option<String>,
    pub history: History,
    #[serde(default)]
    pub clearance_id: Option<ClearanceId>,
    #[serde(default)]
    pub certificate: Option<CertificateRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn mode(&self) -> SubmissionMode {
        self.content.mode()
    }

    pub fn revision(&self) -> Revision {
        Revision {
            status: self.status,
            history_len: self.history.len(),
            certified: self.certificate.is_some(),
        }
    }

    /// Approved but the renderer has not produced a document yet.
    pub fn awaiting_certificate(&self) -> bool {
        self.status == SubmissionStatus::FinallyApproved && self.certificate.is_none()
    }

    pub fn status_view(&self) -> SubmissionStatusView {
        SubmissionStatusView {
            submission_id: self.id.clone(),
            student_id: self.student_id.clone(),
            department: self.department.clone(),
            status: self.status.label(),
            mode: self.mode(),
            remarks: self.remarks.clone(),
            history_len: self.history.len(),
            resubmitted: self.history.was_resubmitted(),
            clearance_id: self.clearance_id.clone(),
            certificate_url: self
                .certificate
                .as_ref()
                .map(|certificate| certificate.document_url.clone()),
            updated_at: self.updated_at,
        }
    }
}

/// Snapshot used for optimistic concurrency; any accepted transition or
/// certificate attachment changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub status: SubmissionStatus,
    pub history_len: usize,
    pub certified: bool,
}

/// Selection applied by `SubmissionRepository::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub department: Option<DepartmentId>,
    pub awaiting_certificate: bool,
    pub clearance_id: Option<ClearanceId>,
}

impl SubmissionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn in_department(mut self, department: DepartmentId) -> Self {
        self.department = Some(department);
        self
    }

    pub fn awaiting_certificate(mut self) -> Self {
        self.awaiting_certificate = true;
        self
    }

    pub fn with_clearance_id(mut self, clearance_id: ClearanceId) -> Self {
        self.clearance_id = Some(clearance_id);
        self
    }

    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if &record.department != department {
                return false;
            }
        }
        if let Some(clearance_id) = &self.clearance_id {
            if record.clearance_id.as_ref() != Some(clearance_id) {
                return false;
            }
        }
        !self.awaiting_certificate || record.awaiting_certificate()
    }
}

/// Storage abstraction for the submission store.
///
/// Implementations must make `compare_and_swap` atomic: the write lands only if the
/// stored revision still equals `expected`, so two racing transitions cannot both win.
pub trait SubmissionRepository: Send + Sync {
    /// Fails with `Conflict` if the student already owns a submission.
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError>;
    fn fetch_by_student(
        &self,
        student: &UserId,
    ) -> Result<Option<SubmissionRecord>, RepositoryError>;
    fn compare_and_swap(
        &self,
        expected: Revision,
        record: SubmissionRecord,
    ) -> Result<(), RepositoryError>;
    /// Matching records, most recently updated first.
    fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("student {0} already has a submission")]
    Conflict(UserId),
    #[error("record not found")]
    NotFound,
    #[error("submission changed concurrently (expected {expected}, found {found})")]
    StaleRevision {
        expected: SubmissionStatus,
        found: SubmissionStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a submission for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatusView {
    pub submission_id: SubmissionId,
    pub student_id: UserId,
    pub department: DepartmentId,
    pub status: &'static str,
    pub mode: SubmissionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub history_len: usize,
    pub resubmitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearance_id: Option<ClearanceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

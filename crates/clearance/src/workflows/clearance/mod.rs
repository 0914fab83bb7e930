//! Student clearance approval workflow.
//!
//! A student submits a passport photo plus either a scanned form or a filled-in
//! form. The head of the student's department reviews it, then the active
//! admissions officer gives final clearance and a certificate is issued. Either
//! reviewer can reject with remarks; a rejected submission can be resubmitted.

pub mod audit;
pub mod certificate;
pub mod directory;
pub mod domain;
pub mod history;
pub mod intake;
pub mod memory;
pub mod notify;
pub mod officer;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod transition;

#[cfg(test)]
mod tests;

pub use audit::{
    AuditError, AuditLog, AuditQuery, AuditSink, FileMeta, UploadAuditRecord, UploadOutcome,
    DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT,
};
pub use certificate::{
    ApprovalStamp, CertificateRenderer, CertificateRequest, CertificateStudent,
    ClearanceIdGenerator, RenderError,
};
pub use directory::{DepartmentProfile, DirectoryError, StudentDirectory, StudentProfile};
pub use domain::{
    Actor, ArtifactKind, ArtifactRef, CertificateRef, ClearanceId, DepartmentId, FieldViolation,
    Role, StructuredForm, SubmissionContent, SubmissionId, SubmissionMode, SubmissionStatus,
    UserId,
};
pub use history::{History, HistoryAction, HistoryEntry};
pub use intake::{
    AcceptedPhoto, BlobError, BlobStore, FileUpload, IntakeError, IntakeLimits, PhotoValidator,
    PhotoVerdict, UploadIntake, ValidatorError,
};
pub use memory::MemorySubmissionStore;
pub use notify::{Notification, NotificationTemplate, Notifier, NotifyError};
pub use officer::{ActiveOfficerSlot, OfficerAssignment, OfficerRegistry, RegistryError};
pub use report::{ClearanceStats, StatusCountEntry};
pub use repository::{
    RepositoryError, Revision, SubmissionFilter, SubmissionRecord, SubmissionRepository,
    SubmissionStatusView,
};
pub use router::{clearance_router, ClearanceApi, EncodedFile, SubmissionPayload};
pub use service::{
    ClearanceWorkflowService, SubmissionDraft, WorkflowCollaborators, WorkflowError,
};

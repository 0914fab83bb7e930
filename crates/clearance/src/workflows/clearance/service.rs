use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::certificate::{
    ApprovalStamp, CertificateRenderer, CertificateRequest, CertificateStudent,
    ClearanceIdGenerator, RenderError,
};
use super::directory::{DepartmentProfile, DirectoryError, StudentDirectory, StudentProfile};
use super::domain::{
    Actor, ArtifactRef, CertificateRef, ClearanceId, FieldViolation, Role, StructuredForm,
    SubmissionContent, SubmissionId, SubmissionStatus, UserId,
};
use super::history::{History, HistoryEntry};
use super::intake::AcceptedPhoto;
use super::notify::{Notification, NotificationTemplate, Notifier};
use super::officer::{OfficerAssignment, OfficerRegistry, RegistryError};
use super::report::ClearanceStats;
use super::repository::{
    RepositoryError, SubmissionFilter, SubmissionRecord, SubmissionRepository,
};
use super::transition::{normalize_remarks, WorkflowAction};
use crate::config::WorkflowConfig;

/// Collaborators the service reaches through trait objects.
pub struct WorkflowCollaborators {
    pub renderer: Arc<dyn CertificateRenderer>,
    pub directory: Arc<dyn StudentDirectory>,
    pub officers: Arc<dyn OfficerRegistry>,
}

/// Artifacts a student hands in on submit or resubmit.
#[derive(Debug, Clone)]
pub enum SubmissionDraft {
    Upload {
        photo: AcceptedPhoto,
        scanned_form: ArtifactRef,
    },
    Structured {
        photo: AcceptedPhoto,
        form: StructuredForm,
    },
}

impl SubmissionDraft {
    fn into_content(self, actor: &Actor) -> Result<SubmissionContent, WorkflowError> {
        let (owner, content) = match self {
            SubmissionDraft::Upload {
                photo,
                scanned_form,
            } => {
                let (owner, photo) = photo.into_parts();
                (
                    owner,
                    SubmissionContent::Upload {
                        photo,
                        scanned_form,
                    },
                )
            }
            SubmissionDraft::Structured { photo, form } => {
                let (owner, photo) = photo.into_parts();
                (owner, SubmissionContent::Structured { photo, form })
            }
        };

        if owner != actor.id {
            return Err(FieldViolation::new("photo", "uploaded by a different student").into());
        }
        content.validate()?;
        Ok(content)
    }
}

/// The clearance state machine: guards, history, persistence, and side effects.
pub struct ClearanceWorkflowService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    renderer: Arc<dyn CertificateRenderer>,
    directory: Arc<dyn StudentDirectory>,
    officers: Arc<dyn OfficerRegistry>,
    clearance_ids: ClearanceIdGenerator,
    rendering: RenderClaims,
}

/// Submissions whose certificate is being rendered by this process.
#[derive(Debug, Default)]
struct RenderClaims {
    active: Mutex<HashSet<SubmissionId>>,
}

impl RenderClaims {
    fn claim(&self, id: &SubmissionId) -> Option<RenderClaim<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.insert(id.clone()).then(|| RenderClaim {
            claims: self,
            id: id.clone(),
        })
    }
}

/// Held for the duration of one render; released on drop.
struct RenderClaim<'a> {
    claims: &'a RenderClaims,
    id: SubmissionId,
}

impl Drop for RenderClaim<'_> {
    fn drop(&mut self) {
        self.claims
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

impl<R, N> ClearanceWorkflowService<R, N>
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        collaborators: WorkflowCollaborators,
        config: &WorkflowConfig,
    ) -> Self {
        let WorkflowCollaborators {
            renderer,
            directory,
            officers,
        } = collaborators;

        Self {
            repository,
            notifier,
            renderer,
            directory,
            officers,
            clearance_ids: ClearanceIdGenerator::new(&config.clearance_prefix),
            rendering: RenderClaims::default(),
        }
    }

    /// Create the student's submission in `pending`.
    pub fn submit(
        &self,
        actor: &Actor,
        draft: SubmissionDraft,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let action = WorkflowAction::Submit;
        let profile = self.submit_guard(actor)?;
        let content = draft.into_content(actor)?;
        let now = Utc::now();
        let record = SubmissionRecord {
            id: next_submission_id(),
            student_id: actor.id.clone(),
            department: profile.department.clone(),
            status: action.target(),
            content,
            remarks: None,
            history: History::starting_with(HistoryEntry::new(
                actor,
                action.history_action(),
                None,
                now,
            )),
            clearance_id: None,
            certificate: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(
            submission = %stored.id,
            student = %actor.id,
            mode = ?stored.mode(),
            "submission received"
        );
        self.notify_recipient(
            profile.email,
            &stored,
            NotificationTemplate::SubmissionReceived,
            BTreeMap::new(),
        );
        Ok(stored)
    }

    /// Runs the checks `submit` applies before it looks at any artifact. Call it
    /// before uploading so a refused submission stores and audits nothing.
    pub fn ensure_can_submit(&self, actor: &Actor) -> Result<(), WorkflowError> {
        self.submit_guard(actor).map(|_| ())
    }

    /// Counterpart of `ensure_can_submit` for `resubmit`.
    pub fn ensure_can_resubmit(
        &self,
        actor: &Actor,
        id: &SubmissionId,
    ) -> Result<(), WorkflowError> {
        let action = WorkflowAction::Resubmit;
        require_role(actor, action)?;
        self.admit(actor, id, action).map(|_| ())
    }

    pub fn department_approve(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        remarks: Option<String>,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let record = self.transition(
            actor,
            id,
            WorkflowAction::DepartmentApprove,
            remarks,
            |_, _| Ok(()),
        )?;
        self.notify(
            &record,
            NotificationTemplate::DepartmentDecision,
            decision_details(&record, "approved"),
        );
        Ok(record)
    }

    pub fn department_reject(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        remarks: &str,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let record = self.transition(
            actor,
            id,
            WorkflowAction::DepartmentReject,
            Some(remarks.to_string()),
            |_, _| Ok(()),
        )?;
        self.notify(
            &record,
            NotificationTemplate::DepartmentDecision,
            decision_details(&record, "rejected"),
        );
        Ok(record)
    }

    /// Final clearance. The approval commits before the certificate is rendered; a
    /// renderer failure is logged and leaves the submission awaiting a certificate.
    pub fn final_approve(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        remarks: Option<String>,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let mut record = self.transition(
            actor,
            id,
            WorkflowAction::FinalApprove,
            remarks,
            |record, now| {
                let year = record
                    .content
                    .structured_form()
                    .and_then(StructuredForm::graduation_year);
                record.clearance_id = Some(self.unique_clearance_id(year, now)?);
                record.certificate = None;
                Ok(())
            },
        )?;

        match self.issue_certificate(&record.id) {
            Ok(certificate) => record.certificate = Some(certificate),
            Err(WorkflowError::Conflict(reason)) => info!(
                submission = %record.id,
                %reason,
                "certificate left to the request already rendering it"
            ),
            Err(err) => error!(
                submission = %record.id,
                error = %err,
                "certificate generation failed; submission awaits certificate"
            ),
        }

        let mut details = decision_details(&record, "approved");
        if let Some(clearance_id) = &record.clearance_id {
            details.insert("clearance_id".to_string(), clearance_id.0.clone());
        }
        if let Some(certificate) = &record.certificate {
            details.insert(
                "certificate_url".to_string(),
                certificate.document_url.clone(),
            );
        }
        self.notify(&record, NotificationTemplate::FinalDecision, details);
        Ok(record)
    }

    pub fn final_reject(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        remarks: &str,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let record = self.transition(
            actor,
            id,
            WorkflowAction::FinalReject,
            Some(remarks.to_string()),
            |_, _| Ok(()),
        )?;
        self.notify(
            &record,
            NotificationTemplate::FinalDecision,
            decision_details(&record, "rejected"),
        );
        Ok(record)
    }

    /// Send a rejected submission back to `pending` with replacement artifacts.
    pub fn resubmit(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        draft: SubmissionDraft,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let action = WorkflowAction::Resubmit;
        require_role(actor, action)?;
        let content = draft.into_content(actor)?;
        let profile = self.student_profile(&actor.id)?;
        let department = profile.department.clone();

        let record = self.transition(actor, id, action, None, move |record, _| {
            record.content = content;
            record.department = department;
            record.clearance_id = None;
            record.certificate = None;
            Ok(())
        })?;
        self.notify_recipient(
            profile.email,
            &record,
            NotificationTemplate::ResubmissionReceived,
            BTreeMap::new(),
        );
        Ok(record)
    }

    /// Retry path for approved submissions whose certificate never rendered.
    /// Returns the existing certificate untouched when one is already attached.
    pub fn regenerate_certificate(
        &self,
        actor: &Actor,
        id: &SubmissionId,
    ) -> Result<CertificateRef, WorkflowError> {
        require_any(actor, &[Role::AdmissionsOfficer], "regenerate certificates")?;
        self.require_active_officer(actor)?;

        let mut record = self.fetch(id)?;
        if record.status != SubmissionStatus::FinallyApproved {
            return Err(WorkflowError::InvalidTransition {
                action: "regenerate_certificate",
                from: record.status,
            });
        }
        if let Some(certificate) = &record.certificate {
            return Ok(certificate.clone());
        }

        if record.clearance_id.is_none() {
            let expected = record.revision();
            let year = record
                .content
                .structured_form()
                .and_then(StructuredForm::graduation_year);
            record.clearance_id = Some(self.unique_clearance_id(year, Utc::now())?);
            self.repository.compare_and_swap(expected, record.clone())?;
        }

        let certificate = self.issue_certificate(&record.id)?;
        info!(submission = %record.id, officer = %actor.id, "certificate regenerated");
        Ok(certificate)
    }

    pub fn submission(
        &self,
        actor: &Actor,
        id: &SubmissionId,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let record = self.fetch(id)?;
        authorize_view(actor, &record)?;
        Ok(record)
    }

    pub fn my_submission(&self, actor: &Actor) -> Result<Option<SubmissionRecord>, WorkflowError> {
        require_any(actor, &[Role::Student], "view own submission")?;
        Ok(self.repository.fetch_by_student(&actor.id)?)
    }

    /// Submissions from the head's own department, most recently updated first.
    pub fn department_queue(&self, actor: &Actor) -> Result<Vec<SubmissionRecord>, WorkflowError> {
        require_any(actor, &[Role::DepartmentHead], "view department queue")?;
        let department = actor.department.clone().ok_or_else(|| {
            WorkflowError::Authorization(format!(
                "department head {} has no department scope",
                actor.id
            ))
        })?;
        Ok(self
            .repository
            .list(&SubmissionFilter::all().in_department(department))?)
    }

    pub fn final_queue(&self, actor: &Actor) -> Result<Vec<SubmissionRecord>, WorkflowError> {
        require_any(actor, &[Role::AdmissionsOfficer], "view final approval queue")?;
        Ok(self.repository.list(
            &SubmissionFilter::all().with_status(SubmissionStatus::DepartmentApproved),
        )?)
    }

    pub fn list(
        &self,
        actor: &Actor,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<SubmissionRecord>, WorkflowError> {
        require_any(
            actor,
            &[Role::AdmissionsOfficer, Role::Administrator],
            "list submissions",
        )?;
        let filter = match status {
            Some(status) => SubmissionFilter::all().with_status(status),
            None => SubmissionFilter::all(),
        };
        Ok(self.repository.list(&filter)?)
    }

    /// Approved submissions still missing their certificate.
    pub fn awaiting_certificate(
        &self,
        actor: &Actor,
    ) -> Result<Vec<SubmissionRecord>, WorkflowError> {
        require_any(
            actor,
            &[Role::AdmissionsOfficer, Role::Administrator],
            "list submissions awaiting certificates",
        )?;
        Ok(self
            .repository
            .list(&SubmissionFilter::all().awaiting_certificate())?)
    }

    pub fn certificate(
        &self,
        actor: &Actor,
        student: &UserId,
    ) -> Result<CertificateRef, WorkflowError> {
        if actor.role == Role::Student && &actor.id != student {
            return Err(WorkflowError::Authorization(
                "students may only view their own certificate".to_string(),
            ));
        }
        let record = self
            .repository
            .fetch_by_student(student)?
            .ok_or_else(|| WorkflowError::NotFound(format!("submission for student {student}")))?;
        authorize_view(actor, &record)?;
        record
            .certificate
            .ok_or_else(|| WorkflowError::NotFound(format!("certificate for student {student}")))
    }

    pub fn stats(&self, actor: &Actor) -> Result<ClearanceStats, WorkflowError> {
        require_any(actor, &[Role::Administrator], "view system statistics")?;
        let records = self.repository.list(&SubmissionFilter::all())?;
        Ok(ClearanceStats::from_records(&records))
    }

    /// Replace the active admissions officer; also the credential-reset path.
    pub fn assign_officer(
        &self,
        actor: &Actor,
        officer: UserId,
    ) -> Result<OfficerAssignment, WorkflowError> {
        require_any(actor, &[Role::Administrator], "assign the admissions officer")?;
        let assignment = self.officers.assign(officer)?;
        info!(
            officer = %assignment.officer_id,
            assigned_by = %actor.id,
            "active admissions officer assigned"
        );
        Ok(assignment)
    }

    fn transition<F>(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        action: WorkflowAction,
        remarks: Option<String>,
        apply: F,
    ) -> Result<SubmissionRecord, WorkflowError>
    where
        F: FnOnce(&mut SubmissionRecord, DateTime<Utc>) -> Result<(), WorkflowError>,
    {
        require_role(actor, action)?;
        let remarks = normalize_remarks(remarks);
        if action.requires_remarks() && remarks.is_none() {
            return Err(FieldViolation::new("remarks", "required when rejecting").into());
        }

        let mut record = self.admit(actor, id, action)?;
        let expected = record.revision();
        let now = Utc::now();
        record.status = action.target();
        record.remarks = remarks.clone();
        record.history.append(HistoryEntry::new(
            actor,
            action.history_action(),
            remarks,
            now,
        ));
        record.updated_at = now;
        apply(&mut record, now)?;

        self.repository.compare_and_swap(expected, record.clone())?;
        info!(
            submission = %record.id,
            actor = %actor.id,
            action = action.label(),
            status = record.status.label(),
            "submission transitioned"
        );
        Ok(record)
    }

    /// Fetch the record and check the caller's scope and the source status.
    fn admit(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        action: WorkflowAction,
    ) -> Result<SubmissionRecord, WorkflowError> {
        let record = self.fetch(id)?;
        self.authorize_scope(actor, action, &record)?;
        if !action.permits_from(record.status) {
            return Err(WorkflowError::InvalidTransition {
                action: action.label(),
                from: record.status,
            });
        }
        Ok(record)
    }

    fn submit_guard(&self, actor: &Actor) -> Result<StudentProfile, WorkflowError> {
        let action = WorkflowAction::Submit;
        require_role(actor, action)?;

        if let Some(existing) = self.repository.fetch_by_student(&actor.id)? {
            return Err(if existing.status.is_active() {
                WorkflowError::Conflict(format!(
                    "student {} already has an active submission ({})",
                    actor.id, existing.id
                ))
            } else {
                WorkflowError::InvalidTransition {
                    action: action.label(),
                    from: existing.status,
                }
            });
        }
        self.student_profile(&actor.id)
    }

    /// Draw a clearance id no stored submission carries yet.
    fn unique_clearance_id(
        &self,
        graduation_year: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<ClearanceId, WorkflowError> {
        self.clearance_ids
            .generate_unique(graduation_year, now, |candidate| -> Result<bool, WorkflowError> {
                let holders = self
                    .repository
                    .list(&SubmissionFilter::all().with_clearance_id(candidate.clone()))?;
                Ok(!holders.is_empty())
            })?
            .ok_or_else(|| {
                WorkflowError::Conflict("no unused clearance id after repeated draws".to_string())
            })
    }

    fn authorize_scope(
        &self,
        actor: &Actor,
        action: WorkflowAction,
        record: &SubmissionRecord,
    ) -> Result<(), WorkflowError> {
        match action.required_role() {
            Role::Student if record.student_id != actor.id => Err(WorkflowError::Authorization(
                "students may only act on their own submission".to_string(),
            )),
            Role::DepartmentHead if actor.department.as_ref() != Some(&record.department) => {
                Err(WorkflowError::Authorization(format!(
                    "department head {} cannot review submissions from department {}",
                    actor.id, record.department
                )))
            }
            Role::AdmissionsOfficer => self.require_active_officer(actor),
            _ => Ok(()),
        }
    }

    fn require_active_officer(&self, actor: &Actor) -> Result<(), WorkflowError> {
        if self.officers.is_active_officer(&actor.id)? {
            Ok(())
        } else {
            Err(WorkflowError::Authorization(format!(
                "officer {} is not the active admissions officer",
                actor.id
            )))
        }
    }

    fn fetch(&self, id: &SubmissionId) -> Result<SubmissionRecord, WorkflowError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("submission {id}")))
    }

    fn student_profile(&self, id: &UserId) -> Result<StudentProfile, WorkflowError> {
        self.directory
            .student(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("student {id}")))
    }

    /// Render and attach the certificate for an approved record. Only one render
    /// per submission runs at a time; a concurrent caller gets `Conflict`.
    fn issue_certificate(&self, id: &SubmissionId) -> Result<CertificateRef, WorkflowError> {
        let Some(_claim) = self.rendering.claim(id) else {
            return Err(WorkflowError::Conflict(format!(
                "certificate for submission {id} is already being generated"
            )));
        };
        let record = self.fetch(id)?;
        if let Some(certificate) = &record.certificate {
            return Ok(certificate.clone());
        }

        let clearance_id = record
            .clearance_id
            .clone()
            .ok_or_else(|| RenderError::MissingData("clearance id".to_string()))?;
        let request = self.certificate_request(&record, clearance_id.clone())?;
        let document_url = self.renderer.render(&request)?;

        let certificate = CertificateRef {
            document_url,
            clearance_id,
            generated_at: Utc::now(),
        };
        let mut certified = record.clone();
        certified.certificate = Some(certificate.clone());
        self.repository
            .compare_and_swap(record.revision(), certified)?;
        info!(
            submission = %record.id,
            clearance = %certificate.clearance_id,
            "certificate issued"
        );
        Ok(certificate)
    }

    fn certificate_request(
        &self,
        record: &SubmissionRecord,
        clearance_id: ClearanceId,
    ) -> Result<CertificateRequest, WorkflowError> {
        let profile = self.directory.student(&record.student_id)?.ok_or_else(|| {
            RenderError::MissingData(format!("profile for student {}", record.student_id))
        })?;
        let department = self
            .directory
            .department(&record.department)?
            .unwrap_or_else(|| DepartmentProfile {
                id: record.department.clone(),
                name: "N/A".to_string(),
                faculty: None,
            });

        let department_approval =
            self.approval_stamp(record, Role::DepartmentHead, "Head of Department")?;
        let final_approval =
            self.approval_stamp(record, Role::AdmissionsOfficer, "Admissions Officer")?;

        Ok(CertificateRequest {
            clearance_id,
            student: CertificateStudent::from_sources(&profile, record.content.structured_form()),
            department,
            photo_url: record.content.photo().url.clone(),
            department_approval,
            final_approval,
        })
    }

    fn approval_stamp(
        &self,
        record: &SubmissionRecord,
        role: Role,
        fallback_name: &str,
    ) -> Result<ApprovalStamp, WorkflowError> {
        let entry = record.history.latest_approval_by(role).ok_or_else(|| {
            RenderError::MissingData(format!("{} approval in history", role.label()))
        })?;
        let name = self
            .directory
            .display_name(&entry.actor_id)?
            .unwrap_or_else(|| fallback_name.to_string());
        Ok(ApprovalStamp {
            name,
            approved_at: entry.at,
        })
    }

    fn notify(
        &self,
        record: &SubmissionRecord,
        template: NotificationTemplate,
        details: BTreeMap<String, String>,
    ) {
        match self.directory.student(&record.student_id) {
            Ok(Some(profile)) => self.notify_recipient(profile.email, record, template, details),
            Ok(None) => warn!(
                submission = %record.id,
                student = %record.student_id,
                template = template.label(),
                "student missing from directory; notification skipped"
            ),
            Err(err) => warn!(
                submission = %record.id,
                template = template.label(),
                error = %err,
                "recipient lookup failed; notification skipped"
            ),
        }
    }

    fn notify_recipient(
        &self,
        recipient_email: String,
        record: &SubmissionRecord,
        template: NotificationTemplate,
        mut details: BTreeMap<String, String>,
    ) {
        details.insert("status".to_string(), record.status.label().to_string());
        let notification = Notification {
            recipient_email,
            template,
            submission_id: record.id.clone(),
            details,
        };
        if let Err(err) = self.notifier.notify(notification) {
            warn!(
                submission = %record.id,
                template = template.label(),
                error = %err,
                "notification failed"
            );
        }
    }
}

fn decision_details(record: &SubmissionRecord, decision: &str) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert("decision".to_string(), decision.to_string());
    if let Some(remarks) = &record.remarks {
        details.insert("remarks".to_string(), remarks.clone());
    }
    if let Some(entry) = record.history.last() {
        details.insert(
            "reviewer_role".to_string(),
            entry.actor_role.label().to_string(),
        );
    }
    details
}

fn require_role(actor: &Actor, action: WorkflowAction) -> Result<(), WorkflowError> {
    if actor.role == action.required_role() {
        Ok(())
    } else {
        Err(WorkflowError::Authorization(format!(
            "{} may not {}",
            actor.role.label(),
            action.label()
        )))
    }
}

fn require_any(actor: &Actor, roles: &[Role], what: &str) -> Result<(), WorkflowError> {
    if roles.contains(&actor.role) {
        Ok(())
    } else {
        Err(WorkflowError::Authorization(format!(
            "{} may not {what}",
            actor.role.label()
        )))
    }
}

fn authorize_view(actor: &Actor, record: &SubmissionRecord) -> Result<(), WorkflowError> {
    let permitted = match actor.role {
        Role::Student => record.student_id == actor.id,
        Role::DepartmentHead => actor.department.as_ref() == Some(&record.department),
        Role::AdmissionsOfficer | Role::Administrator => true,
    };
    if permitted {
        Ok(())
    } else {
        Err(WorkflowError::Authorization(format!(
            "{} {} may not view submission {}",
            actor.role.label(),
            actor.id,
            record.id
        )))
    }
}

/// Error raised by the workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("cannot {action} a submission that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: SubmissionStatus,
    },
    #[error("invalid {0}")]
    Validation(#[from] FieldViolation),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Certificate(#[from] RenderError),
}

impl WorkflowError {
    /// Stable machine-readable tag for API payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Authorization(_) => "authorization",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::Validation(_) => "validation",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Repository(_)
            | WorkflowError::Directory(_)
            | WorkflowError::Registry(_) => "unavailable",
            WorkflowError::Certificate(_) => "collaborator_failure",
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(student) => WorkflowError::Conflict(format!(
                "student {student} already has a submission"
            )),
            stale @ RepositoryError::StaleRevision { .. } => {
                WorkflowError::Conflict(stale.to_string())
            }
            RepositoryError::NotFound => WorkflowError::NotFound("submission".to_string()),
            unavailable @ RepositoryError::Unavailable(_) => WorkflowError::Repository(unavailable),
        }
    }
}

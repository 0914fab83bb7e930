//! Upload intake: type and size gates, photo validation, audit trail, blob storage.

use std::sync::Arc;

use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::audit::{AuditError, AuditLog, AuditQuery, FileMeta, UploadAuditRecord, UploadOutcome};
use super::domain::{Actor, ArtifactKind, ArtifactRef, Role, UserId};
use crate::config::WorkflowConfig;

/// Raw upload as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn from_base64(
        file_name: &str,
        content_type: &str,
        encoded: &str,
    ) -> Result<Self, IntakeError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|err| IntakeError::Encoding(err.to_string()))?;
        Ok(Self {
            file_name: file_name.to_string(),
            content_type: content_type.trim().to_ascii_lowercase(),
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            file_name: self.file_name.clone(),
            size: self.size(),
            content_type: self.content_type.clone(),
        }
    }
}

/// Verdict returned by the external photo classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoVerdict {
    pub accepted: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

pub trait PhotoValidator: Send + Sync {
    fn validate(&self, bytes: &[u8], content_type: &str) -> Result<PhotoVerdict, ValidatorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("photo validator unavailable: {0}")]
    Unavailable(String),
}

/// External file storage; the returned URL is all the workflow keeps.
pub trait BlobStore: Send + Sync {
    fn store(
        &self,
        owner: &UserId,
        kind: ArtifactKind,
        upload: &FileUpload,
    ) -> Result<String, BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Photo that passed validation and was stored. Only intake can mint one, so the
/// workflow cannot be handed a photo the validator turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedPhoto {
    owner: UserId,
    artifact: ArtifactRef,
}

impl AcceptedPhoto {
    pub(crate) fn new(owner: UserId, artifact: ArtifactRef) -> Self {
        Self { owner, artifact }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub(crate) fn into_parts(self) -> (UserId, ArtifactRef) {
        (self.owner, self.artifact)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub photo_max_bytes: u64,
    pub form_max_bytes: u64,
}

impl From<&WorkflowConfig> for IntakeLimits {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            photo_max_bytes: config.photo_max_bytes,
            form_max_bytes: config.form_max_bytes,
        }
    }
}

fn photo_types() -> Vec<mime::Mime> {
    vec![mime::IMAGE_JPEG, mime::IMAGE_PNG]
}

fn form_types() -> Vec<mime::Mime> {
    vec![mime::IMAGE_JPEG, mime::IMAGE_PNG, mime::APPLICATION_PDF]
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{kind} upload must be one of {allowed:?}, got '{content_type}'")]
    UnsupportedType {
        kind: &'static str,
        content_type: String,
        allowed: Vec<String>,
    },
    #[error("{kind} upload is {size} bytes, limit is {max}")]
    TooLarge {
        kind: &'static str,
        size: u64,
        max: u64,
    },
    #[error("{kind} upload is empty")]
    Empty { kind: &'static str },
    #[error("upload is not valid base64: {0}")]
    Encoding(String),
    #[error("photo rejected: {}", .reasons.join("; "))]
    PhotoRejected { reasons: Vec<String> },
    #[error(transparent)]
    Validator(#[from] ValidatorError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error("not authorized: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

pub struct UploadIntake {
    validator: Arc<dyn PhotoValidator>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditLog>,
    limits: IntakeLimits,
}

impl UploadIntake {
    pub fn new(
        validator: Arc<dyn PhotoValidator>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditLog>,
        limits: IntakeLimits,
    ) -> Self {
        Self {
            validator,
            blobs,
            audit,
            limits,
        }
    }

    pub fn limits(&self) -> IntakeLimits {
        self.limits
    }

    /// Recent photo validation attempts for administrators.
    pub fn upload_audits(
        &self,
        actor: &Actor,
        query: &AuditQuery,
    ) -> Result<Vec<UploadAuditRecord>, IntakeError> {
        if actor.role != Role::Administrator {
            return Err(IntakeError::Forbidden(format!(
                "{} may not view upload audits",
                actor.role.label()
            )));
        }
        Ok(self.audit.recent(query)?)
    }

    /// Validate, audit, and store a passport photo.
    pub fn accept_photo(
        &self,
        student: &UserId,
        upload: FileUpload,
    ) -> Result<AcceptedPhoto, IntakeError> {
        check_upload(
            ArtifactKind::Photo,
            &upload,
            &photo_types(),
            self.limits.photo_max_bytes,
        )?;

        let verdict = self.validator.validate(&upload.bytes, &upload.content_type)?;
        let outcome = if verdict.accepted {
            UploadOutcome::Accepted
        } else {
            UploadOutcome::Rejected
        };
        self.record_attempt(student, &upload, outcome, &verdict);

        if !verdict.accepted {
            info!(student = %student, reasons = ?verdict.reasons, "passport photo rejected");
            return Err(IntakeError::PhotoRejected {
                reasons: verdict.reasons,
            });
        }

        let url = self.blobs.store(student, ArtifactKind::Photo, &upload)?;
        Ok(AcceptedPhoto::new(
            student.clone(),
            ArtifactRef {
                kind: ArtifactKind::Photo,
                url,
            },
        ))
    }

    /// Store a scanned clearance form. Forms are not run through the photo validator.
    pub fn accept_form(
        &self,
        student: &UserId,
        upload: FileUpload,
    ) -> Result<ArtifactRef, IntakeError> {
        check_upload(
            ArtifactKind::Form,
            &upload,
            &form_types(),
            self.limits.form_max_bytes,
        )?;
        let url = self.blobs.store(student, ArtifactKind::Form, &upload)?;
        Ok(ArtifactRef {
            kind: ArtifactKind::Form,
            url,
        })
    }

    fn record_attempt(
        &self,
        student: &UserId,
        upload: &FileUpload,
        outcome: UploadOutcome,
        verdict: &PhotoVerdict,
    ) {
        let record = UploadAuditRecord {
            student_id: student.clone(),
            file: upload.meta(),
            outcome,
            rejection_reasons: verdict.reasons.clone(),
            validation_details: verdict.details.clone(),
            recorded_at: Utc::now(),
        };
        if let Err(err) = self.audit.record(record) {
            warn!(student = %student, error = %err, "upload audit record dropped");
        }
    }
}

fn check_upload(
    kind: ArtifactKind,
    upload: &FileUpload,
    allowed: &[mime::Mime],
    max: u64,
) -> Result<(), IntakeError> {
    let declared = upload.content_type.parse::<mime::Mime>().ok();
    let permitted = declared.is_some_and(|declared| {
        allowed
            .iter()
            .any(|candidate| candidate.essence_str() == declared.essence_str())
    });
    if !permitted {
        return Err(IntakeError::UnsupportedType {
            kind: kind.label(),
            content_type: upload.content_type.clone(),
            allowed: allowed.iter().map(ToString::to_string).collect(),
        });
    }
    if upload.bytes.is_empty() {
        return Err(IntakeError::Empty { kind: kind.label() });
    }
    if upload.size() > max {
        return Err(IntakeError::TooLarge {
            kind: kind.label(),
            size: upload.size(),
            max,
        });
    }
    Ok(())
}

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Identity of any user known to the identity provider, students and staff alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

/// Human-readable code printed on an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClearanceId(pub String);

macro_rules! display_inner {
    ($($name:ident),+) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_inner!(SubmissionId, UserId, DepartmentId, ClearanceId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    DepartmentHead,
    AdmissionsOfficer,
    Administrator,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::DepartmentHead => "department_head",
            Role::AdmissionsOfficer => "admissions_officer",
            Role::Administrator => "administrator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "department_head" | "hod" => Some(Role::DepartmentHead),
            "admissions_officer" | "officer" => Some(Role::AdmissionsOfficer),
            "administrator" | "admin" | "super_admin" => Some(Role::Administrator),
            _ => None,
        }
    }
}

/// Caller resolved by the identity collaborator before any workflow call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentId>,
}

impl Actor {
    pub fn student(id: &str) -> Self {
        Self {
            id: UserId(id.to_string()),
            role: Role::Student,
            department: None,
        }
    }

    pub fn department_head(id: &str, department: &str) -> Self {
        Self {
            id: UserId(id.to_string()),
            role: Role::DepartmentHead,
            department: Some(DepartmentId(department.to_string())),
        }
    }

    pub fn admissions_officer(id: &str) -> Self {
        Self {
            id: UserId(id.to_string()),
            role: Role::AdmissionsOfficer,
            department: None,
        }
    }

    pub fn administrator(id: &str) -> Self {
        Self {
            id: UserId(id.to_string()),
            role: Role::Administrator,
            department: None,
        }
    }
}

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    DepartmentApproved,
    FinallyApproved,
    Rejected,
}

impl SubmissionStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Pending,
            Self::DepartmentApproved,
            Self::FinallyApproved,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DepartmentApproved => "department_approved",
            Self::FinallyApproved => "finally_approved",
            Self::Rejected => "rejected",
        }
    }

    /// A rejected submission no longer blocks the student; everything else does.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Upload,
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Photo,
    Form,
}

impl ArtifactKind {
    pub const fn label(self) -> &'static str {
        match self {
            ArtifactKind::Photo => "photo",
            ArtifactKind::Form => "form",
        }
    }
}

/// Reference to a file held by the blob store. Raw bytes never reach the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub url: String,
}

/// Field-level problem found in submitted data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Personal details captured when a student fills the form online instead of uploading a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredForm {
    pub name: String,
    pub email: String,
    pub matric_number: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub state_of_origin: Option<String>,
    #[serde(default)]
    pub lga: Option<String>,
    #[serde(default)]
    pub graduation_date: Option<NaiveDate>,
    #[serde(default)]
    pub course_of_study: Option<String>,
}

impl StructuredForm {
    pub fn validate(&self) -> Result<(), FieldViolation> {
        if self.name.trim().is_empty() {
            return Err(FieldViolation::new("name", "must not be empty"));
        }
        if self.matric_number.trim().is_empty() {
            return Err(FieldViolation::new("matric_number", "must not be empty"));
        }

        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(FieldViolation::new(
                    "email",
                    format!("'{email}' is not an email address"),
                ))
            }
        }

        if let (Some(born), Some(graduated)) = (self.date_of_birth, self.graduation_date) {
            if graduated < born {
                return Err(FieldViolation::new(
                    "graduation_date",
                    "precedes date_of_birth",
                ));
            }
        }

        Ok(())
    }

    pub fn graduation_year(&self) -> Option<i32> {
        self.graduation_date.map(|date| date.year())
    }
}

/// Artifacts held by a submission; the variant decides the submission mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmissionContent {
    Upload {
        photo: ArtifactRef,
        scanned_form: ArtifactRef,
    },
    Structured {
        photo: ArtifactRef,
        form: StructuredForm,
    },
}

impl SubmissionContent {
    pub fn mode(&self) -> SubmissionMode {
        match self {
            SubmissionContent::Upload { .. } => SubmissionMode::Upload,
            SubmissionContent::Structured { .. } => SubmissionMode::Structured,
        }
    }

    pub fn photo(&self) -> &ArtifactRef {
        match self {
            SubmissionContent::Upload { photo, .. } | SubmissionContent::Structured { photo, .. } => {
                photo
            }
        }
    }

    pub fn structured_form(&self) -> Option<&StructuredForm> {
        match self {
            SubmissionContent::Structured { form, .. } => Some(form),
            SubmissionContent::Upload { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), FieldViolation> {
        match self {
            SubmissionContent::Upload { scanned_form, .. } => {
                if scanned_form.kind != ArtifactKind::Form {
                    return Err(FieldViolation::new(
                        "scanned_form",
                        "artifact is not a stored form",
                    ));
                }
                Ok(())
            }
            SubmissionContent::Structured { form, .. } => form.validate(),
        }
    }
}

/// Issued certificate attached on final approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRef {
    pub document_url: String,
    pub clearance_id: ClearanceId,
    pub generated_at: DateTime<Utc>,
}

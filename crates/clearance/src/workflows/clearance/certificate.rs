use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::directory::{DepartmentProfile, StudentProfile};
use super::domain::{ClearanceId, StructuredForm};

const CLEARANCE_SUFFIX_LEN: usize = 6;
const CLEARANCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CLEARANCE_ID_ATTEMPTS: usize = 8;

/// Student particulars printed on the certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateStudent {
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub date_of_birth: Option<String>,
    pub marital_status: Option<String>,
    pub state_of_origin: Option<String>,
    pub lga: Option<String>,
    pub graduation_date: Option<String>,
    pub course_of_study: Option<String>,
}

impl CertificateStudent {
    /// Structured form data wins over the account profile when the student typed it in.
    pub fn from_sources(profile: &StudentProfile, form: Option<&StructuredForm>) -> Self {
        match form {
            Some(form) => Self {
                name: form.name.clone(),
                email: form.email.clone(),
                matric_number: form.matric_number.clone(),
                phone: form.phone.clone(),
                sex: form.sex.clone(),
                date_of_birth: form.date_of_birth.map(|date| date.to_string()),
                marital_status: form.marital_status.clone(),
                state_of_origin: form.state_of_origin.clone(),
                lga: form.lga.clone(),
                graduation_date: form.graduation_date.map(|date| date.to_string()),
                course_of_study: form.course_of_study.clone(),
            },
            None => Self {
                name: profile.name.clone(),
                email: profile.email.clone(),
                matric_number: profile.matric_number.clone(),
                phone: profile.phone.clone(),
                sex: profile.sex.clone(),
                date_of_birth: profile.date_of_birth.clone(),
                marital_status: profile.marital_status.clone(),
                state_of_origin: profile.state_of_origin.clone(),
                lga: profile.lga.clone(),
                graduation_date: profile.graduation_date.clone(),
                course_of_study: profile.course_of_study.clone(),
            },
        }
    }
}

/// Who signed off at a stage and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStamp {
    pub name: String,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub clearance_id: ClearanceId,
    pub student: CertificateStudent,
    pub department: DepartmentProfile,
    pub photo_url: String,
    pub department_approval: ApprovalStamp,
    pub final_approval: ApprovalStamp,
}

/// Turns approved data into a downloadable document and returns its URL.
///
/// Keyed by clearance id; callers treat it as at-most-once per approval.
pub trait CertificateRenderer: Send + Sync {
    fn render(&self, request: &CertificateRequest) -> Result<String, RenderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("certificate rendering failed: {0}")]
    Failed(String),
    #[error("certificate data incomplete: {0}")]
    MissingData(String),
}

/// Issues `{prefix}-{year}-{XXXXXX}` clearance identifiers.
#[derive(Debug, Clone)]
pub struct ClearanceIdGenerator {
    prefix: String,
}

impl ClearanceIdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_ascii_uppercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Uses the graduation year when known, else the year of `now`.
    pub fn generate(&self, graduation_year: Option<i32>, now: DateTime<Utc>) -> ClearanceId {
        let year = graduation_year.unwrap_or_else(|| now.year());
        let mut rng = rand::thread_rng();
        let suffix: String = (0..CLEARANCE_SUFFIX_LEN)
            .map(|_| CLEARANCE_ALPHABET[rng.gen_range(0..CLEARANCE_ALPHABET.len())] as char)
            .collect();
        ClearanceId(format!("{}-{year}-{suffix}", self.prefix))
    }

    /// Draws until `taken` reports a free identifier. `None` once every attempt
    /// collided.
    pub fn generate_unique<E, F>(
        &self,
        graduation_year: Option<i32>,
        now: DateTime<Utc>,
        mut taken: F,
    ) -> Result<Option<ClearanceId>, E>
    where
        F: FnMut(&ClearanceId) -> Result<bool, E>,
    {
        for _ in 0..CLEARANCE_ID_ATTEMPTS {
            let candidate = self.generate(graduation_year, now);
            if !taken(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

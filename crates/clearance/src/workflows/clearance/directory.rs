use serde::{Deserialize, Serialize};

use super::domain::{DepartmentId, UserId};

/// Student account details owned by the identity/account system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: DepartmentId,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub state_of_origin: Option<String>,
    #[serde(default)]
    pub lga: Option<String>,
    #[serde(default)]
    pub graduation_date: Option<String>,
    #[serde(default)]
    pub course_of_study: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentProfile {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub faculty: Option<String>,
}

/// Read-only lookups into account data the workflow does not own.
pub trait StudentDirectory: Send + Sync {
    fn student(&self, id: &UserId) -> Result<Option<StudentProfile>, DirectoryError>;
    fn department(&self, id: &DepartmentId) -> Result<Option<DepartmentProfile>, DirectoryError>;
    /// Display name for staff members signing off on a certificate.
    fn display_name(&self, id: &UserId) -> Result<Option<String>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

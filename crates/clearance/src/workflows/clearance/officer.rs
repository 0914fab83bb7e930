//! Active admissions-officer assignment.
//!
//! Exactly one officer may perform final-stage actions at a time. The assignment
//! is a single process-wide record: assigning an officer (or re-issuing their
//! access code) replaces whatever was there before.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerAssignment {
    pub officer_id: UserId,
    pub access_code: String,
    pub assigned_at: DateTime<Utc>,
}

/// Accessor for the singleton assignment.
pub trait OfficerRegistry: Send + Sync {
    fn current(&self) -> Result<Option<OfficerAssignment>, RegistryError>;

    /// Make `officer` the only active officer and issue a fresh access code.
    fn assign(&self, officer: UserId) -> Result<OfficerAssignment, RegistryError>;

    fn is_active_officer(&self, officer: &UserId) -> Result<bool, RegistryError> {
        Ok(self
            .current()?
            .is_some_and(|assignment| &assignment.officer_id == officer))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("officer registry unavailable: {0}")]
    Unavailable(String),
}

/// In-process holder of the assignment.
#[derive(Debug, Default)]
pub struct ActiveOfficerSlot {
    slot: RwLock<Option<OfficerAssignment>>,
}

impl ActiveOfficerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_officer(officer: UserId) -> Self {
        let slot = Self::new();
        if let Ok(mut guard) = slot.slot.write() {
            *guard = Some(new_assignment(officer));
        }
        slot
    }
}

impl OfficerRegistry for ActiveOfficerSlot {
    fn current(&self) -> Result<Option<OfficerAssignment>, RegistryError> {
        self.slot
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| RegistryError::Unavailable("officer slot lock poisoned".to_string()))
    }

    fn assign(&self, officer: UserId) -> Result<OfficerAssignment, RegistryError> {
        let assignment = new_assignment(officer);
        let mut guard = self
            .slot
            .write()
            .map_err(|_| RegistryError::Unavailable("officer slot lock poisoned".to_string()))?;
        *guard = Some(assignment.clone());
        Ok(assignment)
    }
}

fn new_assignment(officer: UserId) -> OfficerAssignment {
    OfficerAssignment {
        officer_id: officer,
        access_code: access_code(),
        assigned_at: Utc::now(),
    }
}

fn access_code() -> String {
    let bytes: [u8; 3] = rand::random();
    let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("AO-{hex}")
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::SubmissionId;

/// Message kinds the notifier knows how to word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    SubmissionReceived,
    DepartmentDecision,
    FinalDecision,
    ResubmissionReceived,
}

impl NotificationTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationTemplate::SubmissionReceived => "submission_received",
            NotificationTemplate::DepartmentDecision => "department_decision",
            NotificationTemplate::FinalDecision => "final_decision",
            NotificationTemplate::ResubmissionReceived => "resubmission_received",
        }
    }
}

/// Outbound message payload; wording is the notifier's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_email: String,
    pub template: NotificationTemplate,
    pub submission_id: SubmissionId,
    pub details: BTreeMap<String, String>,
}

/// Outbound message hook (e-mail provider or similar). Best effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

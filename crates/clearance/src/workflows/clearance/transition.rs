//! Transition table for the submission state machine.

use serde::Serialize;

use super::domain::{Role, SubmissionStatus};
use super::history::HistoryAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    DepartmentApprove,
    DepartmentReject,
    FinalApprove,
    FinalReject,
    Resubmit,
}

impl WorkflowAction {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowAction::Submit => "submit",
            WorkflowAction::DepartmentApprove => "department_approve",
            WorkflowAction::DepartmentReject => "department_reject",
            WorkflowAction::FinalApprove => "final_approve",
            WorkflowAction::FinalReject => "final_reject",
            WorkflowAction::Resubmit => "resubmit",
        }
    }

    pub const fn required_role(self) -> Role {
        match self {
            WorkflowAction::Submit | WorkflowAction::Resubmit => Role::Student,
            WorkflowAction::DepartmentApprove | WorkflowAction::DepartmentReject => {
                Role::DepartmentHead
            }
            WorkflowAction::FinalApprove | WorkflowAction::FinalReject => Role::AdmissionsOfficer,
        }
    }

    /// State the submission must be in; `None` means no submission may exist yet.
    pub const fn source(self) -> Option<SubmissionStatus> {
        match self {
            WorkflowAction::Submit => None,
            WorkflowAction::DepartmentApprove | WorkflowAction::DepartmentReject => {
                Some(SubmissionStatus::Pending)
            }
            WorkflowAction::FinalApprove | WorkflowAction::FinalReject => {
                Some(SubmissionStatus::DepartmentApproved)
            }
            WorkflowAction::Resubmit => Some(SubmissionStatus::Rejected),
        }
    }

    pub const fn target(self) -> SubmissionStatus {
        match self {
            WorkflowAction::Submit | WorkflowAction::Resubmit => SubmissionStatus::Pending,
            WorkflowAction::DepartmentApprove => SubmissionStatus::DepartmentApproved,
            WorkflowAction::FinalApprove => SubmissionStatus::FinallyApproved,
            WorkflowAction::DepartmentReject | WorkflowAction::FinalReject => {
                SubmissionStatus::Rejected
            }
        }
    }

    pub const fn history_action(self) -> HistoryAction {
        match self {
            WorkflowAction::Submit => HistoryAction::Submitted,
            WorkflowAction::DepartmentApprove | WorkflowAction::FinalApprove => {
                HistoryAction::Approved
            }
            WorkflowAction::DepartmentReject | WorkflowAction::FinalReject => {
                HistoryAction::Rejected
            }
            WorkflowAction::Resubmit => HistoryAction::Resubmitted,
        }
    }

    pub const fn requires_remarks(self) -> bool {
        matches!(
            self,
            WorkflowAction::DepartmentReject | WorkflowAction::FinalReject
        )
    }

    pub fn permits_from(self, status: SubmissionStatus) -> bool {
        self.source() == Some(status)
    }
}

/// Trim remarks, treating blank input as absent.
pub(crate) fn normalize_remarks(remarks: Option<String>) -> Option<String> {
    remarks
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

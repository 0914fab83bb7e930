use serde::Serialize;

use super::domain::SubmissionStatus;
use super::repository::SubmissionRecord;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCountEntry {
    pub status: SubmissionStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Administrator overview of the submission store.
#[derive(Debug, Clone, Serialize)]
pub struct ClearanceStats {
    pub total: usize,
    pub by_status: Vec<StatusCountEntry>,
    pub resubmitted: usize,
    pub awaiting_certificate: usize,
    pub structured: usize,
}

impl ClearanceStats {
    pub fn from_records(records: &[SubmissionRecord]) -> Self {
        let by_status = SubmissionStatus::ordered()
            .into_iter()
            .map(|status| StatusCountEntry {
                status,
                status_label: status.label(),
                count: records
                    .iter()
                    .filter(|record| record.status == status)
                    .count(),
            })
            .collect();

        Self {
            total: records.len(),
            by_status,
            resubmitted: records
                .iter()
                .filter(|record| record.history.was_resubmitted())
                .count(),
            awaiting_certificate: records
                .iter()
                .filter(|record| record.awaiting_certificate())
                .count(),
            structured: records
                .iter()
                .filter(|record| record.content.structured_form().is_some())
                .count(),
        }
    }

    pub fn count(&self, status: SubmissionStatus) -> usize {
        self.by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{FieldViolation, UserId};

pub const DEFAULT_AUDIT_LIMIT: usize = 50;
pub const MAX_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
}

/// One row per photo validation attempt. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAuditRecord {
    pub student_id: UserId,
    pub file: FileMeta,
    pub outcome: UploadOutcome,
    pub rejection_reasons: Vec<String>,
    pub validation_details: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only sink, independent of the submission store.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: UploadAuditRecord) -> Result<(), AuditError>;
}

/// Read side of the audit trail, used for administrator reporting.
pub trait AuditLog: AuditSink {
    /// Matching records, newest first, at most `query.limit` of them.
    fn recent(&self, query: &AuditQuery) -> Result<Vec<UploadAuditRecord>, AuditError>;
}

/// Selection applied by `AuditLog::recent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub outcome: Option<UploadOutcome>,
    pub student: Option<UserId>,
    pub limit: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            outcome: None,
            student: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

impl AuditQuery {
    /// Limit must lie in `1..=MAX_AUDIT_LIMIT`.
    pub fn with_limit(limit: usize) -> Result<Self, FieldViolation> {
        if !(1..=MAX_AUDIT_LIMIT).contains(&limit) {
            return Err(FieldViolation::new(
                "limit",
                format!("must be between 1 and {MAX_AUDIT_LIMIT}"),
            ));
        }
        Ok(Self {
            limit,
            ..Self::default()
        })
    }

    pub fn with_outcome(mut self, outcome: UploadOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn for_student(mut self, student: UserId) -> Self {
        self.student = Some(student);
        self
    }

    pub fn matches(&self, record: &UploadAuditRecord) -> bool {
        if let Some(outcome) = self.outcome {
            if record.outcome != outcome {
                return false;
            }
        }
        self.student
            .as_ref()
            .map_or(true, |student| &record.student_id == student)
    }

    /// Apply the query to records held in append order. Ties on timestamp
    /// resolve to the later append.
    pub fn select<'a, I>(&self, records: I) -> Vec<UploadAuditRecord>
    where
        I: IntoIterator<Item = &'a UploadAuditRecord>,
    {
        let mut selected: Vec<(usize, &UploadAuditRecord)> = records
            .into_iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record))
            .collect();
        selected.sort_by(|(left_at, left), (right_at, right)| {
            right
                .recorded_at
                .cmp(&left.recorded_at)
                .then_with(|| right_at.cmp(left_at))
        });
        selected
            .into_iter()
            .take(self.limit)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

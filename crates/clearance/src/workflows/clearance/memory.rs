use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{SubmissionId, UserId};
use super::repository::{
    RepositoryError, Revision, SubmissionFilter, SubmissionRecord, SubmissionRepository,
};

/// Process-local submission store. The mutex makes every operation, including
/// `compare_and_swap`, a single critical section.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    records: Mutex<HashMap<SubmissionId, SubmissionRecord>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SubmissionId, SubmissionRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("submission store mutex poisoned".to_string()))
    }
}

impl SubmissionRepository for MemorySubmissionStore {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard
            .values()
            .any(|existing| existing.student_id == record.student_id)
        {
            return Err(RepositoryError::Conflict(record.student_id));
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn fetch_by_student(
        &self,
        student: &UserId,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .find(|record| &record.student_id == student)
            .cloned())
    }

    fn compare_and_swap(
        &self,
        expected: Revision,
        record: SubmissionRecord,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let current = guard.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        let found = current.revision();
        if found != expected {
            return Err(RepositoryError::StaleRevision {
                expected: expected.status,
                found: found.status,
            });
        }
        *current = record;
        Ok(())
    }

    fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let mut records: Vec<SubmissionRecord> = self
            .lock()?
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

//! Append-only decision trail kept on every submission.
//!
//! The trail is the authoritative record of who did what. The mutable
//! `remarks` field on the submission is only a projection of the latest entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, Role, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
    Resubmitted,
}

impl HistoryAction {
    pub const fn label(self) -> &'static str {
        match self {
            HistoryAction::Submitted => "submitted",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Resubmitted => "resubmitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub actor_id: UserId,
    pub actor_role: Role,
    pub action: HistoryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        actor: &Actor,
        action: HistoryAction,
        remarks: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id: actor.id.clone(),
            actor_role: actor.role,
            action,
            remarks,
            at,
        }
    }
}

/// Ordered entries; there is no API to edit or remove one once appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn starting_with(entry: HistoryEntry) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    pub(crate) fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn actions(&self) -> Vec<HistoryAction> {
        self.entries.iter().map(|entry| entry.action).collect()
    }

    /// Most recent approval recorded by the given role.
    pub fn latest_approval_by(&self, role: Role) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.action == HistoryAction::Approved && entry.actor_role == role)
    }

    /// Whether the submission was bounced back at least once.
    pub fn was_resubmitted(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.action == HistoryAction::Resubmitted)
    }
}

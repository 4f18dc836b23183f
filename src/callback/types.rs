//! Audit trail types for the profile_variables callback.

use serde::{Deserialize, Serialize};

use crate::traits::TaskId;
use crate::vars::Variables;

/// Placeholder recorded for a tracked variable that has no value.
pub const UNDEFINED_SENTINEL: &str = "VARIABLE IS UNDEFINED";

/// One recorded (host, task boundary) pair.
///
/// Serialized field names match the document operators already consume:
/// `host`, `task`, `task_id`, `task_arguments`, `task_variables`,
/// `tracked_variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Host identifier
    pub host: String,
    /// Task display name (not unique)
    pub task: String,
    /// Stable task id, groups records of one task across hosts
    pub task_id: TaskId,
    /// The task's own input parameters
    pub task_arguments: Variables,
    /// Variables visible within the task's block/role scope
    pub task_variables: Variables,
    /// The variables the operator asked to track
    pub tracked_variables: Variables,
}

/// Ordered, append-only sequence of [`AuditRecord`]s.
///
/// Insertion order is event arrival order. Records are never reordered or
/// deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: AuditRecord) {
        self.records.push(record);
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Core traits defining the seams between the recorder and its collaborators.
//!
//! The recorder never sees the host engine's object model. It consumes a
//! strictly ordered stream of lifecycle events through [`RunCallback`], asks
//! the engine for data through the three calls on [`ExecutionEngine`], and
//! hands the finished audit log to an [`AuditSink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::callback::types::AuditRecord;
use crate::error::Result;
use crate::vars::Variables;

// ============================================================================
// Identity and Metadata Types
// ============================================================================

/// Opaque, stable identifier of a task.
///
/// Display names are not unique (the same name can appear in several plays
/// or roles), so records are grouped by this id instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a task id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What the engine knows about a task, as returned by
/// [`ExecutionEngine::task_metadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Stable identifier
    pub id: TaskId,
    /// Display name (may include a `role : ` prefix)
    pub name: String,
    /// The task's own input parameters, unrendered
    pub arguments: Variables,
    /// Variables visible within the task's block/role scope
    pub variables: Variables,
}

/// The play being started, as delivered with the play-start event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayContext {
    /// Play name
    pub name: String,
    /// Extra variables for this run (the inline override tier)
    #[serde(default)]
    pub extra_vars: Variables,
}

impl PlayContext {
    /// Creates a play context without extra variables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra_vars: Variables::new(),
        }
    }

    /// Attaches extra variables to the play context.
    pub fn with_extra_vars(mut self, extra_vars: Variables) -> Self {
        self.extra_vars = extra_vars;
        self
    }
}

/// Summary delivered with the run-complete event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Hosts that took part in the run, in inventory order
    pub hosts: Vec<String>,
    /// Number of plays executed
    pub plays: usize,
    /// Number of task-start events delivered
    pub tasks: usize,
    /// Number of handler-task-start events delivered
    pub handlers: usize,
}

// ============================================================================
// Engine Trait
// ============================================================================

/// The narrow contract the recorder needs from the host execution engine.
///
/// All calls are synchronous reads of state the engine has already
/// materialized. An `Err` from any of them is run-fatal.
pub trait ExecutionEngine: Send + Sync + Debug {
    /// Returns the merged variable table for `host` at `task`.
    ///
    /// `Ok(None)` means the host can no longer be resolved (for example it
    /// was removed from the inventory mid-run).
    fn resolve_variables(
        &self,
        play: &PlayContext,
        host: &str,
        task: &TaskId,
    ) -> Result<Option<Variables>>;

    /// Returns the inventory's host identifiers in stable order.
    fn list_hosts(&self) -> Result<Vec<String>>;

    /// Returns display name, id, arguments and local variables of a task.
    fn task_metadata(&self, task: &TaskId) -> Result<TaskMetadata>;
}

// ============================================================================
// Callback Trait
// ============================================================================

/// Callback for receiving run lifecycle events.
///
/// Events arrive strictly sequentially from a single logical thread. Every
/// method defaults to a no-op so implementors only override what they need.
#[async_trait]
pub trait RunCallback: Send + Sync {
    /// Called when a play starts.
    async fn on_play_start(&self, play: &PlayContext) -> Result<()> {
        let _ = play;
        Ok(())
    }

    /// Called once per task, before any host runs it.
    async fn on_task_start(&self, task: &TaskId, is_conditional: bool) -> Result<()> {
        let _ = (task, is_conditional);
        Ok(())
    }

    /// Called once per notified handler, before any host runs it.
    async fn on_handler_task_start(&self, task: &TaskId) -> Result<()> {
        let _ = task;
        Ok(())
    }

    /// Called when a task is about to run on a specific host.
    async fn on_runner_start(&self, host: &str, task: &TaskId) -> Result<()> {
        let _ = (host, task);
        Ok(())
    }

    /// Called once when the whole run has finished.
    async fn on_run_complete(&self, stats: &RunStats) -> Result<()> {
        let _ = stats;
        Ok(())
    }
}

// ============================================================================
// Sink Trait
// ============================================================================

/// Destination for the finished audit log.
pub trait AuditSink: Send + Sync + Debug {
    /// Writes the whole ordered log in one call.
    fn emit(&self, records: &[AuditRecord]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_serializes_as_plain_string() {
        let id = TaskId::new("0271cbca-edf7-66fa-7c0d-000000000004");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"0271cbca-edf7-66fa-7c0d-000000000004\""
        );
        assert_eq!(id.to_string(), "0271cbca-edf7-66fa-7c0d-000000000004");
    }

    #[tokio::test]
    async fn test_default_callback_methods_are_noops() {
        struct Silent;
        impl RunCallback for Silent {}

        let cb = Silent;
        let task = TaskId::from("t1");
        assert!(cb.on_play_start(&PlayContext::new("p")).await.is_ok());
        assert!(cb.on_task_start(&task, false).await.is_ok());
        assert!(cb.on_handler_task_start(&task).await.is_ok());
        assert!(cb.on_runner_start("h", &task).await.is_ok());
        assert!(cb.on_run_complete(&RunStats::default()).await.is_ok());
    }

    #[test]
    fn test_callback_usable_as_trait_object() {
        struct Silent;
        impl RunCallback for Silent {}

        let callbacks: Vec<Box<dyn RunCallback>> = vec![Box::new(Silent), Box::new(Silent)];
        for cb in &callbacks {
            tokio_test::block_on(cb.on_play_start(&PlayContext::new("p"))).unwrap();
        }
    }
}

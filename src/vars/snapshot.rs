//! Variable snapshot extraction.
//!
//! Asks the engine for the merged variable table a host sees at a task and
//! strips the engine's own bookkeeping out of it, leaving only variables an
//! operator could have set.

use tracing::{debug, trace};

use crate::error::Result;
use crate::traits::{ExecutionEngine, PlayContext, TaskMetadata};
use crate::vars::Variables;

/// Key prefixes reserved by the engine for magic and connection variables.
pub const RESERVED_PREFIXES: &[&str] = &["ansible_", "inventory_"];

/// Structural keys the engine injects into every merged table.
pub const INTERNAL_KEYS: &[&str] = &[
    // variable namespace marker
    "vars",
    // per-host variable tables
    "hostvars",
    // group membership
    "groups",
    "group_names",
    // omitted-value placeholder
    "omit",
    // play and role bookkeeping
    "play_hosts",
    "playbook_dir",
    "role_names",
    "role_name",
    "role_path",
];

/// Name of the per-host variable table inside a merged table.
const HOSTVARS: &str = "hostvars";

/// Returns true if `key` is engine-internal and must never be recorded.
pub fn is_internal_key(key: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) || INTERNAL_KEYS.contains(&key)
}

/// Everything the recorder needs about one host at one task boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSnapshot {
    /// Merged environment with engine-internal keys removed
    pub environment: Variables,
    /// The host's own entry in the per-host table, unfiltered
    pub host_scoped: Variables,
    /// The task's input parameters, as provided by the engine
    pub task_arguments: Variables,
    /// The task's block/role scoped variables, as provided by the engine
    pub task_variables: Variables,
}

impl VariableSnapshot {
    /// Look a variable up in the filtered environment, then in the
    /// host-scoped table.
    pub fn lookup(&self, name: &str) -> Option<&serde_json::Value> {
        self.environment
            .get(name)
            .or_else(|| self.host_scoped.get(name))
    }
}

/// Computes [`VariableSnapshot`]s against an engine.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotExtractor<'a> {
    engine: &'a dyn ExecutionEngine,
}

impl<'a> SnapshotExtractor<'a> {
    /// Create an extractor bound to an engine.
    pub fn new(engine: &'a dyn ExecutionEngine) -> Self {
        Self { engine }
    }

    /// Extract the snapshot for `host` at `task`.
    ///
    /// Returns `Ok(None)` when the engine can no longer resolve the host;
    /// callers skip that host and carry on. Engine errors propagate.
    pub fn extract(
        &self,
        play: &PlayContext,
        host: &str,
        task: &TaskMetadata,
    ) -> Result<Option<VariableSnapshot>> {
        let Some(merged) = self.engine.resolve_variables(play, host, &task.id)? else {
            debug!(host = %host, task = %task.name, "Host could not be resolved");
            return Ok(None);
        };

        let host_scoped = merged
            .get_table(HOSTVARS)
            .and_then(|hostvars| hostvars.get_table(host))
            .unwrap_or_default();

        let total = merged.len();
        let mut environment = merged;
        environment.retain(|key| !is_internal_key(key));
        trace!(
            host = %host,
            task = %task.name,
            kept = environment.len(),
            dropped = total - environment.len(),
            "Extracted variable snapshot"
        );

        Ok(Some(VariableSnapshot {
            environment,
            host_scoped,
            task_arguments: task.arguments.clone(),
            task_variables: task.variables.clone(),
        }))
    }
}

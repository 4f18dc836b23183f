//! Deterministic replay of a recorded run.
//!
//! A run fixture describes an inventory and the plays executed against it.
//! [`StaticEngine`] answers the recorder's engine queries from that fixture,
//! and [`replay`] walks the plays emitting lifecycle events in the order a
//! live run delivers them.
//!
//! # Fixture Format (YAML)
//!
//! ```yaml
//! inventory:
//!   vars:
//!     site: lab
//!   groups:
//!     web:
//!       vars:
//!         http_port: 80
//!   hosts:
//!     hosta:
//!       groups: [web]
//!       vars:
//!         host_only: a
//!     hostb: {}
//! plays:
//!   - name: Test play
//!     vars:
//!       var_on_play: hello play
//!     extra_vars:
//!       profile_variables_record_vars: var_on_play
//!     tasks:
//!       - name: Debug 1
//!         args:
//!           msg: "{{ var_on_play }}"
//!       - name: Instantiate another value
//!         set_facts:
//!           var_set_during_play: hello task
//!         notify: [Report]
//!     handlers:
//!       - name: Report
//!         args:
//!           msg: done
//! ```

mod driver;
mod engine;

pub use driver::replay;
pub use engine::StaticEngine;

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::TaskId;
use crate::vars::Variables;

// ============================================================================
// Fixture Types
// ============================================================================

/// A complete run: inventory plus the plays executed against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFixture {
    /// Hosts, groups and inventory-wide variables
    #[serde(default)]
    pub inventory: InventorySpec,

    /// Directory reported as `playbook_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_dir: Option<String>,

    /// Plays, in execution order
    #[serde(default)]
    pub plays: Vec<PlaySpec>,
}

/// Inventory section of a fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySpec {
    /// Variables of the implicit `all` group
    #[serde(default)]
    pub vars: Variables,

    /// Named groups and their variables
    #[serde(default)]
    pub groups: IndexMap<String, GroupSpec>,

    /// Hosts, in inventory order
    #[serde(default)]
    pub hosts: IndexMap<String, HostSpec>,
}

/// A named inventory group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Group variables
    #[serde(default)]
    pub vars: Variables,
}

/// One inventory host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    /// Host variables
    #[serde(default)]
    pub vars: Variables,

    /// Groups the host belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

/// One play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaySpec {
    /// Play name
    #[serde(default)]
    pub name: String,

    /// Target hosts; empty means every inventory host
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Play variables
    #[serde(default)]
    pub vars: Variables,

    /// Extra variables in force for this play
    #[serde(default)]
    pub extra_vars: Variables,

    /// Tasks, in execution order
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,

    /// Handlers, run after the tasks in definition order when notified
    #[serde(default)]
    pub handlers: Vec<TaskSpec>,
}

/// One task or handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Stable id; generated from the task's position when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,

    /// Display name
    pub name: String,

    /// Module arguments
    #[serde(default)]
    pub args: Variables,

    /// Block/role variables visible to the task
    #[serde(default)]
    pub vars: Variables,

    /// Facts each host gains once the task has run
    #[serde(default)]
    pub set_facts: Variables,

    /// Evaluated conditional; `false` skips the task on every host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<bool>,

    /// Handlers notified when the task runs
    #[serde(default)]
    pub notify: Vec<String>,
}

impl TaskSpec {
    /// Whether the task carries a conditional.
    pub fn is_conditional(&self) -> bool {
        self.when.is_some()
    }

    /// Whether the task runs (its conditional, if any, is true).
    pub fn runs(&self) -> bool {
        self.when.unwrap_or(true)
    }
}

// ============================================================================
// Loading
// ============================================================================

impl RunFixture {
    /// Load a fixture file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::fixture(path, format!("cannot read file: {}", e)))?;

        let fixture: RunFixture = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::fixture(path, e.to_string()))?,
            _ => serde_yaml::from_str(&content).map_err(|e| Error::fixture(path, e.to_string()))?,
        };

        fixture.validate().map_err(|message| Error::fixture(path, message))?;
        Ok(fixture)
    }

    /// Parse a YAML fixture.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let fixture: RunFixture = serde_yaml::from_str(content)?;
        fixture
            .validate()
            .map_err(|message| Error::fixture("<inline>", message))?;
        Ok(fixture)
    }

    /// Check references between plays, hosts, groups and handlers.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (host, spec) in &self.inventory.hosts {
            for group in &spec.groups {
                if !self.inventory.groups.contains_key(group) && group != "all" {
                    return Err(format!("host '{}' is in undefined group '{}'", host, group));
                }
            }
        }

        let mut seen_ids = Vec::new();
        for (play_index, play) in self.plays.iter().enumerate() {
            for host in &play.hosts {
                if !self.inventory.hosts.contains_key(host) {
                    return Err(format!(
                        "play '{}' targets unknown host '{}'",
                        play.name, host
                    ));
                }
            }

            for task in &play.tasks {
                for handler in &task.notify {
                    if !play.handlers.iter().any(|h| &h.name == handler) {
                        return Err(format!(
                            "task '{}' notifies unknown handler '{}'",
                            task.name, handler
                        ));
                    }
                }
            }

            for (index, task) in play.tasks.iter().enumerate() {
                seen_ids.push(task_id_for(play_index, TaskKind::Task, index, task));
            }
            for (index, handler) in play.handlers.iter().enumerate() {
                seen_ids.push(task_id_for(play_index, TaskKind::Handler, index, handler));
            }
        }

        seen_ids.sort();
        if let Some(pair) = seen_ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(format!("duplicate task id '{}'", pair[0]));
        }

        Ok(())
    }

    /// Inventory host names, in inventory order.
    pub fn host_names(&self) -> Vec<String> {
        self.inventory.hosts.keys().cloned().collect()
    }

    /// The hosts a play runs against.
    pub fn play_hosts(&self, play: &PlaySpec) -> Vec<String> {
        if play.hosts.is_empty() {
            self.host_names()
        } else {
            play.hosts.clone()
        }
    }
}

/// Whether a spec is a regular task or a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    Task,
    Handler,
}

/// Stable id of a task: its explicit id, or one derived from its position.
pub(crate) fn task_id_for(play_index: usize, kind: TaskKind, index: usize, spec: &TaskSpec) -> TaskId {
    if let Some(id) = &spec.id {
        return id.clone();
    }
    let kind = match kind {
        TaskKind::Task => "task",
        TaskKind::Handler => "handler",
    };
    TaskId::new(format!("play{:02}-{}{:04}", play_index, kind, index))
}

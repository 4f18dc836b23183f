//! In-memory execution engine backed by a run fixture.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, trace};

use super::{task_id_for, RunFixture, TaskKind, TaskSpec};
use crate::error::{Error, Result};
use crate::traits::{ExecutionEngine, PlayContext, TaskId, TaskMetadata};
use crate::vars::{LayeredVars, VarPrecedence, Variables};

/// Placeholder value the engine uses for omitted module arguments.
const OMIT_PLACEHOLDER: &str = "__omit_place_holder__";

/// Where a task lives in the fixture.
#[derive(Debug, Clone, Copy)]
struct TaskLocation {
    play_index: usize,
    kind: TaskKind,
    index: usize,
}

/// Answers engine queries from a [`RunFixture`].
///
/// Facts set by tasks are held per host and become visible to every later
/// resolution, the way registered facts are in a live run.
pub struct StaticEngine {
    fixture: RunFixture,
    extra_vars: Variables,
    tasks: IndexMap<TaskId, TaskLocation>,
    facts: RwLock<IndexMap<String, Variables>>,
    unreachable: RwLock<HashSet<String>>,
}

impl StaticEngine {
    /// Create an engine for a fixture.
    pub fn new(fixture: RunFixture) -> Self {
        let mut tasks = IndexMap::new();
        for (play_index, play) in fixture.plays.iter().enumerate() {
            for (index, task) in play.tasks.iter().enumerate() {
                let id = task_id_for(play_index, TaskKind::Task, index, task);
                tasks.insert(
                    id,
                    TaskLocation {
                        play_index,
                        kind: TaskKind::Task,
                        index,
                    },
                );
            }
            for (index, handler) in play.handlers.iter().enumerate() {
                let id = task_id_for(play_index, TaskKind::Handler, index, handler);
                tasks.insert(
                    id,
                    TaskLocation {
                        play_index,
                        kind: TaskKind::Handler,
                        index,
                    },
                );
            }
        }

        Self {
            fixture,
            extra_vars: Variables::new(),
            tasks,
            facts: RwLock::new(IndexMap::new()),
            unreachable: RwLock::new(HashSet::new()),
        }
    }

    /// Extra variables added to every play (command line `-e`).
    pub fn with_extra_vars(mut self, extra_vars: Variables) -> Self {
        self.extra_vars = extra_vars;
        self
    }

    /// The fixture being replayed.
    pub fn fixture(&self) -> &RunFixture {
        &self.fixture
    }

    /// Play context for the play at `play_index`, with command line extra
    /// variables taking precedence over the play's own.
    pub fn play_context(&self, play_index: usize) -> Result<PlayContext> {
        let play = self
            .fixture
            .plays
            .get(play_index)
            .ok_or_else(|| Error::engine(format!("no play at index {}", play_index)))?;

        let mut extra_vars = play.extra_vars.clone();
        extra_vars.merge(&self.extra_vars);
        Ok(PlayContext::new(play.name.clone()).with_extra_vars(extra_vars))
    }

    /// Id of a task or handler by position.
    pub(crate) fn task_id(&self, play_index: usize, kind: TaskKind, index: usize) -> Option<TaskId> {
        self.tasks
            .iter()
            .find(|(_, loc)| loc.play_index == play_index && loc.kind == kind && loc.index == index)
            .map(|(id, _)| id.clone())
    }

    /// Record facts gained by `host` from a task.
    pub fn apply_facts(&self, host: &str, facts: &Variables) {
        if facts.is_empty() {
            return;
        }
        trace!(host = %host, count = facts.len(), "Applying facts");
        self.facts
            .write()
            .entry(host.to_string())
            .or_default()
            .merge(facts);
    }

    /// Facts gained by `host` so far.
    pub fn host_facts(&self, host: &str) -> Variables {
        self.facts.read().get(host).cloned().unwrap_or_default()
    }

    /// Stop resolving variables for `host`. It stays in the inventory
    /// listing, as a host that drops out mid-run does.
    pub fn mark_unreachable(&self, host: &str) {
        debug!(host = %host, "Host marked unreachable");
        self.unreachable.write().insert(host.to_string());
    }

    fn locate(&self, task: &TaskId) -> Result<(TaskLocation, &TaskSpec)> {
        let location = *self
            .tasks
            .get(task)
            .ok_or_else(|| Error::TaskNotFound(task.to_string()))?;
        let play = &self.fixture.plays[location.play_index];
        let spec = match location.kind {
            TaskKind::Task => &play.tasks[location.index],
            TaskKind::Handler => &play.handlers[location.index],
        };
        Ok((location, spec))
    }

    /// Groups `host` belongs to, in inventory group order.
    fn group_names(&self, host: &str) -> Vec<String> {
        let Some(spec) = self.fixture.inventory.hosts.get(host) else {
            return Vec::new();
        };
        self.fixture
            .inventory
            .groups
            .keys()
            .filter(|group| spec.groups.contains(group))
            .cloned()
            .collect()
    }

    /// Inventory group variables and host variables of `host`.
    fn inventory_layers(&self, host: &str) -> (Variables, Variables) {
        let inventory = &self.fixture.inventory;
        let mut group_vars = inventory.vars.clone();
        for group in self.group_names(host) {
            if let Some(spec) = inventory.groups.get(&group) {
                group_vars.merge(&spec.vars);
            }
        }
        let host_vars = inventory
            .hosts
            .get(host)
            .map(|spec| spec.vars.clone())
            .unwrap_or_default();
        (group_vars, host_vars)
    }

    /// Inventory-level view of a host, as other hosts see it in `hostvars`.
    fn inventory_vars(&self, host: &str) -> Variables {
        let (group_vars, host_vars) = self.inventory_layers(host);
        let mut merged = LayeredVars::new()
            .layer(VarPrecedence::InventoryGroupVars, &group_vars)
            .layer(VarPrecedence::InventoryHostVars, &host_vars)
            .layer(VarPrecedence::SetFacts, &self.host_facts(host))
            .flatten();
        merged.set("inventory_hostname", json!(host));
        merged
    }

    /// The `groups` magic variable.
    fn groups_table(&self) -> JsonValue {
        let inventory = &self.fixture.inventory;
        let mut groups = serde_json::Map::new();
        groups.insert("all".to_string(), json!(self.fixture.host_names()));
        for group in inventory.groups.keys() {
            let members: Vec<&String> = inventory
                .hosts
                .iter()
                .filter(|(_, spec)| spec.groups.contains(group))
                .map(|(name, _)| name)
                .collect();
            groups.insert(group.clone(), json!(members));
        }
        JsonValue::Object(groups)
    }
}

impl fmt::Debug for StaticEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticEngine")
            .field("hosts", &self.fixture.inventory.hosts.len())
            .field("plays", &self.fixture.plays.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl ExecutionEngine for StaticEngine {
    fn resolve_variables(
        &self,
        play: &PlayContext,
        host: &str,
        task: &TaskId,
    ) -> Result<Option<Variables>> {
        if !self.fixture.inventory.hosts.contains_key(host) || self.unreachable.read().contains(host) {
            return Ok(None);
        }

        let (location, spec) = self.locate(task)?;
        let play_spec = &self.fixture.plays[location.play_index];

        let (group_vars, host_vars) = self.inventory_layers(host);
        let user_vars = LayeredVars::new()
            .layer(VarPrecedence::InventoryGroupVars, &group_vars)
            .layer(VarPrecedence::InventoryHostVars, &host_vars)
            .layer(VarPrecedence::PlayVars, &play_spec.vars)
            .layer(VarPrecedence::BlockVars, &spec.vars)
            .layer(VarPrecedence::SetFacts, &self.host_facts(host))
            .layer(VarPrecedence::ExtraVars, &play.extra_vars)
            .flatten();

        let play_hosts = self.fixture.play_hosts(play_spec);
        let hostvars: serde_json::Map<String, JsonValue> = self
            .fixture
            .host_names()
            .into_iter()
            .map(|name| {
                let table = self.inventory_vars(&name).to_json();
                (name, table)
            })
            .collect();
        let short = host.split('.').next().unwrap_or(host);

        let mut merged = user_vars.clone();
        merged.set("inventory_hostname", json!(host));
        merged.set("inventory_hostname_short", json!(short));
        merged.set("ansible_play_name", json!(play.name));
        merged.set("ansible_play_hosts", json!(play_hosts));
        merged.set("ansible_play_batch", json!(play_hosts));
        merged.set("play_hosts", json!(play_hosts));
        merged.set("groups", self.groups_table());
        merged.set("group_names", json!(self.group_names(host)));
        merged.set("hostvars", JsonValue::Object(hostvars));
        merged.set("omit", json!(OMIT_PLACEHOLDER));
        merged.set("role_names", json!([]));
        merged.set("playbook_dir", json!(self.fixture.playbook_dir));
        merged.set("vars", user_vars.to_json());

        trace!(host = %host, task = %task, count = merged.len(), "Resolved variables");
        Ok(Some(merged))
    }

    fn list_hosts(&self) -> Result<Vec<String>> {
        Ok(self.fixture.host_names())
    }

    fn task_metadata(&self, task: &TaskId) -> Result<TaskMetadata> {
        let (_, spec) = self.locate(task)?;
        Ok(TaskMetadata {
            id: task.clone(),
            name: spec.name.clone(),
            arguments: spec.args.clone(),
            variables: spec.vars.clone(),
        })
    }
}

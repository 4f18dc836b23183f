//! Profile Variables Callback Plugin for Rustible
//!
//! Tracks the values of selected variables as a run progresses and prints
//! one JSON audit document when the run completes.
//!
//! # Recording Modes
//!
//! - [`RecordMode::Immediate`]: a record is taken each time a host is about
//!   to run a task. Only the variables named in `record_vars` are tracked.
//!   A name with no value is recorded as `"VARIABLE IS UNDEFINED"`.
//! - [`RecordMode::Boundary`]: a task is only known to be finished when the
//!   next one starts, so the previous task is snapshotted for every host
//!   at that point, and once more at run completion. Without `record_vars`
//!   the whole user-visible environment is recorded.
//!
//! Nothing is recorded unless `record_tasks` or `record_vars` is set.
//!
//! # Example Output
//!
//! ```text
//! [
//!     {
//!         "host": "hosta",
//!         "task": "Debug 1",
//!         "task_id": "0271cbca-edf7-66fa-7c0d-000000000004",
//!         "task_arguments": {
//!             "msg": "{{ var_on_play }}"
//!         },
//!         "task_variables": {},
//!         "tracked_variables": {
//!             "var_on_play": "hello play"
//!         }
//!     }
//! ]
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use profile_variables::callback::plugins::{ProfileVariablesCallbackBuilder, RecordMode};
//!
//! let recorder = ProfileVariablesCallbackBuilder::new(engine)
//!     .mode(RecordMode::Boundary)
//!     .sink(sink)
//!     .build();
//!
//! recorder.on_play_start(&play).await?;
//! recorder.on_task_start(&task_id, false).await?;
//! recorder.on_run_complete(&stats).await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::callback::config::ProfileVariablesConfig;
use crate::callback::emit::StdoutSink;
use crate::callback::filter::{FilterSet, PersistedFilters};
use crate::callback::types::{AuditLog, AuditRecord, UNDEFINED_SENTINEL};
use crate::error::{Error, Result};
use crate::traits::{
    AuditSink, ExecutionEngine, PlayContext, RunCallback, RunStats, TaskId, TaskMetadata,
};
use crate::vars::{SnapshotExtractor, Variables};

// ============================================================================
// Configuration
// ============================================================================

/// When snapshots are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// Record each host as it starts a task (default)
    #[default]
    Immediate,
    /// Record the previous task for all hosts when the next task starts
    Boundary,
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordMode::Immediate => write!(f, "immediate"),
            RecordMode::Boundary => write!(f, "boundary"),
        }
    }
}

impl FromStr for RecordMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(RecordMode::Immediate),
            "boundary" => Ok(RecordMode::Boundary),
            other => Err(format!(
                "unknown record mode '{}', expected 'immediate' or 'boundary'",
                other
            )),
        }
    }
}

// ============================================================================
// Internal State
// ============================================================================

/// The task believed to be executing (boundary mode only).
///
/// Carries the filters and play it started under, so a flush that happens
/// after the next play began still applies the right ones.
#[derive(Debug, Clone)]
pub struct PendingTask {
    /// Engine metadata for the task
    pub metadata: TaskMetadata,
    /// Play the task belongs to
    pub play: Arc<PlayContext>,
    /// Filters in force when the task started
    pub filters: Arc<FilterSet>,
    /// When the task-start event arrived
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Default)]
struct RecorderState {
    /// Current play, set at play start
    play: Option<Arc<PlayContext>>,
    /// Filters resolved for the current play
    filters: Arc<FilterSet>,
    /// Boundary mode: task awaiting its snapshot
    pending: Option<PendingTask>,
    /// Records accumulated over the whole run
    log: AuditLog,
    /// Whether the log was handed to the sink
    emitted: bool,
}

// ============================================================================
// Profile Variables Callback
// ============================================================================

/// Variable snapshot recorder.
///
/// One instance observes one run. The audit log and pending task persist
/// across plays; filters are re-resolved at every play start.
pub struct ProfileVariablesCallback {
    mode: RecordMode,
    persisted: PersistedFilters,
    engine: Arc<dyn ExecutionEngine>,
    sink: Arc<dyn AuditSink>,
    state: RwLock<RecorderState>,
}

impl ProfileVariablesCallback {
    /// Create a recorder in immediate mode with no persisted filters,
    /// printing to stdout.
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        ProfileVariablesCallbackBuilder::new(engine).build()
    }

    /// Create a recorder from a loaded configuration.
    pub fn with_config(
        config: &ProfileVariablesConfig,
        engine: Arc<dyn ExecutionEngine>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        ProfileVariablesCallbackBuilder::new(engine)
            .mode(config.mode())
            .persisted_filters(config.persisted_filters())
            .sink(sink)
            .build()
    }

    /// Recording mode.
    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    /// Filters resolved for the current play.
    pub fn filters(&self) -> FilterSet {
        self.state.read().filters.as_ref().clone()
    }

    /// Records accumulated so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.state.read().log.records().to_vec()
    }

    /// The task awaiting its boundary snapshot, if any.
    pub fn pending_task(&self) -> Option<PendingTask> {
        self.state.read().pending.clone()
    }

    /// Whether the audit document has been emitted.
    pub fn is_emitted(&self) -> bool {
        self.state.read().emitted
    }

    /// Immediate mode: record `host` at `task`.
    fn record_immediate(&self, state: &mut RecorderState, host: &str, task: &TaskId) -> Result<()> {
        let filters = Arc::clone(&state.filters);
        if filters.is_inactive() {
            return Ok(());
        }
        if !filters.allows_host(host) {
            debug!(host = %host, "Host excluded by record_hosts");
            return Ok(());
        }

        let metadata = self.engine.task_metadata(task)?;
        if !filters.allows_task(&metadata.name) {
            debug!(task = %metadata.name, "Task excluded by record_tasks");
            return Ok(());
        }

        let play = state
            .play
            .clone()
            .ok_or_else(|| Error::engine("runner started before any play"))?;

        let extractor = SnapshotExtractor::new(self.engine.as_ref());
        let Some(snapshot) = extractor.extract(&play, host, &metadata)? else {
            warn!(host = %host, task = %metadata.name, "Host no longer resolvable, skipping");
            return Ok(());
        };

        let tracked: Variables = filters
            .var_patterns
            .iter()
            .map(|name| {
                let value = snapshot
                    .lookup(name)
                    .cloned()
                    .unwrap_or_else(|| UNDEFINED_SENTINEL.into());
                (name.clone(), value)
            })
            .collect();

        debug!(host = %host, task = %metadata.name, tracked = tracked.len(), "Recorded");
        state.log.push(AuditRecord {
            host: host.to_string(),
            task: metadata.name,
            task_id: metadata.id,
            task_arguments: snapshot.task_arguments,
            task_variables: snapshot.task_variables,
            tracked_variables: tracked,
        });
        Ok(())
    }

    /// Boundary mode: snapshot a finished task for every passing host.
    ///
    /// Hosts come from the whole inventory, not just the hosts the play
    /// targeted, so a host that never ran the task is still recorded if it
    /// passes the host filter and has a non-empty environment. Narrow the
    /// output with `record_hosts`.
    fn flush(&self, state: &mut RecorderState, pending: PendingTask) -> Result<()> {
        let filters = &pending.filters;
        let name = &pending.metadata.name;

        if filters.is_inactive() {
            return Ok(());
        }
        if !filters.allows_task(name) {
            debug!(task = %name, "Task excluded by record_tasks");
            return Ok(());
        }

        let extractor = SnapshotExtractor::new(self.engine.as_ref());
        let mut recorded = 0;

        for host in self.engine.list_hosts()? {
            if !filters.allows_host(&host) {
                debug!(host = %host, "Host excluded by record_hosts");
                continue;
            }

            let Some(snapshot) = extractor.extract(&pending.play, &host, &pending.metadata)?
            else {
                warn!(host = %host, task = %name, "Host no longer resolvable, skipping");
                continue;
            };

            let mut environment = snapshot.environment;
            if !filters.var_patterns.is_empty() {
                environment.retain(|key| filters.tracks_variable(key));
            }
            if environment.is_empty() {
                debug!(host = %host, task = %name, "Nothing to record");
                continue;
            }

            state.log.push(AuditRecord {
                host,
                task: name.clone(),
                task_id: pending.metadata.id.clone(),
                task_arguments: snapshot.task_arguments,
                task_variables: snapshot.task_variables,
                tracked_variables: environment,
            });
            recorded += 1;
        }

        debug!(
            task = %name,
            hosts = recorded,
            started_at = %pending.started_at.format("%H:%M:%S%.3f"),
            "Flushed task"
        );
        Ok(())
    }

    /// Boundary mode: flush the pending task and make `task` the new one.
    fn task_boundary(&self, task: &TaskId) -> Result<()> {
        let mut state = self.state.write();

        let metadata = self.engine.task_metadata(task)?;
        if let Some(previous) = state.pending.take() {
            self.flush(&mut state, previous)?;
        }

        let play = state
            .play
            .clone()
            .ok_or_else(|| Error::engine("task started before any play"))?;
        state.pending = Some(PendingTask {
            metadata,
            play,
            filters: Arc::clone(&state.filters),
            started_at: Local::now(),
        });
        Ok(())
    }
}

impl fmt::Debug for ProfileVariablesCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileVariablesCallback")
            .field("mode", &self.mode)
            .field("persisted", &self.persisted)
            .field("engine", &self.engine)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RunCallback for ProfileVariablesCallback {
    async fn on_play_start(&self, play: &PlayContext) -> Result<()> {
        let filters = FilterSet::resolve(&play.extra_vars, &self.persisted);
        if filters.is_inactive() {
            info!("profile_variables: neither record_tasks nor record_vars is set, nothing will be recorded");
        }

        let mut state = self.state.write();
        state.play = Some(Arc::new(play.clone()));
        state.filters = Arc::new(filters);
        Ok(())
    }

    async fn on_task_start(&self, task: &TaskId, is_conditional: bool) -> Result<()> {
        debug!(task = %task, conditional = is_conditional, "Task start");
        match self.mode {
            RecordMode::Immediate => Ok(()),
            RecordMode::Boundary => self.task_boundary(task),
        }
    }

    async fn on_handler_task_start(&self, task: &TaskId) -> Result<()> {
        debug!(task = %task, "Handler task start");
        match self.mode {
            RecordMode::Immediate => Ok(()),
            RecordMode::Boundary => self.task_boundary(task),
        }
    }

    async fn on_runner_start(&self, host: &str, task: &TaskId) -> Result<()> {
        match self.mode {
            RecordMode::Immediate => {
                let mut state = self.state.write();
                self.record_immediate(&mut state, host, task)
            }
            RecordMode::Boundary => Ok(()),
        }
    }

    async fn on_run_complete(&self, stats: &RunStats) -> Result<()> {
        let mut state = self.state.write();

        if let Some(last) = state.pending.take() {
            self.flush(&mut state, last)?;
        }

        if state.emitted {
            warn!("profile_variables: run already completed, not emitting again");
            return Ok(());
        }

        info!(
            records = state.log.len(),
            hosts = stats.hosts.len(),
            tasks = stats.tasks,
            "Emitting variable audit"
        );
        self.sink.emit(state.log.records())?;
        state.emitted = true;
        Ok(())
    }
}

// ============================================================================
// Builder Pattern
// ============================================================================

/// Builder for creating ProfileVariablesCallback with custom configuration.
#[derive(Debug)]
pub struct ProfileVariablesCallbackBuilder {
    engine: Arc<dyn ExecutionEngine>,
    mode: RecordMode,
    persisted: PersistedFilters,
    sink: Option<Arc<dyn AuditSink>>,
}

impl ProfileVariablesCallbackBuilder {
    /// Create a new builder bound to an engine.
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            mode: RecordMode::default(),
            persisted: PersistedFilters::default(),
            sink: None,
        }
    }

    /// Set the recording mode.
    pub fn mode(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the persisted filter tier.
    pub fn persisted_filters(mut self, persisted: PersistedFilters) -> Self {
        self.persisted = persisted;
        self
    }

    /// Set the sink the audit document is written to.
    pub fn sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the ProfileVariablesCallback.
    pub fn build(self) -> ProfileVariablesCallback {
        ProfileVariablesCallback {
            mode: self.mode,
            persisted: self.persisted,
            engine: self.engine,
            sink: self.sink.unwrap_or_else(|| Arc::new(StdoutSink)),
            state: RwLock::new(RecorderState::default()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::emit::MemorySink;
    use crate::callback::filter::FilterValue;
    use indexmap::IndexMap;
    use serde_json::json;

    /// Engine with fixed per-host tables and a fact that appears after a
    /// chosen task has run.
    #[derive(Debug, Default)]
    struct ScriptedEngine {
        hosts: Vec<String>,
        tasks: IndexMap<TaskId, TaskMetadata>,
        tables: RwLock<IndexMap<String, Variables>>,
        fail_listing: bool,
    }

    impl ScriptedEngine {
        fn two_hosts() -> Self {
            let mut tasks = IndexMap::new();
            for (id, name) in [("t1", "Debug 1"), ("t2", "Instantiate another value"), ("t3", "Setup")] {
                tasks.insert(
                    TaskId::from(id),
                    TaskMetadata {
                        id: TaskId::from(id),
                        name: name.to_string(),
                        arguments: vars(json!({"msg": "hi"})),
                        variables: Variables::new(),
                    },
                );
            }

            let mut tables = IndexMap::new();
            for host in ["hosta", "hostb"] {
                tables.insert(
                    host.to_string(),
                    vars(json!({
                        "var_on_play": "hello play",
                        "zero": 0,
                        "inventory_hostname": host,
                        "ansible_play_hosts": ["hosta", "hostb"],
                        "hostvars": {host: {"host_only": host}},
                        "groups": {"all": ["hosta", "hostb"]},
                    })),
                );
            }

            Self {
                hosts: vec!["hosta".to_string(), "hostb".to_string()],
                tasks,
                tables: RwLock::new(tables),
                fail_listing: false,
            }
        }

        fn set_fact(&self, host: &str, key: &str, value: serde_json::Value) {
            if let Some(table) = self.tables.write().get_mut(host) {
                table.set(key, value);
            }
        }

        fn remove_host(&self, host: &str) {
            self.tables.write().shift_remove(host);
        }
    }

    impl ExecutionEngine for ScriptedEngine {
        fn resolve_variables(
            &self,
            _play: &PlayContext,
            host: &str,
            _task: &TaskId,
        ) -> Result<Option<Variables>> {
            Ok(self.tables.read().get(host).cloned())
        }

        fn list_hosts(&self) -> Result<Vec<String>> {
            if self.fail_listing {
                return Err(Error::InventoryUnavailable("inventory gone".to_string()));
            }
            Ok(self.hosts.clone())
        }

        fn task_metadata(&self, task: &TaskId) -> Result<TaskMetadata> {
            self.tasks
                .get(task)
                .cloned()
                .ok_or_else(|| Error::TaskNotFound(task.to_string()))
        }
    }

    fn vars(value: serde_json::Value) -> Variables {
        serde_json::from_value(value).unwrap()
    }

    fn recorder(
        engine: Arc<ScriptedEngine>,
        mode: RecordMode,
        persisted: PersistedFilters,
    ) -> (ProfileVariablesCallback, MemorySink) {
        let sink = MemorySink::new();
        let cb = ProfileVariablesCallbackBuilder::new(engine)
            .mode(mode)
            .persisted_filters(persisted)
            .sink(Arc::new(sink.clone()))
            .build();
        (cb, sink)
    }

    fn play_with(extra: serde_json::Value) -> PlayContext {
        PlayContext::new("test play").with_extra_vars(vars(extra))
    }

    async fn run_tasks(cb: &ProfileVariablesCallback, engine: &ScriptedEngine, tasks: &[&str]) {
        for task in tasks {
            let id = TaskId::from(*task);
            cb.on_task_start(&id, false).await.unwrap();
            for host in &engine.hosts {
                cb.on_runner_start(host, &id).await.unwrap();
            }
        }
    }

    #[test]
    fn test_record_mode_parse_and_display() {
        assert_eq!("immediate".parse::<RecordMode>().unwrap(), RecordMode::Immediate);
        assert_eq!("Boundary".parse::<RecordMode>().unwrap(), RecordMode::Boundary);
        assert!("sometimes".parse::<RecordMode>().is_err());
        assert_eq!(RecordMode::Boundary.to_string(), "boundary");
        assert_eq!(
            serde_json::to_value(RecordMode::Immediate).unwrap(),
            json!("immediate")
        );
    }

    #[tokio::test]
    async fn test_inactive_by_default() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        for mode in [RecordMode::Immediate, RecordMode::Boundary] {
            let (cb, sink) = recorder(engine.clone(), mode, PersistedFilters::default());
            cb.on_play_start(&play_with(json!({}))).await.unwrap();
            run_tasks(&cb, &engine, &["t1", "t2", "t3"]).await;
            cb.on_run_complete(&RunStats::default()).await.unwrap();

            assert!(sink.records().is_empty(), "{mode}");
            assert_eq!(sink.documents(), vec!["[]".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_immediate_records_tracked_variables() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Immediate, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({
            "profile_variables_record_vars": "var_on_play",
            "profile_variables_record_tasks": "Debug",
        })))
        .await
        .unwrap();
        run_tasks(&cb, &engine, &["t1", "t2"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].host, "hosta");
        assert_eq!(records[1].host, "hostb");
        for record in &records {
            assert_eq!(record.task, "Debug 1");
            assert_eq!(record.task_id, TaskId::from("t1"));
            assert_eq!(record.tracked_variables, vars(json!({"var_on_play": "hello play"})));
        }
    }

    #[tokio::test]
    async fn test_immediate_sentinel_and_falsy_values() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(
            engine.clone(),
            RecordMode::Immediate,
            PersistedFilters {
                record_vars: FilterValue::from("missing:zero:host_only"),
                ..Default::default()
            },
        );

        cb.on_play_start(&play_with(json!({}))).await.unwrap();
        run_tasks(&cb, &engine, &["t3"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].tracked_variables,
            vars(json!({
                "missing": "VARIABLE IS UNDEFINED",
                "zero": 0,
                "host_only": "hostb",
            }))
        );
    }

    #[tokio::test]
    async fn test_immediate_host_filter() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Immediate, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({
            "profile_variables_record_vars": ["var_on_play"],
            "profile_variables_record_hosts": "hosta",
        })))
        .await
        .unwrap();
        run_tasks(&cb, &engine, &["t1", "t2"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.host == "hosta"));
    }

    #[tokio::test]
    async fn test_immediate_skips_unresolvable_host() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        engine.remove_host("hostb");
        let (cb, sink) = recorder(engine.clone(), RecordMode::Immediate, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_vars": "var_on_play"})))
            .await
            .unwrap();
        run_tasks(&cb, &engine, &["t1"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let hosts: Vec<_> = sink.records().into_iter().map(|r| r.host).collect();
        assert_eq!(hosts, vec!["hosta"]);
    }

    #[tokio::test]
    async fn test_boundary_snapshots_previous_task() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_tasks": "Instantiate"})))
            .await
            .unwrap();

        cb.on_task_start(&TaskId::from("t2"), false).await.unwrap();
        assert!(cb.records().is_empty());
        assert_eq!(cb.pending_task().unwrap().metadata.name, "Instantiate another value");

        // The fact set by t2 is visible once t3 starts
        engine.set_fact("hosta", "var_set_during_play", json!("set"));
        cb.on_task_start(&TaskId::from("t3"), false).await.unwrap();

        let records = cb.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task, "Instantiate another value");
        assert_eq!(
            records[0].tracked_variables.get("var_set_during_play"),
            Some(&json!("set"))
        );
        assert!(records[1].tracked_variables.get("var_set_during_play").is_none());
        for record in &records {
            assert!(record.tracked_variables.keys().all(|k| !k.starts_with("ansible_")
                && !k.starts_with("inventory_")
                && k != "hostvars"
                && k != "groups"));
        }

        // Setup does not match the task filter
        cb.on_run_complete(&RunStats::default()).await.unwrap();
        assert_eq!(sink.records().len(), 2);
        assert!(cb.pending_task().is_none());
    }

    #[tokio::test]
    async fn test_boundary_variable_filter_is_exact() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({
            "profile_variables_record_vars": "var_on_play:var_on",
            "profile_variables_record_hosts": ["hostb"],
        })))
        .await
        .unwrap();
        run_tasks(&cb, &engine, &["t1"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host, "hostb");
        assert_eq!(records[0].tracked_variables, vars(json!({"var_on_play": "hello play"})));
    }

    #[tokio::test]
    async fn test_boundary_drops_hosts_with_empty_environment() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        engine.set_fact("hosta", "only_on_a", json!(true));
        let (cb, sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_vars": "only_on_a"})))
            .await
            .unwrap();
        run_tasks(&cb, &engine, &["t1"]).await;
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let hosts: Vec<_> = sink.records().into_iter().map(|r| r.host).collect();
        assert_eq!(hosts, vec!["hosta"]);
    }

    #[tokio::test]
    async fn test_boundary_filters_follow_their_play() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_vars": "var_on_play"})))
            .await
            .unwrap();
        cb.on_task_start(&TaskId::from("t1"), false).await.unwrap();

        // Second play records nothing, but t1 still flushes with play one's filters
        cb.on_play_start(&play_with(json!({}))).await.unwrap();
        cb.on_task_start(&TaskId::from("t2"), false).await.unwrap();
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.task == "Debug 1"));
    }

    #[tokio::test]
    async fn test_handler_start_is_a_boundary() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, _sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_tasks": "Debug"})))
            .await
            .unwrap();
        cb.on_task_start(&TaskId::from("t1"), false).await.unwrap();
        cb.on_handler_task_start(&TaskId::from("t3")).await.unwrap();

        assert_eq!(cb.records().len(), 2);
        assert_eq!(cb.pending_task().unwrap().metadata.id, TaskId::from("t3"));
    }

    #[tokio::test]
    async fn test_engine_failure_is_fatal() {
        let mut engine = ScriptedEngine::two_hosts();
        engine.fail_listing = true;
        let engine = Arc::new(engine);
        let (cb, sink) = recorder(engine.clone(), RecordMode::Boundary, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_vars": "var_on_play"})))
            .await
            .unwrap();
        cb.on_task_start(&TaskId::from("t1"), false).await.unwrap();
        let result = cb.on_task_start(&TaskId::from("t2"), false).await;

        assert!(matches!(result, Err(Error::InventoryUnavailable(_))));
        assert_eq!(sink.emit_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_task_is_fatal() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, _sink) = recorder(engine.clone(), RecordMode::Immediate, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({"profile_variables_record_vars": "x"})))
            .await
            .unwrap();
        let result = cb.on_runner_start("hosta", &TaskId::from("nope")).await;
        assert!(matches!(result, Err(Error::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_emits_exactly_once() {
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let (cb, sink) = recorder(engine.clone(), RecordMode::Immediate, PersistedFilters::default());

        cb.on_play_start(&play_with(json!({}))).await.unwrap();
        cb.on_run_complete(&RunStats::default()).await.unwrap();
        cb.on_run_complete(&RunStats::default()).await.unwrap();

        assert!(cb.is_emitted());
        assert_eq!(sink.emit_count(), 1);
    }

    #[test]
    fn test_with_config() {
        let config = ProfileVariablesConfig {
            record_vars: Some(json!("a:b")),
            mode: Some(RecordMode::Boundary),
            ..Default::default()
        };
        let engine = Arc::new(ScriptedEngine::two_hosts());
        let cb = ProfileVariablesCallback::with_config(&config, engine, Arc::new(MemorySink::new()));
        assert_eq!(cb.mode(), RecordMode::Boundary);
        assert_eq!(cb.persisted.record_vars, FilterValue::Text("a:b".to_string()));
        assert!(cb.filters().is_inactive());
    }
}

//! Shared test utilities and fixtures for the profile_variables test suite.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use profile_variables::callback::{
    AuditRecord, MemorySink, PersistedFilters, ProfileVariablesCallback,
    ProfileVariablesCallbackBuilder, RecordMode,
};
use profile_variables::replay::{replay, RunFixture, StaticEngine};
use profile_variables::vars::Variables;

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a fixture from `tests/fixtures`.
pub fn load_fixture(name: &str) -> RunFixture {
    RunFixture::from_file(fixture_path(name)).expect("fixture should load")
}

/// Build [`Variables`] from a JSON object literal.
pub fn vars(value: serde_json::Value) -> Variables {
    serde_json::from_value(value).expect("expected a JSON object")
}

/// Everything a replay produced.
pub struct RunOutput {
    pub recorder: ProfileVariablesCallback,
    pub sink: MemorySink,
    pub engine: Arc<StaticEngine>,
}

impl RunOutput {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.sink.records()
    }

    /// The single emitted document.
    pub fn document(&self) -> String {
        let documents = self.sink.documents();
        assert_eq!(documents.len(), 1, "expected exactly one emitted document");
        documents[0].clone()
    }

    /// (host, task) pairs in record order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.records()
            .into_iter()
            .map(|r| (r.host, r.task))
            .collect()
    }
}

/// Fluent builder for replaying a fixture through a recorder.
pub struct RunBuilder {
    fixture: RunFixture,
    mode: RecordMode,
    persisted: PersistedFilters,
    extra_vars: Variables,
    unreachable: Vec<String>,
}

impl RunBuilder {
    pub fn new(fixture: RunFixture) -> Self {
        Self {
            fixture,
            mode: RecordMode::Immediate,
            persisted: PersistedFilters::default(),
            extra_vars: Variables::new(),
            unreachable: Vec::new(),
        }
    }

    pub fn fixture(name: &str) -> Self {
        Self::new(load_fixture(name))
    }

    pub fn mode(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn persisted(mut self, persisted: PersistedFilters) -> Self {
        self.persisted = persisted;
        self
    }

    /// Add an extra var, as `-e key=value` would.
    pub fn extra_var(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra_vars.set(key, value);
        self
    }

    pub fn unreachable(mut self, host: &str) -> Self {
        self.unreachable.push(host.to_string());
        self
    }

    pub async fn run(self) -> RunOutput {
        let engine = Arc::new(StaticEngine::new(self.fixture).with_extra_vars(self.extra_vars));
        for host in &self.unreachable {
            engine.mark_unreachable(host);
        }

        let sink = MemorySink::new();
        let recorder = ProfileVariablesCallbackBuilder::new(engine.clone())
            .mode(self.mode)
            .persisted_filters(self.persisted)
            .sink(Arc::new(sink.clone()))
            .build();

        replay(&engine, &recorder).await.expect("replay should succeed");
        RunOutput {
            recorder,
            sink,
            engine,
        }
    }
}

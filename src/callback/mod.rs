//! Callback infrastructure for variable auditing.
//!
//! # Architecture
//!
//! 1. **[`filter`]**: Matcher, [`FilterValue`] and the per-play [`FilterSet`]
//! 2. **[`config`]**: Persisted settings (files and environment)
//! 3. **[`plugins`]**: The [`ProfileVariablesCallback`] recorder
//! 4. **[`emit`]**: Rendering the audit log and the sinks it goes to
//!
//! Variable extraction lives in [`crate::vars::snapshot`].
//!
//! # Quick Start with Prelude
//!
//! ```rust,ignore
//! use profile_variables::callback::prelude::*;
//!
//! let config = ProfileVariablesConfigLoader::new().load()?;
//! let sink = sink_for_output(config.output())?;
//! let recorder = ProfileVariablesCallback::with_config(&config, engine, sink);
//! ```

pub mod config;
pub mod emit;
pub mod filter;
pub mod plugins;
pub mod types;

pub use config::{ProfileVariablesConfig, ProfileVariablesConfigLoader};
pub use emit::{render, sink_for_output, MemorySink, StdoutSink, WriterSink};
pub use filter::{
    matches, parse_filter_string, EmptyPatterns, FilterDimension, FilterSet, FilterValue,
    PersistedFilters,
};
pub use plugins::{
    PendingTask, ProfileVariablesCallback, ProfileVariablesCallbackBuilder, RecordMode,
};
pub use types::{AuditLog, AuditRecord, UNDEFINED_SENTINEL};

/// Convenient re-exports for building and driving a recorder.
pub mod prelude {
    pub use crate::traits::{AuditSink, ExecutionEngine, PlayContext, RunCallback, RunStats, TaskId};

    pub use super::config::{ProfileVariablesConfig, ProfileVariablesConfigLoader};
    pub use super::emit::{sink_for_output, MemorySink, StdoutSink, WriterSink};
    pub use super::filter::{FilterSet, FilterValue, PersistedFilters};
    pub use super::plugins::{ProfileVariablesCallback, ProfileVariablesCallbackBuilder, RecordMode};
    pub use super::types::{AuditLog, AuditRecord};
}

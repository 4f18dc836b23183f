//! # profile_variables - Variable Audit Recording for Rustible Runs
//!
//! Observes the ordered lifecycle events of a run (plays, tasks, handlers,
//! per-host runner starts) and records the variables selected hosts see at
//! selected tasks. The audit trail is emitted once, as a pretty-printed JSON
//! array, when the run completes.
//!
//! ## Core Concepts
//!
//! - **Filters**: task names (substring), variable names (exact) and host
//!   names (exact), given per run through extra vars or persistently
//!   through configuration
//! - **Snapshots**: the merged variable table for a host at a task, with
//!   engine bookkeeping stripped
//! - **Recording modes**: `immediate` records as each host starts a task,
//!   `boundary` records a task once the next one starts
//! - **Engine**: the narrow [`ExecutionEngine`](traits::ExecutionEngine)
//!   contract the recorder queries
//!
//! ## Architecture Overview
//!
//! ```text
//!   lifecycle events                     engine queries
//!  ─────────────────▶ ProfileVariables ─────────────────▶ ExecutionEngine
//!   (RunCallback)        Callback        (resolve vars,    (live engine or
//!                           │             list hosts,       replay::StaticEngine)
//!                           │             task metadata)
//!              FilterSet ◀──┤
//!              Snapshot  ◀──┤
//!                           ▼
//!                       AuditLog ──▶ AuditSink (stdout, file, memory)
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use profile_variables::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let fixture = RunFixture::from_file("run.yml")?;
//!     let engine = Arc::new(StaticEngine::new(fixture));
//!
//!     let recorder = ProfileVariablesCallbackBuilder::new(engine.clone())
//!         .mode(RecordMode::Immediate)
//!         .build();
//!
//!     replay(&engine, &recorder).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    //!
    //! See [`callback::prelude`] for the callback-only subset.
    //!
    //! [`callback::prelude`]: crate::callback::prelude

    // Core traits and identifiers
    pub use crate::traits::{
        AuditSink, ExecutionEngine, PlayContext, RunCallback, RunStats, TaskId, TaskMetadata,
    };

    // Recorder
    pub use crate::callback::prelude::*;
    pub use crate::callback::types::UNDEFINED_SENTINEL;

    // Variables
    pub use crate::vars::{SnapshotExtractor, VariableSnapshot, Variables};

    // Replay
    pub use crate::replay::{replay, RunFixture, StaticEngine};

    // Errors
    pub use crate::error::{Error, Result};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and result aliases
pub mod error;

/// Engine, callback and sink traits
pub mod traits;

/// Variable environments and snapshot extraction
pub mod vars;

// ============================================================================
// Recording
// ============================================================================

/// Filters, configuration, the recorder plugin and emission
pub mod callback;

// ============================================================================
// Replay
// ============================================================================

/// Run fixtures and the in-memory engine
pub mod replay;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

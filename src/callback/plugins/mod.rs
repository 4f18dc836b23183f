//! Callback plugins built on the [`RunCallback`](crate::traits::RunCallback) event stream.
//!
//! # Available Plugins
//!
//! - [`ProfileVariablesCallback`] - Records selected variables per host and
//!   task, printed as one JSON document when the run completes
//!
//! # Example
//!
//! ```rust,ignore
//! use profile_variables::callback::plugins::{ProfileVariablesCallback, RecordMode};
//!
//! let recorder = ProfileVariablesCallback::with_config(&config, engine, sink);
//! assert_eq!(recorder.mode(), RecordMode::Immediate);
//! ```

pub mod profile_variables;

pub use profile_variables::{
    PendingTask, ProfileVariablesCallback, ProfileVariablesCallbackBuilder, RecordMode,
};

//! # flagbridge-task
//!
//! Process supervision for flagbridge.
//! Runs the external provisioning tool and reports completion asynchronously.
//!
//! ## Features
//!
//! - Executable resolution with ordered fallbacks
//! - Typed tool operations (`config`, `extensions`, `passwd`, ...)
//! - **Real-time output streaming** into an explicit `OutputLog`
//! - **Exactly-once completion** via `RunHandle` or an `FnOnce` callback

pub mod executor;
pub mod log;
pub mod operation;

// Execution
pub use executor::{
    Completion, ExecutableResolver, FallbackScript, OutputLine, ProcessResult, ProcessRunner,
    ResolutionSource, ResolvedCommand, RunHandle, Stream,
};

// Operations
pub use operation::{ConfigSelection, ProfileIdentity, RunContext, Scope, ToolOperation};

// Log system
pub use log::{LogEntry, LogLevel, OutputLog};

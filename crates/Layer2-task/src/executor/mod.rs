//! Tool execution
//!
//! - `ExecutableResolver` - finds the external tool (explicit / candidates / PATH / fallback)
//! - `ProcessRunner` - spawns it, streams output, resolves a single `Completion`

pub mod resolve;
pub mod runner;

pub use resolve::{ExecutableResolver, FallbackScript, ResolutionSource, ResolvedCommand};
pub use runner::{Completion, OutputLine, ProcessResult, ProcessRunner, RunHandle, Stream};

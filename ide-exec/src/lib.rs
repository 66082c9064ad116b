//! # Cloud IDE execution backend
//!
//! Runs user-submitted Python code against a local interpreter, one scratch
//! file and one process per request, and provides the in-memory storage the
//! HTTP layer keeps users, files, collaborators and execution logs in.

mod config;
mod error;
mod executor;
mod interpreter;
mod sandbox;
mod service;
pub mod storage;
mod types;

#[cfg(test)]
mod tests;

pub use config::{ExecConfig, DEFAULT_SCRATCH_DIR, DEFAULT_TIMEOUT_SECS};
pub use error::Error;
pub use executor::CodeExecutor;
pub use interpreter::Interpreter;
pub use sandbox::{ProcessOutput, ProcessRunner, ScratchDir, ScriptFile};
pub use service::CodeExecutionService;
pub use types::{ExecutionRequest, ExecutionResult, ExecutionStatus, ResourceLimits, SuccessPolicy};

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;

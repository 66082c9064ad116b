//! Execution configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    error::Error,
    interpreter::Interpreter,
    types::{ResourceLimits, SuccessPolicy},
};

pub const DEFAULT_SCRATCH_DIR: &str = "temp_python_executions";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Directory that receives the per-request script files.
    /// Relative paths resolve against the working directory of the process.
    pub scratch_dir: PathBuf,
    pub interpreter: Interpreter,
    /// Wall-clock bound for a single run
    pub timeout_secs: u64,
    /// Admission limit for simultaneous runs, unlimited when absent
    pub max_concurrent: Option<usize>,
    pub success_policy: SuccessPolicy,
    pub limits: ResourceLimits,
    /// Extra environment variables passed to the interpreter
    pub env: HashMap<String, String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            interpreter: Interpreter::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: None,
            success_policy: SuccessPolicy::default(),
            limits: ResourceLimits::default(),
            env: HashMap::new(),
        }
    }
}

impl ExecConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: ExecConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.max_concurrent == Some(0) {
            return Err(Error::Config("max_concurrent must be at least 1".to_string()));
        }
        if self.interpreter.command.trim().is_empty() {
            return Err(Error::Config("interpreter command is empty".to_string()));
        }
        Ok(())
    }
}

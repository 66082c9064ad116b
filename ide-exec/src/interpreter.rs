//! Interpreter selection and lookup

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;
use which::which;

use crate::error::Error;

/// The external program the scratch file is handed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpreter {
    /// Program name looked up on `PATH`, or a path to it
    pub command: String,
    /// Arguments placed before the script path
    pub args: Vec<String>,
    /// Extension given to scratch files
    pub extension: String,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::python()
    }
}

impl Interpreter {
    pub fn python() -> Self {
        let command = if cfg!(windows) { "python" } else { "python3" };
        Self::with_command(command)
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            extension: "py".to_string(),
        }
    }

    /// Resolve the command to an executable path.
    pub fn resolve(&self) -> Result<PathBuf, Error> {
        let path = which(&self.command)
            .map_err(|_| Error::InterpreterNotFound(self.command.clone()))?;
        debug!("Resolved interpreter {} to {}", self.command, path.display());
        Ok(path)
    }

    pub fn is_available(&self) -> bool {
        which(&self.command).is_ok()
    }

    /// Full argument list for running `script`.
    pub fn command_args(&self, script: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(script.as_os_str().to_owned()))
            .collect()
    }
}

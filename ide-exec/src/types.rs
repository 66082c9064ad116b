use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Code execution request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Source code to execute
    pub code: String,
    /// Identity of the caller, used to attribute the execution log
    #[serde(default)]
    pub user_id: Option<String>,
    /// File the code was taken from, if any
    #[serde(default)]
    pub file_id: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
    SystemError,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::SystemError => "system_error",
        };
        f.write_str(s)
    }
}

/// Execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Program output (stdout), partial when the run timed out
    pub stdout: String,
    /// Program errors (stderr)
    pub stderr: String,
    /// Text reported to the caller as the error, `None` when there is nothing to report
    pub error: Option<String>,
    /// Exit code, `None` if the process was killed or never started
    pub exit_code: Option<i32>,
    #[serde(with = "duration_serde")]
    pub execution_time: Duration,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub(crate) fn system_error(message: String) -> Self {
        Self {
            status: ExecutionStatus::SystemError,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(message),
            exit_code: None,
            execution_time: Duration::ZERO,
        }
    }
}

/// How a finished run is classified as success or failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessPolicy {
    /// Exit status zero and no timeout. Stderr is still reported.
    #[default]
    ExitStatus,
    /// Exit status zero, no timeout and nothing written to stderr.
    EmptyStderr,
}

impl FromStr for SuccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exit-status" => Ok(SuccessPolicy::ExitStatus),
            "empty-stderr" => Ok(SuccessPolicy::EmptyStderr),
            _ => Err(format!("Unknown success policy: {}", s)),
        }
    }
}

/// Resource limits for code execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum CPU time (seconds), enforced with RLIMIT_CPU on Linux
    pub cpu_time: Option<u64>,
    /// Maximum size of any file the program writes (bytes), RLIMIT_FSIZE on Linux
    pub file_size: Option<u64>,
    /// Captured bytes kept per output stream
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_time: None,
            file_size: Some(10 * 1024 * 1024), // 10MB
            max_output_bytes: 1024 * 1024,     // 1MB
        }
    }
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

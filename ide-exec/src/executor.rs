use tracing::{debug, info, warn};

use crate::{
    config::ExecConfig,
    error::Error,
    interpreter::Interpreter,
    sandbox::{ProcessOutput, ProcessRunner, ScratchDir},
    types::{ExecutionRequest, ExecutionResult, ExecutionStatus, SuccessPolicy},
};

/// Runs one request: scratch file, interpreter, classification.
pub struct CodeExecutor {
    config: ExecConfig,
    runner: ProcessRunner,
}

impl CodeExecutor {
    pub fn new(config: ExecConfig) -> Result<Self, Error> {
        config.validate()?;
        let runner = ProcessRunner::new(config.timeout(), config.limits.clone())
            .with_env(config.env.clone());
        Ok(Self { config, runner })
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.config.interpreter
    }

    /// Execute the request's code.
    ///
    /// Failures of the program itself (non-zero exit, timeout, missing
    /// interpreter) come back as an `Ok` result with a non-success status.
    /// `Err` is reserved for bad input and scratch file I/O.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, Error> {
        if request.code.is_empty() {
            return Err(Error::EmptyCode);
        }

        let scratch = ScratchDir::open(&self.config.scratch_dir).await?;
        let script = scratch
            .write_script(&request.code, &self.config.interpreter.extension)
            .await?;

        let program = match self.config.interpreter.resolve() {
            Ok(program) => program,
            Err(e) => {
                warn!("{}", e);
                return Ok(ExecutionResult::system_error(e.to_string()));
            }
        };

        info!("Executing: {}", script.path().display());
        let args = self.config.interpreter.command_args(script.path());
        let output = match self.runner.run(&program, &args, scratch.path()).await {
            Ok(output) => output,
            Err(e @ (Error::Spawn(_) | Error::Process(_))) => {
                warn!("Python execution error: {}", e);
                return Ok(ExecutionResult::system_error(e.to_string()));
            }
            Err(e) => return Err(e),
        };
        debug!(
            exit_code = ?output.exit_code,
            signal = ?output.signal,
            timed_out = output.timed_out,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "Process finished"
        );

        Ok(self.classify(output))
    }

    fn classify(&self, output: ProcessOutput) -> ExecutionResult {
        let status = classify_status(&output, self.config.success_policy);
        let error = error_text(&output, status, self.runner.timeout().as_secs());

        ExecutionResult {
            status,
            error,
            exit_code: output.exit_code,
            execution_time: output.elapsed,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

fn classify_status(output: &ProcessOutput, policy: SuccessPolicy) -> ExecutionStatus {
    if output.timed_out {
        return ExecutionStatus::Timeout;
    }
    if !output.exited_cleanly() {
        return ExecutionStatus::Error;
    }
    match policy {
        SuccessPolicy::ExitStatus => ExecutionStatus::Success,
        SuccessPolicy::EmptyStderr if output.stderr.is_empty() => ExecutionStatus::Success,
        SuccessPolicy::EmptyStderr => ExecutionStatus::Error,
    }
}

fn error_text(output: &ProcessOutput, status: ExecutionStatus, timeout_secs: u64) -> Option<String> {
    let stderr = (!output.stderr.is_empty()).then(|| output.stderr.clone());
    match status {
        ExecutionStatus::Timeout => {
            let mut message = format!("Execution timed out after {} seconds", timeout_secs);
            if let Some(stderr) = stderr {
                message.push('\n');
                message.push_str(&stderr);
            }
            Some(message)
        }
        ExecutionStatus::Success => stderr,
        ExecutionStatus::Error | ExecutionStatus::SystemError => stderr.or_else(|| {
            Some(match (output.exit_code, output.signal) {
                (Some(code), _) => format!("Process exited with status {}", code),
                (None, Some(signal)) => format!("Process terminated by signal {}", signal),
                (None, None) => "Execution error occurred".to_string(),
            })
        }),
    }
}

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time::{self, Duration},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::Error, types::ResourceLimits};

/// Variables copied from the server environment into the child's.
const PASSTHROUGH_ENV: &[&str] = &["PATH", "HOME", "LANG", "SYSTEMROOT", "TMPDIR", "TEMP", "TMP"];

/// How long output pipes may stay open after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Directory holding the per-request script files.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Open the scratch directory, creating it if needed. The stored root is
    /// absolute, since children run with the scratch directory as their cwd.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        let root = fs::canonicalize(&root).await?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `code` to a uniquely named file. The file is removed when the
    /// returned guard is dropped.
    pub async fn write_script(&self, code: &str, extension: &str) -> Result<ScriptFile, Error> {
        let path = self.root.join(format!("{}.{}", Uuid::new_v4(), extension));
        let script = ScriptFile { path };

        fs::write(&script.path, code).await?;

        if !fs::try_exists(&script.path).await.unwrap_or(false) {
            return Err(Error::ScriptMissing(script.path.clone()));
        }

        Ok(script)
    }
}

/// A script file that deletes itself on drop.
#[derive(Debug)]
pub struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed script file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Error cleaning up temp file {}: {}", self.path.display(), e),
        }
    }
}

/// Captured result of one child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Terminating signal on unix
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Spawns a program with a wall-clock bound and captures its output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    limits: ResourceLimits,
    env: HashMap<String, String>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, limits: ResourceLimits) -> Self {
        Self {
            timeout,
            limits,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
    ) -> Result<ProcessOutput, Error> {
        let start = Instant::now();

        debug!("Sandbox run - Program: {}", program.display());
        debug!("Sandbox run - Args: {:?}", args);
        debug!("Sandbox run - Cwd: {}", cwd.display());

        let mut command = Command::new(program);
        command.args(args).current_dir(cwd).env_clear();
        for key in PASSTHROUGH_ENV {
            if let Some(value) = std::env::var_os(key) {
                command.env(key, value);
            }
        }
        command
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(target_os = "linux")]
        self.apply_limits(&mut command);

        let mut child = command
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", program.display(), e)))?;

        let stdout = Capture::new(self.limits.max_output_bytes);
        let stderr = Capture::new(self.limits.max_output_bytes);
        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(out, stdout.clone())));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(err, stderr.clone())));
        }

        let (status, timed_out) = match time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(e)) => return Err(Error::Process(e.to_string())),
            Err(_) => {
                warn!(
                    pid = ?child.id(),
                    "Execution timed out after {}s, killing process",
                    self.timeout.as_secs()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out process: {}", e);
                }
                (None, true)
            }
        };

        for mut pump in pumps {
            if time::timeout(DRAIN_GRACE, &mut pump).await.is_err() {
                debug!("Output pipe still open after exit, abandoning it");
                pump.abort();
            }
        }

        Ok(ProcessOutput {
            stdout: stdout.take_string(),
            stderr: stderr.take_string(),
            exit_code: status.and_then(|s| s.code()),
            signal: status.and_then(exit_signal),
            timed_out,
            elapsed: start.elapsed(),
        })
    }

    #[cfg(target_os = "linux")]
    fn apply_limits(&self, command: &mut Command) {
        use nix::libc::rlim_t;
        use nix::sys::resource::{setrlimit, Resource};

        let cpu_time = self.limits.cpu_time;
        let file_size = self.limits.file_size;
        if cpu_time.is_none() && file_size.is_none() {
            return;
        }

        // SAFETY: the hook only calls setrlimit, which is async-signal-safe.
        unsafe {
            command.pre_exec(move || {
                if let Some(secs) = cpu_time {
                    setrlimit(Resource::RLIMIT_CPU, secs as rlim_t, secs as rlim_t)
                        .map_err(std::io::Error::from)?;
                }
                if let Some(bytes) = file_size {
                    setrlimit(Resource::RLIMIT_FSIZE, bytes as rlim_t, bytes as rlim_t)
                        .map_err(std::io::Error::from)?;
                }
                Ok(())
            });
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Default)]
struct CaptureBuffer {
    data: Vec<u8>,
    truncated: bool,
}

/// Bounded output buffer shared between a pump task and the runner.
#[derive(Debug, Clone)]
struct Capture {
    inner: Arc<Mutex<CaptureBuffer>>,
    limit: usize,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureBuffer::default())),
            limit,
        }
    }

    fn push(&self, chunk: &[u8]) {
        let mut buffer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let room = self.limit.saturating_sub(buffer.data.len());
        let take = room.min(chunk.len());
        buffer.data.extend_from_slice(&chunk[..take]);
        if take < chunk.len() && !buffer.truncated {
            buffer.truncated = true;
            let keep = utf8_prefix_len(&buffer.data);
            buffer.data.truncate(keep);
        }
    }

    fn take_string(&self) -> String {
        let mut buffer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let data = std::mem::take(&mut buffer.data);
        let mut text = String::from_utf8_lossy(&data).into_owned();
        if buffer.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Length of `data` without a trailing incomplete UTF-8 sequence.
fn utf8_prefix_len(data: &[u8]) -> usize {
    let tail = data.len().saturating_sub(3);
    for i in (tail..data.len()).rev() {
        let byte = data[i];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if i + width > data.len() { i } else { data.len() };
    }
    data.len()
}

async fn pump<R>(mut reader: R, capture: Capture)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => capture.push(&chunk[..n]),
            Err(e) => {
                debug!("Output stream closed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_truncates() {
        let capture = Capture::new(4);
        capture.push(b"ab");
        capture.push(b"cdef");
        assert_eq!(capture.take_string(), format!("abcd{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_capture_truncates_on_char_boundary() {
        let capture = Capture::new(4);
        capture.push("abcé".as_bytes());
        assert_eq!(capture.take_string(), format!("abc{}", TRUNCATION_MARKER));

        let capture = Capture::new(6);
        capture.push("ab🦀cd".as_bytes());
        assert_eq!(capture.take_string(), format!("ab🦀{}", TRUNCATION_MARKER));

        let capture = Capture::new(5);
        capture.push("ab".as_bytes());
        capture.push("🦀".as_bytes());
        assert_eq!(capture.take_string(), format!("ab{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_capture_within_limit() {
        let capture = Capture::new(16);
        capture.push(b"hello ");
        capture.push(b"world");
        assert_eq!(capture.take_string(), "hello world");
    }
}

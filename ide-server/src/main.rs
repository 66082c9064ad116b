use clap::Parser;
use ide_exec::{Interpreter, SuccessPolicy};
use ide_server::{create_app, run_server, MemStorage, Settings};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address to listen on
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Directory for per-request script files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Python interpreter command
    #[arg(long)]
    python: Option<String>,

    /// Execution timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Maximum number of concurrent executions
    #[arg(short, long)]
    max_concurrent: Option<usize>,

    /// How runs are classified: exit-status or empty-stderr
    #[arg(long)]
    success_policy: Option<SuccessPolicy>,
}

impl Args {
    fn settings(self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(addr) = self.addr {
            settings.addr = addr;
        }
        if let Some(dir) = self.scratch_dir {
            settings.exec.scratch_dir = dir;
        }
        if let Some(python) = self.python {
            settings.exec.interpreter = Interpreter::with_command(python);
        }
        if let Some(timeout) = self.timeout {
            settings.exec.timeout_secs = timeout;
        }
        if let Some(max) = self.max_concurrent {
            settings.exec.max_concurrent = Some(max);
        }
        if let Some(policy) = self.success_policy {
            settings.exec.success_policy = policy;
        }

        settings.exec.validate()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Args::parse().settings()?;

    if !settings.exec.interpreter.is_available() {
        warn!(
            "Interpreter {} not found on PATH, executions will fail",
            settings.exec.interpreter.command
        );
    }
    info!(
        scratch_dir = %settings.exec.scratch_dir.display(),
        timeout_secs = settings.exec.timeout_secs,
        "Execution settings loaded"
    );

    let app = create_app(settings.exec, Arc::new(MemStorage::new()))?;
    run_server(app, settings.addr).await?;

    Ok(())
}

//! Logging setup and the log file sink.
//!
//! All tracing output goes to the configured log file in append mode.
//! The file is truncated in place on a timer by an independent task, and
//! read back by the `monitor` command.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Initialise the `tracing` subscriber, writing to the configured log file.
///
/// `RUST_LOG` overrides the default filter; `PAIRBOT_LOG_JSON` switches
/// to JSON lines.
pub fn init(cfg: &AppConfig) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let file = LogSink::new(&cfg.agent.log_file).open_append()?;
    let writer = Mutex::new(file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pairbot=info"));

    let json_logging = std::env::var("PAIRBOT_LOG_JSON").is_ok();

    let result = if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}

/// Handle on the log file.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))
    }

    /// Truncate the log in place. Writers in append mode carry on at offset 0.
    pub fn clear(&self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))?;
        file.set_len(0)
            .with_context(|| format!("Failed to truncate log file {}", self.path.display()))?;
        Ok(())
    }

    /// Truncate the log every `interval` until the task is aborted.
    pub fn spawn_clearer(&self, interval: Duration) -> JoinHandle<()> {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match sink.clear() {
                    Ok(()) => info!(path = %sink.path.display(), "Log file cleared"),
                    Err(e) => warn!(error = %e, "Failed to clear log file"),
                }
            }
        })
    }

    /// Copy the log to `out`. With `follow`, keep polling for new lines and
    /// start over whenever the file shrinks.
    pub async fn stream_to<W: Write>(&self, out: &mut W, follow: bool) -> Result<()> {
        let mut offset = 0u64;
        loop {
            offset = self.copy_from(offset, out)?;
            if !follow {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    fn copy_from<W: Write>(&self, offset: u64, out: &mut W) -> Result<u64> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()))
            }
        };

        let len = file.metadata().context("Failed to stat log file")?.len();
        let start = if len < offset { 0 } else { offset };
        file.seek(SeekFrom::Start(start)).context("Failed to seek log file")?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).context("Failed to read log file")?;
        out.write_all(&buf).context("Failed to write log output")?;
        out.flush().context("Failed to flush log output")?;

        Ok(start + buf.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

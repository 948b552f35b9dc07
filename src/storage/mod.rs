//! Persistence layer.
//!
//! The run flag lives in a small JSON file so that `stop` from another
//! process can end the loop between cycles.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunFlag {
    running: bool,
    updated_at: DateTime<Utc>,
}

/// File-backed start/stop flag.
#[derive(Debug, Clone)]
pub struct RunFlagStore {
    path: PathBuf,
}

impl RunFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the flag, replacing whatever was there.
    pub fn write(&self, running: bool) -> Result<()> {
        let flag = RunFlag {
            running,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&flag).context("Failed to serialise run flag")?;

        // Write-then-rename so a concurrent reader never sees a partial file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write run flag to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace run flag at {}", self.path.display()))?;

        debug!(path = %self.path.display(), running, "Run flag written");
        Ok(())
    }

    /// Current flag. A missing file means "not running".
    pub fn read(&self) -> Result<bool> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No run flag found, treating as stopped");
            return Ok(false);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read run flag from {}", self.path.display()))?;
        let flag: RunFlag = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse run flag from {}", self.path.display()))?;

        Ok(flag.running)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

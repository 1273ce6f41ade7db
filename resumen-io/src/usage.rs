//! Conversion metering. The recorder is passed in by whoever runs the
//! conversion; there is no process-wide instance.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub bank: String,
    pub pages: usize,
}

impl UsageEvent {
    pub fn now(user: impl Into<String>, bank: impl Into<String>, pages: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            user: user.into(),
            bank: bank.into(),
            pages,
        }
    }
}

pub trait UsageRecorder: Send + Sync {
    fn record_conversion(&self, event: &UsageEvent) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsage;

impl UsageRecorder for NoopUsage {
    fn record_conversion(&self, _event: &UsageEvent) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UsageSummary {
    pub conversions: usize,
    pub pages: usize,
}

/// Append-only JSON lines file, one event per line.
#[derive(Debug, Clone)]
pub struct JsonlUsageLog {
    path: PathBuf,
}

impl JsonlUsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Totals for `user`, or for everyone. A missing log is an empty summary.
    pub fn summary(&self, user: Option<&str>) -> Result<UsageSummary> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(UsageSummary::default()),
            Err(e) => return Err(e).with_context(|| format!("opening {}", self.path.display())),
        };
        let mut summary = UsageSummary::default();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: UsageEvent = serde_json::from_str(&line)
                .with_context(|| format!("parse usage line in {}", self.path.display()))?;
            if user.is_none_or(|u| u == event.user) {
                summary.conversions += 1;
                summary.pages += event.pages;
            }
        }
        Ok(summary)
    }
}

impl UsageRecorder for JsonlUsageLog {
    fn record_conversion(&self, event: &UsageEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

//! Deployment counters.
//!
//! Each process start bumps a daily and a total counter in a small JSON
//! file. The daily counter resets when the date (in the configured time
//! zone) rolls over; a missing or unreadable file starts both from scratch.

use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentLog {
    /// `YYYY-MM-DD` in the configured time zone.
    pub date: String,
    pub daily_count: u64,
    pub total_count: u64,
}

/// Today's date string in `tz`, matching the log's `date` field.
pub fn today_in(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Record one deployment: read the prior log, bump the counters, rewrite.
pub fn record_deployment(path: &Path, today: &str) -> io::Result<DeploymentLog> {
    let prior: Option<DeploymentLog> = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok());

    let (daily_count, total_count) = match prior {
        Some(log) if log.date == today => (log.daily_count + 1, log.total_count + 1),
        Some(log) => (1, log.total_count + 1),
        None => (1, 1),
    };

    let log = DeploymentLog {
        date: today.to_string(),
        daily_count,
        total_count,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(&log)?)?;
    Ok(log)
}

/// Read the current log without modifying it.
pub fn read_log(path: &Path) -> Option<DeploymentLog> {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
}

//! CSV session report.
//!
//! The report is a small CSV document with a fixed summary header followed
//! by the recent event table, newest first. Rendering is pure; writing goes
//! through [`CsvReporter`] and degrades to a logged warning on I/O failure
//! so a full disk never takes the pipeline down.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::sink::dashboard::log::EventLog;
use crate::sink::dashboard::stats::AggregateSnapshot;

const REPORT_TITLE: &str = "--- TRAFFIC SIGNAL REPORT ---";

/// Renders the report body from the current aggregate view and event log.
pub fn render(
    stats: &AggregateSnapshot,
    log: &EventLog,
    generated_at: DateTime<Local>,
) -> String {
    let peak = stats
        .last_intense_at
        .map(|at| at.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());

    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push('\n');
    out.push_str(&format!("Date,{}\n", generated_at.format("%Y-%m-%d")));
    out.push_str(&format!("Retention,{}%\n", stats.retention_percent));
    out.push_str(&format!("Peak Time,{peak}\n"));
    out.push_str(&format!(
        "Pedestrian Total,{}\n",
        stats.pedestrian_request_count
    ));
    out.push('\n');
    out.push_str("Time,Event\n");
    for entry in log.entries() {
        out.push_str(&format!("{},{}\n", entry.at.format("%H:%M:%S"), entry.text));
    }

    out
}

/// Writes rendered reports to a fixed path, replacing the previous file.
pub struct CsvReporter {
    path: PathBuf,
}

impl CsvReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders and writes the report for the current moment.
    pub fn write(&self, stats: &AggregateSnapshot, log: &EventLog) -> Result<()> {
        let body = render(stats, log, Local::now());
        fs::write(&self.path, body)
            .with_context(|| format!("writing report to {}", self.path.display()))
    }
}

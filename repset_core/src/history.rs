//! Workout history for a user.
//!
//! Loads committed logs from both the WAL and the CSV archive so history
//! views see every session regardless of whether a rollup has run.

use crate::csv_rollup::LogCsvRow;
use crate::{Result, WorkoutLog};
use chrono::{Duration, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;

/// Load `user_id`'s logs from the last `days` days from both WAL and CSV
///
/// Returns logs sorted by start time (newest first).
/// Logs that appear in both WAL and CSV are only returned once.
pub fn load_user_logs(
    wal_path: &Path,
    csv_path: &Path,
    user_id: &str,
    days: i64,
) -> Result<Vec<WorkoutLog>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut logs = Vec::new();
    let mut seen_ids = HashSet::new();

    let recent_for_user = |log: &WorkoutLog| log.user_id == user_id && log.started_at >= cutoff;

    if wal_path.exists() {
        for log in crate::wal::read_logs(wal_path)? {
            if recent_for_user(&log) && seen_ids.insert(log.id) {
                logs.push(log);
            }
        }
        tracing::debug!("Loaded {} workout logs from WAL", logs.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for log in load_logs_from_csv(csv_path)? {
            if recent_for_user(&log) && seen_ids.insert(log.id) {
                logs.push(log);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} workout logs from CSV", csv_count);
    }

    logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    tracing::info!(
        "Loaded {} workout logs for {} from last {} days",
        logs.len(),
        user_id,
        days
    );

    Ok(logs)
}

/// Load all logs from a CSV archive, skipping rows that fail to parse
fn load_logs_from_csv(path: &Path) -> Result<Vec<WorkoutLog>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut logs = Vec::new();
    for result in reader.deserialize::<LogCsvRow>() {
        match result {
            Ok(row) => match WorkoutLog::try_from(row) {
                Ok(log) => logs.push(log),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(logs)
}

/// Aggregate numbers for a set of logs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistorySummary {
    pub sessions: usize,
    pub total_minutes: u32,
    pub average_rating: Option<f32>,
}

pub fn summarize(logs: &[WorkoutLog]) -> HistorySummary {
    if logs.is_empty() {
        return HistorySummary::default();
    }
    let total_rating: u32 = logs.iter().map(|l| u32::from(l.rating)).sum();
    HistorySummary {
        sessions: logs.len(),
        total_minutes: logs.iter().map(|l| l.duration_minutes).sum(),
        average_rating: Some(total_rating as f32 / logs.len() as f32),
    }
}

//! CSV rollup for archiving workout logs.
//!
//! Moves committed logs out of the WAL into a long-lived CSV archive,
//! atomically enough that a crash never loses a log.

use crate::{Error, Result, WorkoutLog};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// Separator for the completed-exercise list inside one CSV cell
const ID_SEPARATOR: char = ';';

/// A row in the CSV archive
#[derive(Debug, Serialize, Deserialize)]
pub struct LogCsvRow {
    id: String,
    user_id: String,
    template_id: String,
    template_name: String,
    session_date: String,
    started_at: String,
    finished_at: String,
    duration_minutes: u32,
    rating: u8,
    notes: String,
    completed_exercise_ids: String,
}

impl From<&WorkoutLog> for LogCsvRow {
    fn from(log: &WorkoutLog) -> Self {
        LogCsvRow {
            id: log.id.to_string(),
            user_id: log.user_id.clone(),
            template_id: log.template_id.to_string(),
            template_name: log.template_name.clone(),
            session_date: log.session_date.to_string(),
            started_at: log.started_at.to_rfc3339(),
            finished_at: log.finished_at.to_rfc3339(),
            duration_minutes: log.duration_minutes,
            rating: log.rating,
            notes: log.notes.clone(),
            completed_exercise_ids: log
                .completed_exercise_ids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(&ID_SEPARATOR.to_string()),
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Other(format!("Invalid UUID '{}': {}", s, e)))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", s, e)))?
        .with_timezone(&Utc))
}

impl TryFrom<LogCsvRow> for WorkoutLog {
    type Error = Error;

    fn try_from(row: LogCsvRow) -> Result<Self> {
        let session_date = NaiveDate::parse_from_str(&row.session_date, "%Y-%m-%d")
            .map_err(|e| Error::Other(format!("Invalid date '{}': {}", row.session_date, e)))?;

        let completed_exercise_ids = row
            .completed_exercise_ids
            .split(ID_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(parse_uuid)
            .collect::<Result<Vec<_>>>()?;

        Ok(WorkoutLog {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            template_id: parse_uuid(&row.template_id)?,
            template_name: row.template_name,
            session_date,
            started_at: parse_time(&row.started_at)?,
            finished_at: parse_time(&row.finished_at)?,
            duration_minutes: row.duration_minutes,
            rating: row.rating,
            notes: row.notes,
            completed_exercise_ids,
        })
    }
}

/// Roll up WAL logs into CSV and archive the WAL
///
/// This function:
/// 1. Reads all logs from the WAL
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of logs processed
///
/// The WAL is renamed rather than deleted so it can be recovered by hand.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let logs = crate::wal::read_logs(wal_path)?;

    if logs.is_empty() {
        tracing::info!("No workout logs in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a fresh file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for log in &logs {
        writer.serialize(LogCsvRow::from(log))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} workout logs to CSV", logs.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(logs.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

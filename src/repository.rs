// src/repository.rs

use crate::models::{CaseProgress, Ear, LogEntry, Progress, Transducer};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::str::FromStr;

fn parse_column<T: FromStr<Err = String>>(idx: usize, raw: String) -> Result<T> {
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

// --- Progress ---

/// Writes the full progress record: per-case rows plus the summary header.
pub fn save_progress(conn: &Connection, progress: &Progress) -> Result<()> {
    let completed = serde_json::to_string(&progress.completed_cases)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO case_progress (case_id, total, correct, accuracy, completed_at) VALUES (?, ?, ?, ?, ?)",
        )?;
        for (case_id, cp) in &progress.cases {
            stmt.execute(params![case_id, cp.total, cp.correct, cp.accuracy, cp.completed_at])?;
        }
    }
    tx.execute(
        "INSERT OR REPLACE INTO progress_summary (id, total_sessions, completed_cases, last_session_date) VALUES (1, ?, ?, ?)",
        params![progress.total_sessions, completed, progress.last_session_date],
    )?;
    tx.commit()?;

    debug!(
        "[DB] Saved progress: {} case(s), {} session(s)",
        progress.cases.len(),
        progress.total_sessions
    );
    Ok(())
}

pub fn load_progress(conn: &Connection) -> Result<Progress> {
    let mut progress = Progress::default();

    let mut stmt = conn.prepare("SELECT case_id, total, correct, accuracy, completed_at FROM case_progress")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            CaseProgress {
                total: row.get(1)?,
                correct: row.get(2)?,
                accuracy: row.get(3)?,
                completed_at: row.get(4)?,
            },
        ))
    })?;
    for row in rows {
        let (case_id, cp) = row?;
        progress.cases.insert(case_id, cp);
    }

    let summary = conn
        .query_row(
            "SELECT total_sessions, completed_cases, last_session_date FROM progress_summary WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<DateTime<Utc>>>(2)?,
                ))
            },
        )
        .optional()?;

    if let Some((total_sessions, completed, last)) = summary {
        progress.total_sessions = total_sessions;
        progress.completed_cases = serde_json::from_str(&completed)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        progress.last_session_date = last;
    }

    Ok(progress)
}

// --- Measurement Log ---

/// Records a raw measurement log entry.
pub fn append_measurement(conn: &Connection, entry: &LogEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO measurements (id, timestamp, ear, transducer, frequency, db, masked, mask_level, so, case_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.id as i64,
            entry.timestamp,
            entry.ear.as_str(),
            entry.transducer.as_str(),
            entry.frequency,
            entry.db,
            entry.masked,
            entry.mask_level,
            entry.so,
            entry.case_id
        ],
    )?;
    Ok(())
}

pub fn load_measurements(conn: &Connection) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, ear, transducer, frequency, db, masked, mask_level, so, case_id
         FROM measurements
         ORDER BY id ASC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            Ok(LogEntry {
                id: row.get::<_, i64>(0)? as u64,
                timestamp: row.get(1)?,
                ear: parse_column::<Ear>(2, row.get(2)?)?,
                transducer: parse_column::<Transducer>(3, row.get(3)?)?,
                frequency: row.get(4)?,
                db: row.get(5)?,
                masked: row.get(6)?,
                mask_level: row.get(7)?,
                so: row.get(8)?,
                case_id: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<LogEntry>, _>>()?;

    debug!("[DB] Loaded {} measurement(s)", entries.len());
    Ok(entries)
}

pub fn clear_measurements(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM measurements", [])?;
    Ok(())
}

/// Stores the id the next log entry will get, so a cleared log never reuses ids.
pub fn save_next_measurement_id(conn: &Connection, next_id: u64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO log_state (id, next_id) VALUES (1, ?)",
        params![next_id as i64],
    )?;
    debug!("[DB] Next measurement id is {}", next_id);
    Ok(())
}

pub fn load_next_measurement_id(conn: &Connection) -> Result<u64> {
    let next_id = conn
        .query_row("SELECT next_id FROM log_state WHERE id = 1", [], |row| row.get::<_, i64>(0))
        .optional()?;
    Ok(next_id.map_or(1, |n| n.max(1) as u64))
}

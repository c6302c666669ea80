// src/measurement.rs

use crate::models::{LogEntry, PlotPoint};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const EXPORT_COLUMNS: [&str; 9] = [
    "index",
    "timestamp",
    "ear",
    "transducer",
    "frequency_hz",
    "db",
    "masking_on",
    "mask_level_db",
    "so",
];

/// One row of the exported measurement table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub index: usize,
    pub timestamp: String,
    pub ear: String,
    pub transducer: String,
    pub frequency_hz: u32,
    pub db: i32,
    pub masking_on: bool,
    pub mask_level_db: i32,
    pub so: bool,
}

/// Append-only record of every placement that drew a response.
#[derive(Debug, Clone)]
pub struct MeasurementLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl Default for MeasurementLog {
    fn default() -> Self {
        MeasurementLog {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl MeasurementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from persisted entries; ids continue after the largest one.
    pub fn restore(mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        let next_id = entries.last().map_or(1, |e| e.id + 1);
        MeasurementLog { entries, next_id }
    }

    /// Raises the next id to at least `floor`, e.g. a persisted value from before a clear.
    pub fn resume_from(mut self, floor: u64) -> Self {
        self.next_id = self.next_id.max(floor);
        self
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn record(&mut self, point: &PlotPoint, mask_level: i32, case_id: &str, now: DateTime<Utc>) -> &LogEntry {
        let entry = LogEntry {
            id: self.next_id,
            timestamp: now,
            ear: point.ear,
            transducer: point.transducer,
            frequency: point.frequency,
            db: point.db,
            masked: point.masked,
            mask_level,
            so: point.so,
            case_id: case_id.to_string(),
        };
        self.next_id += 1;
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit log reset; ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn export(&self) -> Vec<ExportRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| ExportRow {
                index: i + 1,
                timestamp: e.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                ear: e.ear.as_str().to_string(),
                transducer: e.transducer.as_str().to_string(),
                frequency_hz: e.frequency,
                db: e.db,
                masking_on: e.masked,
                mask_level_db: e.mask_level,
                so: e.so,
            })
            .collect()
    }
}

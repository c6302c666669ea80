// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::*;

// --- Test Coordinates ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ear {
    R,
    L,
}

impl Ear {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ear::R => "R",
            Ear::L => "L",
        }
    }

    /// The non-test ear.
    pub fn opposite(&self) -> Ear {
        match self {
            Ear::R => Ear::L,
            Ear::L => Ear::R,
        }
    }
}

impl FromStr for Ear {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" | "RIGHT" => Ok(Ear::R),
            "L" | "LEFT" => Ok(Ear::L),
            other => Err(format!("unknown ear '{}'", other)),
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Transducer {
    AC,
    BC,
}

impl Transducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transducer::AC => "AC",
            Transducer::BC => "BC",
        }
    }

    pub fn interaural_attenuation(&self) -> i32 {
        match self {
            Transducer::AC => IA_AC,
            Transducer::BC => IA_BC,
        }
    }
}

impl FromStr for Transducer {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AC" | "AIR" => Ok(Transducer::AC),
            "BC" | "BONE" => Ok(Transducer::BC),
            other => Err(format!("unknown transducer '{}'", other)),
        }
    }
}

impl fmt::Display for Transducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Ground Truth ---

fn is_false(b: &bool) -> bool {
    !*b
}

/// One hidden threshold of a case. `so` marks "no response at the transducer limit".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ThresholdEntry {
    pub ear: Ear,
    pub transducer: Transducer,
    pub frequency: u32,
    pub db: i32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub so: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thresholds: Vec<ThresholdEntry>,
}

impl Case {
    pub fn entry(&self, ear: Ear, transducer: Transducer, frequency: u32) -> Option<&ThresholdEntry> {
        self.thresholds
            .iter()
            .find(|t| t.ear == ear && t.transducer == transducer && t.frequency == frequency)
    }
}

// --- Plot ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlotKey {
    pub ear: Ear,
    pub transducer: Transducer,
    pub masked: bool,
    pub frequency: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotPoint {
    pub ear: Ear,
    pub transducer: Transducer,
    pub masked: bool,
    pub frequency: u32,
    pub db: i32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub so: bool,
}

impl PlotPoint {
    pub fn key(&self) -> PlotKey {
        PlotKey {
            ear: self.ear,
            transducer: self.transducer,
            masked: self.masked,
            frequency: self.frequency,
        }
    }
}

// --- Measurement Log ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub ear: Ear,
    pub transducer: Transducer,
    pub frequency: u32,
    pub db: i32,
    pub masked: bool,
    pub mask_level: i32,
    pub so: bool,
    pub case_id: String,
}

// --- Selection & Engine Output ---

/// What the learner currently has dialled in on the audiometer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub ear: Ear,
    pub transducer: Transducer,
    pub frequency: u32,
    pub level: i32,
    pub masking: bool,
    pub mask_level: i32,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            ear: Ear::R,
            transducer: Transducer::AC,
            frequency: DEFAULT_FREQUENCY,
            level: DEFAULT_LEVEL,
            masking: false,
            mask_level: MASK_OFF,
        }
    }
}

impl Selection {
    /// Masking counts only once the slider has left the sentinel.
    pub fn masking_effective(&self) -> bool {
        self.masking && self.mask_level > MASK_OFF
    }
}

/// Result of one presentation. `None` thresholds mean "no response at any level".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audibility {
    pub heard: bool,
    pub test_ear_heard: bool,
    pub cross_heard: bool,
    pub over_masking: bool,
    pub cross_hearing: bool,
    pub effective_threshold: Option<i32>,
    pub leak: i32,
    pub effective_mask: Option<i32>,
    pub non_test_bc: Option<i32>,
    pub over_masking_limit: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings {
    pub over_masking: bool,
    pub cross_hearing: bool,
    pub details: Vec<String>,
}

// --- Scoring & Progress ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub total: u32,
    pub correct: u32,
    pub accuracy: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaseProgress {
    pub total: u32,
    pub correct: u32,
    pub accuracy: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub cases: BTreeMap<String, CaseProgress>,
    pub total_sessions: u32,
    pub completed_cases: Vec<String>,
    pub last_session_date: Option<DateTime<Utc>>,
}

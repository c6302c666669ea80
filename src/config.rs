// src/config.rs

use crate::constants::{DEFAULT_LOAD_DELAY_MS, DEFAULT_LOG_LEVEL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for the host binary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrainerConfig {
    /// SQLite file for progress and the measurement log; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    pub load_delay_ms: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            db_path: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            load_delay_ms: DEFAULT_LOAD_DELAY_MS,
        }
    }
}

impl TrainerConfig {
    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }
}

// src/database.rs

use log::debug;
use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    debug!("init_db: Checking database schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS case_progress (
            case_id TEXT PRIMARY KEY,
            total INTEGER NOT NULL,
            correct INTEGER NOT NULL,
            accuracy INTEGER NOT NULL,
            completed_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS progress_summary (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            total_sessions INTEGER NOT NULL DEFAULT 0,
            completed_cases TEXT NOT NULL DEFAULT '[]',
            last_session_date TEXT
        );
        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY,
            timestamp TEXT NOT NULL,
            ear TEXT CHECK (ear IN ('R','L')),
            transducer TEXT CHECK (transducer IN ('AC','BC')),
            frequency INTEGER NOT NULL,
            db INTEGER NOT NULL,
            masked INTEGER NOT NULL,
            mask_level INTEGER NOT NULL,
            so INTEGER NOT NULL,
            case_id TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS log_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            next_id INTEGER NOT NULL DEFAULT 1
        );
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO progress_summary (id, total_sessions) VALUES (1, 0)",
        [],
    )?;
    conn.execute("INSERT OR IGNORE INTO log_state (id, next_id) VALUES (1, 1)", [])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM progress_summary", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        let next_id: i64 = conn
            .query_row("SELECT next_id FROM log_state WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(next_id, 1);
    }
}

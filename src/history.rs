use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::tracking::SessionSummary;
use crate::util::mean;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        dog_id TEXT NOT NULL,
        dog_name TEXT NOT NULL,
        started_at TEXT NOT NULL,
        elapsed_secs INTEGER NOT NULL,
        distance_km REAL NOT NULL,
        calories INTEGER NOT NULL,
        last_speed_kmh REAL NOT NULL,
        last_heart_rate_bpm INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
    CREATE INDEX IF NOT EXISTS idx_sessions_dog ON sessions(dog_id);
"#;

/// A finished session as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub dog_id: String,
    pub dog_name: String,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub calories: u32,
    pub last_speed_kmh: f64,
    pub last_heart_rate_bpm: Option<u16>,
}

impl SessionRecord {
    /// Average speed over the whole session, if any time elapsed.
    pub fn avg_speed_kmh(&self) -> Option<f64> {
        (self.elapsed_secs > 0).then(|| self.distance_km / (self.elapsed_secs as f64 / 3600.0))
    }
}

/// Per-dog lifetime totals.
#[derive(Debug, Clone, PartialEq)]
pub struct DogTotals {
    pub dog_name: String,
    pub sessions: usize,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub calories: u64,
    pub avg_session_km: f64,
}

/// Local log of finished sessions.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Opens the database in the state directory, creating it if needed.
    pub fn new() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("trailpaws_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(HistoryDb { conn })
    }

    pub fn record(&self, summary: &SessionSummary) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (dog_id, dog_name, started_at, elapsed_secs, distance_km, calories,
             last_speed_kmh, last_heart_rate_bpm)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                summary.dog_id.0,
                summary.dog_name,
                summary.started_at.to_rfc3339(),
                summary.elapsed_secs as i64,
                summary.distance_km,
                summary.calories,
                summary.last_speed_kmh,
                summary.last_heart_rate_bpm,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, dog_id, dog_name, started_at, elapsed_secs, distance_km, calories,
                   last_speed_kmh, last_heart_rate_bpm
            FROM sessions
            ORDER BY started_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let started_str: String = row.get(3)?;
            let started_at = DateTime::parse_from_rfc3339(&started_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "started_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let elapsed: i64 = row.get(4)?;

            Ok(SessionRecord {
                id: row.get(0)?,
                dog_id: row.get(1)?,
                dog_name: row.get(2)?,
                started_at,
                elapsed_secs: elapsed.max(0) as u64,
                distance_km: row.get(5)?,
                calories: row.get(6)?,
                last_speed_kmh: row.get(7)?,
                last_heart_rate_bpm: row.get(8)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Lifetime totals per dog, longest distance first.
    pub fn totals_by_dog(&self) -> Result<Vec<DogTotals>> {
        let records = self.recent(usize::MAX >> 1)?;

        let totals = records
            .into_iter()
            .into_group_map_by(|r| r.dog_id.clone())
            .into_values()
            .map(|group| {
                let distances: Vec<f64> = group.iter().map(|r| r.distance_km).collect();
                DogTotals {
                    dog_name: group[0].dog_name.clone(),
                    sessions: group.len(),
                    elapsed_secs: group.iter().map(|r| r.elapsed_secs).sum(),
                    distance_km: distances.iter().sum(),
                    calories: group.iter().map(|r| r.calories as u64).sum(),
                    avg_session_km: mean(&distances).unwrap_or(0.0),
                }
            })
            .sorted_by(|a, b| {
                b.distance_km
                    .partial_cmp(&a.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.dog_name.cmp(&b.dog_name))
            })
            .collect();

        Ok(totals)
    }

    /// Writes every stored session to `path` as CSV; returns the row count.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> std::result::Result<usize, Box<dyn Error>> {
        let records = self.recent(usize::MAX >> 1)?;
        let mut writer = csv::Writer::from_path(path)?;
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(records.len())
    }
}

/// Short label for when a session started: time only for today, date otherwise.
pub fn started_label(at: DateTime<Local>, now: DateTime<Local>) -> String {
    if at.date_naive() == now.date_naive() {
        at.format("today %H:%M").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

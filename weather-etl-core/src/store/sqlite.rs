//! SQLite-backed record storage.
//!
//! A single `rusqlite::Connection` guarded by a mutex; every call runs a
//! short synchronous statement, so holding the lock across it is fine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;

use crate::error::StoreError;
use crate::model::{QueryOptions, WeatherRecord};

use super::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, mainly for tests and one-shot runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_records (
                id            TEXT PRIMARY KEY,
                location_name TEXT NOT NULL,
                temperature_c REAL NOT NULL,
                temperature_f REAL NOT NULL,
                humidity_pct  INTEGER NOT NULL,
                condition     TEXT NOT NULL,
                observed_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_records_location
                ON weather_records(location_name);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        let observed_at_str: String = row.get(6)?;
        // A stored timestamp that no longer parses is corruption; surface
        // it rather than substituting a fabricated time.
        let observed_at = DateTime::parse_from_rfc3339(&observed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(WeatherRecord {
            id: row.get(0)?,
            location_name: row.get(1)?,
            temperature_c: row.get(2)?,
            temperature_f: row.get(3)?,
            humidity_pct: row.get(4)?,
            condition: row.get(5)?,
            observed_at,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert(&self, records: &[WeatherRecord]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO weather_records
                    (id, location_name, temperature_c, temperature_f,
                     humidity_pct, condition, observed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    location_name = excluded.location_name,
                    temperature_c = excluded.temperature_c,
                    temperature_f = excluded.temperature_f,
                    humidity_pct  = excluded.humidity_pct,
                    condition     = excluded.condition,
                    observed_at   = excluded.observed_at
                "#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.id,
                    record.location_name,
                    record.temperature_c,
                    record.temperature_f,
                    record.humidity_pct,
                    record.condition,
                    record.observed_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn find_data(&self, options: &QueryOptions) -> Result<Vec<WeatherRecord>, StoreError> {
        let conn = self.conn.lock();

        // ORDER BY id keeps pagination stable across identical queries.
        let (sql, pattern) = match &options.filter {
            Some(filter) => (
                "SELECT id, location_name, temperature_c, temperature_f,
                        humidity_pct, condition, observed_at
                 FROM weather_records
                 WHERE location_name LIKE ?1
                 ORDER BY id
                 LIMIT ?2 OFFSET ?3",
                Some(format!("%{filter}%")),
            ),
            None => (
                "SELECT id, location_name, temperature_c, temperature_f,
                        humidity_pct, condition, observed_at
                 FROM weather_records
                 ORDER BY id
                 LIMIT ?1 OFFSET ?2",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = match pattern {
            Some(pattern) => stmt.query_map(
                params![pattern, options.limit, options.offset()],
                Self::row_to_record,
            )?,
            None => stmt.query_map(params![options.limit, options.offset()], Self::row_to_record)?,
        };

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

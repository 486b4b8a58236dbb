//! SQLite persistence for collected readings.
//!
//! One row per accepted REPLY. Temperatures are stored raw (tenths of a
//! degree); unconnected channels are `NULL`. Timestamps are Unix seconds.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};
use serde::Serialize;
use tmonbus_frame::NUM_CHANNELS;
use tracing::{debug, info};

use crate::error::{ControllerError, Result};
use crate::reading::Reading;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS readings (
    id      INTEGER PRIMARY KEY,
    ts      INTEGER NOT NULL,
    addr    INTEGER NOT NULL,
    temp_0  INTEGER,
    temp_1  INTEGER,
    temp_2  INTEGER,
    temp_3  INTEGER
);
CREATE INDEX IF NOT EXISTS idx_readings_addr_ts ON readings (addr, ts);";

const INSERT: &str = "\
INSERT INTO readings (ts, addr, temp_0, temp_1, temp_2, temp_3)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const FETCH_RECENT: &str = "\
SELECT id, ts, addr, temp_0, temp_1, temp_2, temp_3
FROM readings ORDER BY id DESC LIMIT ?1";

const SECONDS_PER_DAY: i64 = 86_400;

/// Somewhere to put readings once they have been collected.
pub trait ReadingSink {
    /// Store one batch (typically one polling cycle) atomically.
    fn store(&mut self, readings: &[Reading]) -> Result<()>;
}

impl<S: ReadingSink + ?Sized> ReadingSink for &mut S {
    fn store(&mut self, readings: &[Reading]) -> Result<()> {
        (**self).store(readings)
    }
}

/// A row read back from the `readings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredReading {
    pub id: i64,
    pub ts: i64,
    pub address: u8,
    pub temps: [Option<i16>; NUM_CHANNELS],
}

impl StoredReading {
    pub fn reading(&self) -> Reading {
        Reading {
            address: self.address,
            temps: self.temps,
        }
    }
}

/// SQLite-backed reading store.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at `path`.
    ///
    /// Missing parent directories are created. The schema is created if
    /// absent and the journal is switched to WAL.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ControllerError::StorageDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let storage = Self::init(conn)?;
        info!(path = %path.display(), "reading store opened");
        Ok(storage)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "journal mode set");
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store `readings` stamped with `ts`, in one transaction.
    ///
    /// Returns the number of rows written.
    pub fn store_at(&mut self, readings: &[Reading], ts: i64) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(INSERT)?;
            for reading in readings {
                let [t0, t1, t2, t3] = reading.temps;
                insert.execute(params![ts, reading.address, t0, t1, t2, t3])?;
            }
        }
        tx.commit()?;
        Ok(readings.len())
    }

    /// The newest `count` rows, newest first.
    pub fn fetch(&self, count: usize) -> Result<Vec<StoredReading>> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(FETCH_RECENT)?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok(StoredReading {
                    id: row.get(0)?,
                    ts: row.get(1)?,
                    address: row.get(2)?,
                    temps: [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?],
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete rows older than `days` days and reclaim the space.
    ///
    /// Returns the number of rows deleted.
    pub fn purge(&mut self, days: u32) -> Result<usize> {
        let cutoff = unix_now() - i64::from(days) * SECONDS_PER_DAY;
        let deleted = self
            .conn
            .execute("DELETE FROM readings WHERE ts < ?1", [cutoff])?;
        if deleted > 0 {
            self.conn.execute_batch("VACUUM")?;
            info!(deleted, days, "purged old readings");
        }
        Ok(deleted)
    }
}

impl ReadingSink for Storage {
    fn store(&mut self, readings: &[Reading]) -> Result<()> {
        if readings.is_empty() {
            return Ok(());
        }
        let written = self.store_at(readings, unix_now())?;
        debug!(written, "readings stored");
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

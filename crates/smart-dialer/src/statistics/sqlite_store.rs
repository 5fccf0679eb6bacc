//! SQLite-backed call counter store

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::migration::MigrationManager;
use super::{CallCounter, CallStatisticsStore};

pub struct SqliteCallStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteCallStore {
    pub fn open(db_path: &Path, pool_size: u32) -> anyhow::Result<Self> {
        info!("Opening call counter database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }

        info!("Call counter database initialized successfully");
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Private in-memory database; a single connection so every caller sees the same data.
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        Ok(Self { pool: Arc::new(pool) })
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    fn row_to_counter(row: &Row) -> anyhow::Result<CallCounter> {
        let call_count: i64 = row.get(1)?;
        let last_call_str: String = row.get(2)?;
        let last_call_date = DateTime::parse_from_rfc3339(&last_call_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse timestamp {:?}: {}", last_call_str, e))?
            .with_timezone(&Utc);

        Ok(CallCounter {
            phone_number: row.get(0)?,
            call_count: u64::try_from(call_count)
                .with_context(|| format!("Negative call count {}", call_count))?,
            last_call_date,
        })
    }
}

impl CallStatisticsStore for SqliteCallStore {
    fn get(&self, phone_number: &str) -> anyhow::Result<Option<CallCounter>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT phone_number, call_count, last_call_date
             FROM call_counters WHERE phone_number = ?1",
        )?;

        let mut rows = stmt.query([phone_number])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_counter(row)?)),
            None => Ok(None),
        }
    }

    fn upsert(
        &self,
        phone_number: &str,
        call_count: u64,
        last_call_date: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        let call_count = i64::try_from(call_count).context("Call count exceeds storage range")?;

        conn.execute(
            "INSERT INTO call_counters (phone_number, call_count, last_call_date)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(phone_number) DO UPDATE SET
                call_count = excluded.call_count,
                last_call_date = excluded.last_call_date",
            params![phone_number, call_count, last_call_date.to_rfc3339()],
        )
        .with_context(|| format!("Failed to upsert call counter for {}", phone_number))?;

        debug!("Stored call counter {} = {}", phone_number, call_count);
        Ok(())
    }

    fn enumerate_all(&self) -> anyhow::Result<Vec<CallCounter>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT phone_number, call_count, last_call_date
             FROM call_counters ORDER BY phone_number",
        )?;

        let mut rows = stmt.query([])?;
        let mut counters = Vec::new();
        while let Some(row) = rows.next()? {
            counters.push(Self::row_to_counter(row)?);
        }

        Ok(counters)
    }

    fn increment(&self, phone_number: &str, at: DateTime<Utc>) -> anyhow::Result<CallCounter> {
        let conn = self.get_conn()?;

        let counter = conn
            .query_row(
                "INSERT INTO call_counters (phone_number, call_count, last_call_date)
                 VALUES (?1, 1, ?2)
                 ON CONFLICT(phone_number) DO UPDATE SET
                    call_count = call_count + 1,
                    last_call_date = excluded.last_call_date
                 RETURNING phone_number, call_count, last_call_date",
                params![phone_number, at.to_rfc3339()],
                |row| Ok(Self::row_to_counter(row)),
            )
            .optional()
            .with_context(|| format!("Failed to increment call counter for {}", phone_number))?
            .ok_or_else(|| anyhow::anyhow!("Increment of {} returned no row", phone_number))??;

        debug!("Call counter {} is now {}", phone_number, counter.call_count);
        Ok(counter)
    }

    fn flush(&self) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

impl Drop for SqliteCallStore {
    fn drop(&mut self) {
        if let Ok(conn) = self.pool.get() {
            if let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
                warn!("WAL checkpoint on close failed: {}", e);
            }
        }
    }
}

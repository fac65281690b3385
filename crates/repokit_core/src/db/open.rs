//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply `DatabaseConfig` pragmas and the optional init batch.
//!
//! # Invariants
//! - Returned connections have `busy_timeout` set.
//! - A connection whose bootstrap failed is never returned.

use super::{DbError, DbResult};
use crate::config::DatabaseConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a SQLite database file, creating its parent directory when missing.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, config: &DatabaseConfig) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(source) = std::fs::create_dir_all(parent) {
            let err = DbError::Io {
                path: parent.to_path_buf(),
                source,
            };
            log_open_failure("file", started_at, "db_dir_failed", &err);
            return Err(err);
        }
    }

    let opened = Connection::open(path).map_err(DbError::from);
    finish_open("file", started_at, opened, config)
}

/// Opens a private in-memory SQLite database.
///
/// Each call yields an independent, empty database.
pub fn open_db_in_memory(config: &DatabaseConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let opened = Connection::open_in_memory().map_err(DbError::from);
    finish_open("memory", started_at, opened, config)
}

fn finish_open(
    mode: &str,
    started_at: Instant,
    opened: DbResult<Connection>,
    config: &DatabaseConfig,
) -> DbResult<Connection> {
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            log_open_failure(mode, started_at, "db_open_failed", &err);
            return Err(err);
        }
    };

    match bootstrap_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            log_open_failure(mode, started_at, "db_bootstrap_failed", &err);
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, config: &DatabaseConfig) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout())?;
    if let Some(init_sql) = config.init_sql.as_deref() {
        conn.execute_batch(init_sql)?;
    }
    Ok(())
}

fn log_open_failure(mode: &str, started_at: Instant, code: &str, err: &DbError) {
    error!(
        "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
        mode,
        started_at.elapsed().as_millis(),
        code,
        err
    );
}

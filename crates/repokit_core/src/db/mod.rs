//! SQLite collaborator: connection bootstrap and unit handles.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections configured from `DatabaseConfig`.
//! - Wrap an open connection as a closeable unit handle.
//!
//! # Invariants
//! - Returned connections have the configured pragmas applied.
//! - A closed handle never hands out its connection again.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

mod handle;
mod open;

pub use handle::{SqliteConnectionFactory, SqliteHandle};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// The handle was closed by the end of its unit of work.
    #[error("database handle of unit {unit_id} is closed")]
    HandleClosed { unit_id: Uuid },
    /// Close requested while a statement still borrows the connection.
    #[error("database handle of unit {unit_id} is in use and cannot be closed")]
    HandleInUse { unit_id: Uuid },
    #[error("failed to prepare database directory `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Non-SQLite factories report open failures through this variant.
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

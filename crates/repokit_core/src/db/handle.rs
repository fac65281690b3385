//! SQLite unit handle and the factory the unit manager opens it through.

use super::open::{open_db, open_db_in_memory};
use super::{DbError, DbResult};
use crate::config::{CoreConfig, DatabaseConfig};
use crate::unit::{ConnectionFactory, UnitHandle};
use log::debug;
use rusqlite::Connection;
use std::cell::RefCell;
use uuid::Uuid;

/// One open SQLite connection owned by a unit of work.
///
/// The connection lives behind a `RefCell` so the manager can close it while
/// repositories only ever borrow it for the duration of one statement batch.
#[derive(Debug)]
pub struct SqliteHandle {
    unit_id: Uuid,
    conn: RefCell<Option<Connection>>,
}

impl SqliteHandle {
    pub fn new(conn: Connection) -> Self {
        Self {
            unit_id: Uuid::new_v4(),
            conn: RefCell::new(Some(conn)),
        }
    }

    /// Runs `work` against the open connection.
    ///
    /// # Errors
    /// - `DbError::HandleClosed` once the owning unit has ended.
    /// - Whatever `work` returns.
    pub fn with_connection<T, E>(
        &self,
        work: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DbError::HandleClosed {
            unit_id: self.unit_id,
        })?;
        work(conn)
    }
}

impl UnitHandle for SqliteHandle {
    fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    fn close(&self) -> DbResult<()> {
        let taken = self
            .conn
            .try_borrow_mut()
            .map_err(|_| DbError::HandleInUse {
                unit_id: self.unit_id,
            })?
            .take();

        match taken {
            Some(conn) => conn.close().map_err(|(_, err)| DbError::Sqlite(err)),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.conn
            .try_borrow()
            .map(|conn| conn.is_none())
            .unwrap_or(false)
    }
}

/// Opens `SqliteHandle`s as described by a `DatabaseConfig`.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    config: DatabaseConfig,
}

impl SqliteConnectionFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Builds the factory from the `[database]` section of a loaded config.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.database.clone())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Handle = SqliteHandle;

    fn open(&self) -> DbResult<SqliteHandle> {
        let conn = if self.config.is_in_memory() {
            open_db_in_memory(&self.config)?
        } else {
            open_db(&self.config.path, &self.config)?
        };
        let handle = SqliteHandle::new(conn);
        debug!(
            "event=handle_open module=db status=ok unit_id={}",
            handle.unit_id
        );
        Ok(handle)
    }
}

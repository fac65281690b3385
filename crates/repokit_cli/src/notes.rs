//! Sample note repository exercised by the smoke binary.

use repokit_core::{DbError, SharedResolver, SqlObject, SqliteHandle, UnitError};
use rusqlite::{params, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("note {0} not found")]
    NotFound(i64),
    #[error("note body must not be empty")]
    EmptyBody,
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for NoteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(DbError::from(err))
    }
}

pub type NoteResult<T> = Result<T, NoteError>;

pub trait NoteRepository: Send + Sync {
    fn create_schema(&self) -> NoteResult<()>;
    fn insert(&self, body: &str) -> NoteResult<Note>;
    fn find_by_id(&self, id: i64) -> NoteResult<Note>;
    fn count(&self) -> NoteResult<i64>;
}

pub struct SqliteNoteRepository {
    resolver: SharedResolver<SqliteHandle>,
}

impl SqlObject<SqliteHandle> for SqliteNoteRepository {
    fn attach(resolver: SharedResolver<SqliteHandle>) -> Self {
        Self { resolver }
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn create_schema(&self) -> NoteResult<()> {
        self.resolver.resolve()?.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    body TEXT NOT NULL
                );",
            )?;
            Ok(())
        })
    }

    fn insert(&self, body: &str) -> NoteResult<Note> {
        let body = body.trim();
        if body.is_empty() {
            return Err(NoteError::EmptyBody);
        }
        self.resolver.resolve()?.with_connection(|conn| {
            conn.execute("INSERT INTO notes (body) VALUES (?1);", params![body])?;
            Ok(Note {
                id: conn.last_insert_rowid(),
                body: body.to_string(),
            })
        })
    }

    fn find_by_id(&self, id: i64) -> NoteResult<Note> {
        self.resolver.resolve()?.with_connection(|conn| {
            conn.query_row(
                "SELECT id, body FROM notes WHERE id = ?1;",
                params![id],
                |row| {
                    Ok(Note {
                        id: row.get(0)?,
                        body: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(NoteError::NotFound(id))
        })
    }

    fn count(&self) -> NoteResult<i64> {
        self.resolver.resolve()?.with_connection(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}

repokit_core::repository_facade! {
    /// Application-facing `NoteRepository`.
    pub struct NoteRepositoryFacade: NoteRepository => SqliteNoteRepository {
        fn create_schema(&self) -> NoteResult<()>;
        fn insert(&self, body: &str) -> NoteResult<Note>;
        fn find_by_id(&self, id: i64) -> NoteResult<Note>;
        fn count(&self) -> NoteResult<i64>;
    }
}

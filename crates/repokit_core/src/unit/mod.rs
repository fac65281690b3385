//! Unit-of-work management.
//!
//! # Responsibility
//! - Bind at most one open database handle to the calling thread.
//! - Be the only path through which repositories reach a live handle.
//!
//! # Invariants
//! - Bindings are thread-local; one thread never observes another's handle.
//! - `begin_unit` either binds a freshly opened handle or leaves no binding.
//! - `end_unit` always unbinds, then closes the handle exactly once.
//! - Commit and rollback are never issued here.

use crate::db::{DbError, DbResult};
use thiserror::Error;
use uuid::Uuid;

mod manager;
mod resolver;

pub use manager::{UnitManager, UnitScope};
pub use resolver::{HandleResolver, SharedResolver, UnitResolver};

pub type UnitResult<T> = Result<T, UnitError>;

/// Lifecycle misuse and collaborator failures of a unit of work.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit of work already started")]
    AlreadyStarted,
    #[error("unit of work not started yet")]
    NotStarted,
    #[error("end called outside of unit of work")]
    NotActive,
    /// A scope tried to end unit `unit_id` after it was no longer bound.
    #[error("scope of unit {unit_id} outlived its unit of work")]
    StaleScope { unit_id: Uuid },
    #[error("failed to open unit of work handle: {0}")]
    Open(#[source] DbError),
    #[error("failed to close unit of work handle: {0}")]
    Close(#[source] DbError),
}

impl UnitError {
    /// True for caller bugs: begin while active, end or get while inactive,
    /// or ending through a stale scope.
    pub fn is_lifecycle_misuse(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted | Self::NotStarted | Self::NotActive | Self::StaleScope { .. }
        )
    }
}

/// A closeable database resource owned by one unit of work.
pub trait UnitHandle: 'static {
    /// Correlation id used in log events.
    fn unit_id(&self) -> Uuid;
    fn close(&self) -> DbResult<()>;
    fn is_closed(&self) -> bool;
}

/// Opens unit handles. Implemented by the SQL-execution collaborator.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Handle: UnitHandle;

    fn open(&self) -> DbResult<Self::Handle>;
}

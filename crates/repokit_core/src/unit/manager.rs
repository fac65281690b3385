//! Thread-bound unit manager.

use super::{ConnectionFactory, UnitError, UnitHandle, UnitResult};
use log::{debug, error, warn};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Keyed by manager id so independent managers on one thread never share a slot.
    static BOUND_UNITS: RefCell<HashMap<u64, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Manages the handle of the current unit of work.
///
/// All repositories resolve their handle here, so every call made on one
/// thread between `begin_unit` and `end_unit` shares a single connection.
/// Not intended for direct use in application code, except for the rare case
/// where a unit is needed without a transaction wrapper.
///
/// Share it as `Arc<UnitManager<F>>`; the manager itself holds no per-thread
/// state.
///
/// Dropping the manager removes only the dropping thread's binding. Units
/// still bound on other threads stay in those threads' storage until the
/// threads exit, and their handles are released without `close`.
pub struct UnitManager<F: ConnectionFactory> {
    id: u64,
    factory: F,
}

impl<F: ConnectionFactory> UnitManager<F> {
    pub fn new(factory: F) -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            factory,
        }
    }

    /// Process-unique manager id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the handle bound to the current thread.
    ///
    /// # Errors
    /// - `UnitError::NotStarted` when no unit is active on this thread.
    pub fn get(&self) -> UnitResult<Rc<F::Handle>> {
        self.bound().ok_or(UnitError::NotStarted)
    }

    pub fn is_unit_started(&self) -> bool {
        self.bound().is_some()
    }

    /// Opens a handle and binds it to the current thread.
    ///
    /// # Errors
    /// - `UnitError::AlreadyStarted` when a unit is already active; the bound
    ///   handle is left untouched.
    /// - `UnitError::Open` when the factory fails; nothing is bound.
    pub fn begin_unit(&self) -> UnitResult<()> {
        self.begin().map(|_| ())
    }

    fn begin(&self) -> UnitResult<Uuid> {
        if self.is_unit_started() {
            return Err(UnitError::AlreadyStarted);
        }

        let handle = match self.factory.open() {
            Ok(handle) => handle,
            Err(err) => {
                error!(
                    "event=unit_begin module=unit status=error manager={} error={}",
                    self.id, err
                );
                return Err(UnitError::Open(err));
            }
        };

        let unit_id = handle.unit_id();
        let handle: Rc<dyn Any> = Rc::new(handle);
        BOUND_UNITS.with(|units| units.borrow_mut().insert(self.id, handle));
        debug!(
            "event=unit_begin module=unit status=ok manager={} unit_id={}",
            self.id, unit_id
        );
        Ok(unit_id)
    }

    /// Unbinds the current handle and closes it.
    ///
    /// Does not commit anything. The handle is unbound even when closing it
    /// fails.
    ///
    /// # Errors
    /// - `UnitError::NotActive` when no unit is active on this thread.
    /// - `UnitError::Close` when the handle fails to close.
    pub fn end_unit(&self) -> UnitResult<()> {
        let handle = self.unbind().ok_or(UnitError::NotActive)?;
        let unit_id = handle.unit_id();

        match handle.close() {
            Ok(()) => {
                debug!(
                    "event=unit_end module=unit status=ok manager={} unit_id={}",
                    self.id, unit_id
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=unit_end module=unit status=error manager={} unit_id={} error={}",
                    self.id, unit_id, err
                );
                Err(UnitError::Close(err))
            }
        }
    }

    /// Begins a unit that ends when the returned scope is dropped.
    pub fn scope(&self) -> UnitResult<UnitScope<'_, F>> {
        let unit_id = self.begin()?;
        Ok(UnitScope {
            manager: self,
            unit_id,
            active: true,
            _thread_bound: PhantomData,
        })
    }

    /// Runs `work` inside a fresh unit of work.
    ///
    /// The unit ends on every exit path. A failure of `work` wins over a
    /// failure to end the unit, which is then only logged.
    pub fn in_unit<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<UnitError>,
    {
        let scope = self.scope()?;
        match work() {
            Ok(value) => {
                scope.end()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = scope.end() {
                    warn!(
                        "event=unit_end module=unit status=error manager={} error={} \
                         after_work_failure=true",
                        self.id, end_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Ends the bound unit only if it is the one `unit_id` names.
    fn end_scoped(&self, unit_id: Uuid) -> UnitResult<()> {
        let bound_id = self.bound().map(|handle| handle.unit_id());
        if bound_id == Some(unit_id) {
            return self.end_unit();
        }
        warn!(
            "event=unit_end module=unit status=warn manager={} unit_id={} reason=stale_scope",
            self.id, unit_id
        );
        Err(UnitError::StaleScope { unit_id })
    }

    fn bound(&self) -> Option<Rc<F::Handle>> {
        BOUND_UNITS
            .with(|units| units.borrow().get(&self.id).cloned())
            .and_then(|handle| handle.downcast::<F::Handle>().ok())
    }

    fn unbind(&self) -> Option<Rc<F::Handle>> {
        BOUND_UNITS
            .with(|units| units.borrow_mut().remove(&self.id))
            .and_then(|handle| handle.downcast::<F::Handle>().ok())
    }
}

impl<F: ConnectionFactory> Drop for UnitManager<F> {
    fn drop(&mut self) {
        let leaked = BOUND_UNITS
            .try_with(|units| units.borrow_mut().remove(&self.id))
            .ok()
            .flatten();
        if leaked.is_some() {
            warn!(
                "event=unit_leak module=unit status=warn manager={} \
                 reason=manager_dropped_with_active_unit other_threads=unchanged",
                self.id
            );
        }
    }
}

/// Guard for a unit started by `UnitManager::scope`.
///
/// Ends the unit on drop, including while unwinding. Bound to the thread that
/// began the unit, and only ever ends that unit: if it was already ended and
/// another unit bound in its place, the newer unit is left alone.
#[must_use = "the unit ends as soon as the scope is dropped"]
pub struct UnitScope<'a, F: ConnectionFactory> {
    manager: &'a UnitManager<F>,
    unit_id: Uuid,
    active: bool,
    _thread_bound: PhantomData<Rc<()>>,
}

impl<F: ConnectionFactory> UnitScope<'_, F> {
    pub fn handle(&self) -> UnitResult<Rc<F::Handle>> {
        self.manager.get()
    }

    /// Id of the unit this scope began.
    pub fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    /// Ends the unit now and reports the close result.
    ///
    /// # Errors
    /// - `UnitError::StaleScope` when the unit this scope began is no longer
    ///   bound; whatever is bound now stays untouched.
    /// - `UnitError::Close` when the handle fails to close.
    pub fn end(mut self) -> UnitResult<()> {
        self.active = false;
        self.manager.end_scoped(self.unit_id)
    }
}

impl<F: ConnectionFactory> Drop for UnitScope<'_, F> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.manager.end_scoped(self.unit_id) {
            warn!(
                "event=unit_end module=unit status=error manager={} error={} on_drop=true",
                self.manager.id, err
            );
        }
    }
}

//! Handle resolution callback handed to repository delegates.

use super::{ConnectionFactory, UnitManager, UnitResult};
use std::rc::Rc;
use std::sync::Arc;

/// Resolves the handle of the calling thread's unit of work.
pub trait HandleResolver<H>: Send + Sync {
    fn resolve(&self) -> UnitResult<Rc<H>>;
}

/// The resolver shared by every delegate of one installer.
pub type SharedResolver<H> = Arc<dyn HandleResolver<H>>;

/// Resolver backed by a `UnitManager`.
pub struct UnitResolver<F: ConnectionFactory> {
    units: Arc<UnitManager<F>>,
}

impl<F: ConnectionFactory> UnitResolver<F> {
    pub fn new(units: Arc<UnitManager<F>>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &Arc<UnitManager<F>> {
        &self.units
    }
}

impl<F: ConnectionFactory> HandleResolver<F::Handle> for UnitResolver<F> {
    fn resolve(&self) -> UnitResult<Rc<F::Handle>> {
        self.units.get()
    }
}

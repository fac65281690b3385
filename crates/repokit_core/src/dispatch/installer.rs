//! Registration of repository declarations.

use super::declaration::{Binding, RepositoryDeclaration};
use super::interceptor::InterceptorChain;
use super::redirect::Redirect;
use super::registry::RepositoryRegistry;
use super::report::Reporter;
use super::{RegistrationError, RegistrationResult};
use crate::unit::{ConnectionFactory, SharedResolver, UnitManager, UnitResolver};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Binds façades for repository declarations against one unit manager.
///
/// Every delegate created by one installer receives the same resolver.
pub struct RepositoryInstaller<F: ConnectionFactory> {
    units: Arc<UnitManager<F>>,
    resolver: OnceCell<SharedResolver<F::Handle>>,
    interceptors: InterceptorChain,
    reporter: Reporter,
}

impl<F: ConnectionFactory> RepositoryInstaller<F> {
    pub fn new(units: Arc<UnitManager<F>>) -> Self {
        Self::with_interceptors(units, InterceptorChain::default())
    }

    pub fn with_interceptors(units: Arc<UnitManager<F>>, interceptors: InterceptorChain) -> Self {
        Self {
            units,
            resolver: OnceCell::new(),
            interceptors,
            reporter: Reporter::new("repositories = "),
        }
    }

    pub fn units(&self) -> &Arc<UnitManager<F>> {
        &self.units
    }

    /// The resolver handed to every delegate; created on first use.
    pub fn shared_resolver(&self) -> SharedResolver<F::Handle> {
        let resolver = self.resolver.get_or_init(|| {
            let resolver: SharedResolver<F::Handle> =
                Arc::new(UnitResolver::new(Arc::clone(&self.units)));
            resolver
        });
        Arc::clone(resolver)
    }

    /// Creates the delegate and façade for `R` and binds the façade.
    ///
    /// # Errors
    /// - `RegistrationError::LazyBindingUnsupported` for `Binding::Lazy`.
    /// - `RegistrationError::Duplicate` when `R::Api` is already bound.
    ///
    /// Nothing is bound or reported on failure.
    pub fn install<R>(
        &mut self,
        registry: &mut RepositoryRegistry,
        binding: Binding,
    ) -> RegistrationResult<()>
    where
        R: RepositoryDeclaration<F::Handle>,
    {
        let repository = R::repository_name();
        match self.try_install::<R>(registry, binding) {
            Ok(()) => {
                self.reporter.line(format!("({repository})"));
                info!(
                    "event=repository_installed module=dispatch status=ok repository={} manager={}",
                    repository,
                    self.units.id()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=repository_rejected module=dispatch status=error repository={} error={}",
                    repository, err
                );
                Err(err)
            }
        }
    }

    fn try_install<R>(
        &self,
        registry: &mut RepositoryRegistry,
        binding: Binding,
    ) -> RegistrationResult<()>
    where
        R: RepositoryDeclaration<F::Handle>,
    {
        let repository = R::repository_name();
        if binding == Binding::Lazy {
            return Err(RegistrationError::LazyBindingUnsupported { repository });
        }
        if registry.contains::<R::Api>() {
            return Err(RegistrationError::Duplicate { repository });
        }

        let delegate = R::delegate(self.shared_resolver());
        let redirect = Redirect::new(repository, delegate, self.interceptors.clone());
        registry.bind::<R::Api>(repository, R::facade(redirect))
    }

    /// Repository lines recorded so far.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Logs and returns the startup report; `None` if nothing was installed.
    pub fn report(&self) -> Option<String> {
        self.reporter.report()
    }
}

//! Startup wiring from configuration to bound repositories.
//!
//! # Responsibility
//! - Build the connection factory from the loaded configuration.
//! - Install every declared repository through one installer, so all
//!   delegates share one handle resolver.
//!
//! # Invariants
//! - Startup either returns a fully wired context or fails without
//!   returning partially bound repositories.

use crate::config::{ConfigAwareProvider, ConfigError, CoreConfig};
use crate::db::SqliteConnectionFactory;
use crate::dispatch::{
    Binding, CallInterceptor, InterceptorChain, RegistrationError, RegistrationResult,
    RepositoryDeclaration, RepositoryInstaller, RepositoryRegistry,
};
use crate::logging::{init_logging, LoggingError};
use crate::unit::{ConnectionFactory, UnitManager};
use log::info;
use std::sync::Arc;
use thiserror::Error;

type Registration<F> =
    Box<dyn FnOnce(&mut RepositoryInstaller<F>, &mut RepositoryRegistry) -> RegistrationResult<()>>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Provider building a `SqliteConnectionFactory` from `[database]`.
pub fn sqlite_factory_provider() -> impl ConfigAwareProvider<SqliteConnectionFactory> {
    SqliteConnectionFactory::from_config
}

/// Declares how a process wires its units and repositories.
pub struct RepositoryBundle<F: ConnectionFactory> {
    factory: Box<dyn ConfigAwareProvider<F>>,
    interceptors: Vec<Arc<dyn CallInterceptor>>,
    registrations: Vec<Registration<F>>,
    init_logging: bool,
}

impl RepositoryBundle<SqliteConnectionFactory> {
    /// Bundle backed by SQLite connections from the `[database]` section.
    pub fn sqlite() -> Self {
        Self::new(sqlite_factory_provider())
    }
}

impl<F: ConnectionFactory> RepositoryBundle<F> {
    pub fn new(factory: impl ConfigAwareProvider<F> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            interceptors: Vec::new(),
            registrations: Vec::new(),
            init_logging: false,
        }
    }

    /// Starts process logging from `[logging]` before anything is wired.
    pub fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    pub fn interceptor(mut self, interceptor: impl CallInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn repository<R>(self) -> Self
    where
        R: RepositoryDeclaration<F::Handle>,
    {
        self.repository_with::<R>(Binding::Eager)
    }

    pub fn repository_with<R>(mut self, binding: Binding) -> Self
    where
        R: RepositoryDeclaration<F::Handle>,
    {
        self.registrations
            .push(Box::new(
                move |installer: &mut RepositoryInstaller<F>, registry: &mut RepositoryRegistry| {
                    installer.install::<R>(registry, binding)
                },
            ));
        self
    }

    /// Validates `config`, then builds the unit manager and binds every
    /// declared repository.
    ///
    /// # Errors
    /// - `BundleError::Config` for an invalid configuration.
    /// - `BundleError::Logging` when logging was requested and fails to start.
    /// - `BundleError::Registration` for the first rejected repository.
    pub fn start(self, config: &CoreConfig) -> Result<RepositoryContext<F>, BundleError> {
        config.validate()?;
        if self.init_logging {
            init_logging(&config.logging)?;
        }

        let units = Arc::new(UnitManager::new(self.factory.get(config)));
        let mut installer = RepositoryInstaller::with_interceptors(
            Arc::clone(&units),
            InterceptorChain::new(self.interceptors),
        );
        let mut repositories = RepositoryRegistry::new();
        for register in self.registrations {
            register(&mut installer, &mut repositories)?;
        }

        let report = installer.report();
        info!(
            "event=bundle_start module=bundle status=ok manager={} repositories={}",
            units.id(),
            repositories.len()
        );
        Ok(RepositoryContext {
            units,
            repositories,
            report,
        })
    }
}

/// Result of a successful bundle start.
pub struct RepositoryContext<F: ConnectionFactory> {
    units: Arc<UnitManager<F>>,
    repositories: RepositoryRegistry,
    report: Option<String>,
}

impl<F: ConnectionFactory> RepositoryContext<F> {
    pub fn units(&self) -> &Arc<UnitManager<F>> {
        &self.units
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    /// Resolves a bound repository façade.
    pub fn repository<R>(&self) -> RegistrationResult<Arc<R>>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        self.repositories.require::<R>()
    }

    /// The `repositories = ` report emitted at startup.
    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{BundleError, RepositoryBundle};
    use crate::config::CoreConfig;
    use crate::db::{DbError, SqliteHandle};
    use crate::dispatch::{Binding, RegistrationError, SqlObject};
    use crate::unit::{SharedResolver, UnitError};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ClockError {
        #[error(transparent)]
        Unit(#[from] UnitError),
        #[error(transparent)]
        Db(#[from] DbError),
    }

    pub trait Clock: Send + Sync {
        fn now(&self) -> Result<String, ClockError>;
    }

    struct SqliteClock {
        resolver: SharedResolver<SqliteHandle>,
    }

    impl SqlObject<SqliteHandle> for SqliteClock {
        fn attach(resolver: SharedResolver<SqliteHandle>) -> Self {
            Self { resolver }
        }
    }

    impl Clock for SqliteClock {
        fn now(&self) -> Result<String, ClockError> {
            let now = self.resolver.resolve()?.with_connection(|conn| {
                conn.query_row("SELECT 'tick'", [], |row| row.get::<_, String>(0))
                    .map_err(DbError::from)
            })?;
            Ok(now)
        }
    }

    crate::repository_facade! {
        struct ClockFacade: Clock => SqliteClock {
            fn now(&self) -> Result<String, ClockError>;
        }
    }

    #[test]
    fn start_binds_repositories_and_reports_them() {
        let context = RepositoryBundle::sqlite()
            .repository::<ClockFacade>()
            .start(&CoreConfig::default())
            .expect("bundle start");

        assert_eq!(context.report(), Some("repositories = \n    (Clock)"));
        let clock = context.repository::<dyn Clock>().expect("clock bound");
        let now: Result<String, Box<dyn std::error::Error>> =
            context.units().in_unit(|| Ok(clock.now()?));
        assert_eq!(now.expect("clock query"), "tick");
    }

    #[test]
    fn lazy_registration_aborts_start() {
        let result = RepositoryBundle::sqlite()
            .repository_with::<ClockFacade>(Binding::Lazy)
            .start(&CoreConfig::default());
        assert!(matches!(
            result,
            Err(BundleError::Registration(RegistrationError::LazyBindingUnsupported {
                repository: "Clock"
            }))
        ));
    }

    #[test]
    fn invalid_config_aborts_start() {
        let mut config = CoreConfig::default();
        config.database.busy_timeout_ms = 0;
        let result = RepositoryBundle::sqlite()
            .repository::<ClockFacade>()
            .start(&config);
        assert!(matches!(result, Err(BundleError::Config(_))));
    }
}

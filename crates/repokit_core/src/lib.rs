//! Unit-of-work and repository dispatch core.
//! Application code calls repository traits; every call runs against the
//! SQLite handle bound to the calling thread's unit of work.

pub mod bundle;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod unit;

pub use bundle::{sqlite_factory_provider, BundleError, RepositoryBundle, RepositoryContext};
pub use config::{ConfigAwareProvider, ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, SqliteConnectionFactory, SqliteHandle};
pub use dispatch::{
    invoke_delegate, Binding, CallInterceptor, CallOutcome, InterceptorChain, Invocation,
    InvocationError, LoggingInterceptor, Redirect, RegistrationError, RegistrationResult,
    RepositoryDeclaration, RepositoryInstaller, RepositoryRegistry, Reporter, SqlObject,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use unit::{
    ConnectionFactory, HandleResolver, SharedResolver, UnitError, UnitHandle, UnitManager,
    UnitResolver, UnitResult, UnitScope,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

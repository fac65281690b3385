//! Repository dispatch: declarations, façades and their registration.
//!
//! # Responsibility
//! - Create one shared delegate per declared repository trait.
//! - Bind a generated façade for that trait and forward every call to the
//!   delegate, letting interceptors observe or wrap the call.
//!
//! # Invariants
//! - One façade call produces exactly one delegate call with the same
//!   arguments, and returns exactly what the delegate returned.
//! - Delegate errors and panics reach the caller unwrapped.
//! - An interceptor's `around` failure reaches the caller as the method's own
//!   error unless the delegate failed first.
//! - All delegates of one installer share a single handle resolver.
//! - Lazy binding is rejected at registration; nothing is bound on failure.

use thiserror::Error;

mod declaration;
mod facade;
mod installer;
mod interceptor;
mod redirect;
mod registry;
mod report;

pub use declaration::{Binding, RepositoryDeclaration, SqlObject};
pub use installer::RepositoryInstaller;
pub use interceptor::{
    CallInterceptor, CallOutcome, InterceptorChain, Invocation, LoggingInterceptor,
};
pub use redirect::{invoke_delegate, InvocationError, Redirect};
pub use registry::RepositoryRegistry;
pub use report::Reporter;

pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Startup configuration errors of repository wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("lazy binding is not supported for repository {repository}")]
    LazyBindingUnsupported { repository: &'static str },
    #[error("repository {repository} is already registered")]
    Duplicate { repository: &'static str },
    #[error("repository {repository} is not registered")]
    NotBound { repository: &'static str },
}

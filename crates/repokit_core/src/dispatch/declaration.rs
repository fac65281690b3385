//! Contracts between declared repository traits and the installer.

use super::Redirect;
use crate::unit::SharedResolver;
use std::sync::Arc;

/// How a repository is requested to be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Eager,
    /// Unsupported: the delegate must exist before the first façade call.
    Lazy,
}

/// SQL-backed delegate construction.
///
/// A delegate executes every method against whatever handle `resolver`
/// currently resolves to, so one instance serves all threads.
pub trait SqlObject<H>: Sized {
    fn attach(resolver: SharedResolver<H>) -> Self;
}

/// A repository trait paired with its generated façade.
///
/// Implemented by `repository_facade!`; `Api` is the trait object type
/// application code resolves from the registry.
pub trait RepositoryDeclaration<H>: 'static {
    type Api: ?Sized + Send + Sync + 'static;

    /// Name used in reports and registration errors.
    fn repository_name() -> &'static str {
        std::any::type_name::<Self::Api>()
    }

    fn delegate(resolver: SharedResolver<H>) -> Arc<Self::Api>;

    fn facade(redirect: Redirect<Self::Api>) -> Arc<Self::Api>;
}

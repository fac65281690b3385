//! Typed binding table for repository façades.

use super::{RegistrationError, RegistrationResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

struct Entry {
    name: &'static str,
    // Always an `Arc<R>` for the `R` whose `TypeId` keys this entry.
    value: Box<dyn Any + Send + Sync>,
}

/// Maps a repository trait object type to its process-lifetime façade.
#[derive(Default)]
pub struct RepositoryRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` as the singleton for `R`.
    ///
    /// # Errors
    /// - `RegistrationError::Duplicate` when `R` is already bound; the
    ///   existing binding is kept.
    pub fn bind<R>(&mut self, name: &'static str, value: Arc<R>) -> RegistrationResult<()>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<R>();
        if self.entries.contains_key(&key) {
            return Err(RegistrationError::Duplicate { repository: name });
        }
        self.entries.insert(
            key,
            Entry {
                name,
                value: Box::new(value),
            },
        );
        Ok(())
    }

    pub fn get<R>(&self) -> Option<Arc<R>>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.value.downcast_ref::<Arc<R>>())
            .cloned()
    }

    /// Like [`get`](Self::get), but a missing binding is an error.
    pub fn require<R>(&self) -> RegistrationResult<Arc<R>>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        self.get::<R>().ok_or(RegistrationError::NotBound {
            repository: std::any::type_name::<R>(),
        })
    }

    pub fn contains<R>(&self) -> bool
    where
        R: ?Sized + 'static,
    {
        self.entries.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound repository names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();
        names
    }
}

impl Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("repositories", &self.names())
            .finish()
    }
}

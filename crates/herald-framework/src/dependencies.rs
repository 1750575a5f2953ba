//! Type-keyed dependency registry.
//!
//! The client owns one [`DependencyRegistry`]; callbacks reach it through
//! their context and pull the services they declared by type. This is the
//! whole injection contract the command core consumes — how a dependency got
//! constructed is none of the framework's business.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::MissingDependencyError;

/// A registry of shared values keyed by their type.
///
/// One value per type; setting a type twice replaces the previous value.
#[derive(Default)]
pub struct DependencyRegistry {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the dependency of type `T`.
    pub fn set<T: Send + Sync + 'static>(&self, value: T) {
        self.entries
            .write()
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Registers an already-shared dependency of type `T`.
    pub fn set_shared<T: Send + Sync + 'static>(&self, value: Arc<T>) {
        self.entries.write().insert(TypeId::of::<T>(), value);
    }

    /// Looks up the dependency of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Looks up the dependency of type `T`, failing loudly when absent.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, MissingDependencyError> {
        self.get::<T>().ok_or(MissingDependencyError {
            type_name: type_name::<T>(),
        })
    }

    /// Removes and returns the dependency of type `T`.
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("len", &self.entries.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Database(&'static str);

    #[test]
    fn test_set_get_roundtrip() {
        let registry = DependencyRegistry::new();
        registry.set(Database("primary"));
        assert_eq!(*registry.get::<Database>().unwrap(), Database("primary"));
    }

    #[test]
    fn test_set_replaces() {
        let registry = DependencyRegistry::new();
        registry.set(Database("first"));
        registry.set(Database("second"));
        assert_eq!(*registry.get::<Database>().unwrap(), Database("second"));
    }

    #[test]
    fn test_require_missing_names_type() {
        let registry = DependencyRegistry::new();
        let error = registry.require::<Database>().unwrap_err();
        assert!(error.type_name.contains("Database"));
    }
}

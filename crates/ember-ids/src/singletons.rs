use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{RegistryError, Result};

type Shared = Arc<dyn Any + Send + Sync>;

/// Type-keyed registry of at-most-one-per-process services.
///
/// Process-wide singletons (the attached debugger object, backend handles)
/// are resolved by type rather than by handle. The table and its mutex are
/// separate from [`IdRegistry`](crate::IdRegistry) so singleton churn never
/// contends with handle traffic.
///
/// [`FixedRegistry::install`] fails with [`RegistryError::AlreadyExists`]
/// instead of replacing a live instance; silently swapping would orphan every
/// holder of the old one. Callers that want idempotent creation use
/// [`FixedRegistry::install_or_get`].
pub struct FixedRegistry {
    table: Mutex<HashMap<TypeId, Shared>>,
}

impl FixedRegistry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Install `value` as the `T` singleton.
    pub fn install<T: Any + Send + Sync>(&self, value: T) -> Result<Arc<T>> {
        let object = Arc::new(value);
        let mut table = self.table.lock().unwrap();
        if table.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::AlreadyExists {
                type_name: type_name::<T>(),
            });
        }
        table.insert(TypeId::of::<T>(), object.clone());
        drop(table);
        log::trace!("fxm: installed {}", type_name::<T>());
        Ok(object)
    }

    /// Return the `T` singleton, constructing it if absent.
    ///
    /// `build` runs under the table lock and at most once.
    pub fn install_or_get<T, F>(&self, build: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut table = self.table.lock().unwrap();
        let shared = table
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(build()) as Shared)
            .clone();
        drop(table);
        shared
            .downcast::<T>()
            .unwrap_or_else(|_| unreachable!("entry keyed by TypeId::of::<T>() holds a T"))
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let table = self.table.lock().unwrap();
        let shared = table.get(&TypeId::of::<T>())?.clone();
        drop(table);
        shared.downcast::<T>().ok()
    }

    /// Drop the registry's reference to the `T` singleton, handing it to the
    /// caller. The object outlives this call for as long as external holders
    /// keep their references.
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let removed = {
            let mut table = self.table.lock().unwrap();
            table.remove(&TypeId::of::<T>())
        }?;
        log::trace!("fxm: removed {}", type_name::<T>());
        removed.downcast::<T>().ok()
    }

    /// Session-reset teardown: drop every singleton.
    pub fn clear(&self) {
        let old = {
            let mut table = self.table.lock().unwrap();
            std::mem::take(&mut *table)
        };
        // Dropped outside the lock; a singleton's drop may be expensive.
        drop(old);
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FixedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AudioBackend {
        #[allow(dead_code)]
        device: &'static str,
    }

    #[test]
    fn install_twice_fails_deterministically() {
        let fxm = FixedRegistry::new();
        fxm.install(AudioBackend { device: "null" }).unwrap();
        let err = fxm.install(AudioBackend { device: "alsa" }).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
        assert_eq!(fxm.len(), 1, "second install must not add an instance");
    }

    #[test]
    fn install_or_get_constructs_at_most_once() {
        let fxm = FixedRegistry::new();
        let first = fxm.install_or_get(|| AudioBackend { device: "null" });
        let second = fxm.install_or_get(|| unreachable!("must reuse the live instance"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_types_do_not_collide() {
        let fxm = FixedRegistry::new();
        fxm.install(1u32).unwrap();
        fxm.install(String::from("dbg")).unwrap();
        assert_eq!(fxm.get::<u32>().as_deref(), Some(&1));
        assert_eq!(fxm.remove::<String>().as_deref().map(String::as_str), Some("dbg"));
        assert_eq!(fxm.get::<String>(), None);
        assert_eq!(fxm.get::<u32>().as_deref(), Some(&1));
    }
}

//! Host-facing capability traits: property access and type resolution.
//!
//! The engine never resolves host types itself; it consumes a
//! [`TypeResolver`] and a [`PropertyStore`] the host provides. Resolve
//! results are memoized in a session-owned [`TypeCache`] with an explicit
//! clear lifecycle tied to host reload events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tabula_engine::engine::{PropertyType, Value};

use crate::error::PropertyError;

/// Opaque handle to a host object (one sheet row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

/// Resolved host type, as returned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeHandle {
    pub name: String,
}

/// Typed property access on host objects.
///
/// `get` and `set` operate on one (object, type, path) triple at a time;
/// there is no transactional guarantee across slots in a pass. A `set`
/// returning `Ok(false)` means the host declined the write and the
/// previous value is untouched.
pub trait PropertyStore {
    fn get(&self, object: ObjectHandle, type_name: &str, path: &str)
    -> Result<Value, PropertyError>;

    fn set(
        &mut self,
        object: ObjectHandle,
        type_name: &str,
        path: &str,
        value: Value,
    ) -> Result<bool, PropertyError>;
}

/// Host type lookup. Expected to be cheap to call but cached anyway via
/// [`TypeCache`], since resolution may hit host reflection machinery.
pub trait TypeResolver {
    fn resolve(&self, type_name: &str) -> Option<TypeHandle>;

    /// Declared type of a property reachable from `handle` via `path`.
    fn property_type(&self, handle: &TypeHandle, path: &str) -> Option<PropertyType>;
}

/// Session-owned resolve cache. Negative results are cached too, so a
/// missing type is not re-resolved every pass.
#[derive(Debug, Default)]
pub struct TypeCache {
    entries: HashMap<String, Option<TypeHandle>>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, resolver: &dyn TypeResolver, type_name: &str) -> Option<TypeHandle> {
        self.entries
            .entry(type_name.to_string())
            .or_insert_with(|| resolver.resolve(type_name))
            .clone()
    }

    /// Drop all memoized results. Call on host reload, when type
    /// definitions may have changed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeCache, TypeHandle, TypeResolver};
    use std::cell::Cell;
    use tabula_engine::engine::PropertyType;

    struct CountingResolver {
        calls: Cell<usize>,
    }

    impl TypeResolver for CountingResolver {
        fn resolve(&self, type_name: &str) -> Option<TypeHandle> {
            self.calls.set(self.calls.get() + 1);
            (type_name == "Known").then(|| TypeHandle {
                name: type_name.to_string(),
            })
        }

        fn property_type(&self, _handle: &TypeHandle, _path: &str) -> Option<PropertyType> {
            None
        }
    }

    #[test]
    fn test_type_cache_memoizes_hits_and_misses() {
        let resolver = CountingResolver { calls: Cell::new(0) };
        let mut cache = TypeCache::new();

        assert!(cache.resolve(&resolver, "Known").is_some());
        assert!(cache.resolve(&resolver, "Known").is_some());
        assert!(cache.resolve(&resolver, "Missing").is_none());
        assert!(cache.resolve(&resolver, "Missing").is_none());
        assert_eq!(resolver.calls.get(), 2);

        cache.clear();
        assert!(cache.resolve(&resolver, "Known").is_some());
        assert_eq!(resolver.calls.get(), 3);
    }
}

//! Memoizing store of built struct layouts.
//!
//! The registry is owned by the driver and passed by reference into every decoder. Each
//! qualified name maps to one slot; the first caller to lock a slot builds the layout while
//! later callers for the same name wait and observe the same `Arc`. Construction therefore
//! happens at most once per name, even when several workers reach the same type at once.
//!
//! The registry does not detect cycles itself. A layout that embeds itself by value is
//! caught by the decoder's visited set before the slot is locked.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use dashmap::DashMap;

use crate::{metadata::typesystem::StructLayout, Result};

/// One registry entry, empty until its layout is built
#[derive(Default)]
struct LayoutSlot {
    layout: Mutex<Option<Arc<StructLayout>>>,
}

/// Layouts by qualified type name
#[derive(Default)]
pub struct TypeRegistry {
    slots: DashMap<String, Arc<LayoutSlot>>,
    builds: AtomicUsize,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the layout registered under `qualified_name`, building it with `build` if
    /// this is the first request.
    ///
    /// A failed build leaves the slot empty, so a later request retries and fails the same
    /// way.
    ///
    /// # Arguments
    ///
    /// * `qualified_name` - `Namespace.Outer.Inner` key of the layout
    /// * `build` - Computes the layout; called at most once per successful key
    ///
    /// # Errors
    /// Returns the error of `build`, or [`crate::Error::LockError`] if another builder
    /// panicked while holding the slot.
    pub fn get_or_build<F>(&self, qualified_name: &str, build: F) -> Result<Arc<StructLayout>>
    where
        F: FnOnce() -> Result<StructLayout>,
    {
        let slot = self
            .slots
            .entry(qualified_name.to_string())
            .or_default()
            .clone();

        let mut layout = lock!(slot.layout)?;
        if let Some(layout) = layout.as_ref() {
            return Ok(layout.clone());
        }

        let built = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        *layout = Some(built.clone());
        Ok(built)
    }

    /// Returns an already built layout.
    #[must_use]
    pub fn get(&self, qualified_name: &str) -> Option<Arc<StructLayout>> {
        let slot = self.slots.get(qualified_name)?.clone();
        let layout = slot.layout.lock().ok()?;
        layout.clone()
    }

    /// Number of layouts built so far.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of names requested so far, built or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Error;

    fn layout(name: &str) -> StructLayout {
        StructLayout {
            name: name.to_string(),
            size: 8,
            ..StructLayout::default()
        }
    }

    #[test]
    fn memoizes() {
        let registry = TypeRegistry::new();
        let first = registry.get_or_build("A.POINT", || Ok(layout("POINT"))).unwrap();
        let second = registry
            .get_or_build("A.POINT", || panic!("rebuilt a cached layout"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.build_count(), 1);
        assert!(registry.get("A.POINT").is_some());
        assert!(registry.get("A.RECT").is_none());
    }

    #[test]
    fn failed_build_is_not_cached() {
        let registry = TypeRegistry::new();
        let result =
            registry.get_or_build("A.BAD", || Err(Error::Unsupported("bad".to_string())));
        assert!(result.is_err());
        assert!(registry.get("A.BAD").is_none());
        assert_eq!(registry.build_count(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_requests_build_once() {
        let registry = Arc::new(TypeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry
                        .get_or_build("A.SHARED", || {
                            thread::sleep(std::time::Duration::from_millis(5));
                            Ok(layout("SHARED"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let layouts: Vec<Arc<StructLayout>> =
            handles.into_iter().map(|handle| handle.join().unwrap()).collect();
        assert!(layouts.iter().all(|other| Arc::ptr_eq(other, &layouts[0])));
        assert_eq!(registry.build_count(), 1);
    }
}

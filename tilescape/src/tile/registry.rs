//! Shared element id registry.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Set of element ids already emitted by some loaded tile.
///
/// Many tiles read concurrently while loading in parallel; inserts and
/// removals take the write lock. A poisoned lock is recovered, since every
/// operation is a single set mutation.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    ids: RwLock<HashSet<u64>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.read().contains(&id)
    }

    /// Inserts `id`, returning `true` if it was not present.
    pub fn insert(&self, id: u64) -> bool {
        self.write().insert(id)
    }

    pub fn remove(&self, id: u64) -> bool {
        self.write().remove(&id)
    }

    /// Removes every id in `ids` under a single write lock.
    pub fn remove_all<'a>(&self, ids: impl IntoIterator<Item = &'a u64>) {
        let mut registered = self.write();
        for id in ids {
            registered.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashSet<u64>> {
        self.ids.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<u64>> {
        self.ids.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_insert_reports_novelty() {
        let registry = ElementRegistry::new();
        assert!(registry.insert(7));
        assert!(!registry.insert(7));
        assert!(registry.contains(7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_all() {
        let registry = ElementRegistry::new();
        for id in 0..10 {
            registry.insert(id);
        }
        registry.remove_all(&[1, 3, 5]);
        assert_eq!(registry.len(), 7);
        assert!(!registry.contains(3));
        assert!(registry.contains(4));
    }

    #[test]
    fn test_poisoned_lock_keeps_working() {
        let registry = Arc::new(ElementRegistry::new());
        registry.insert(1);

        let poisoner = Arc::clone(&registry);
        let result = thread::spawn(move || {
            let _guard = poisoner.ids.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();
        assert!(result.is_err());
        assert!(registry.ids.is_poisoned());

        assert!(registry.contains(1));
        assert!(registry.insert(2));
        assert!(!registry.insert(2));
        assert!(registry.remove(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_admit_each_id_once() {
        let registry = Arc::new(ElementRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (0..1000u64).filter(|id| registry.insert(*id)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 1000);
        assert_eq!(registry.len(), 1000);
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Table of named reader-writer locks, one per identity currently in use.
///
/// Serializes check-then-act sequences (bucket create/delete, object
/// dedup-check → rename → metadata write) on the same identity while letting
/// different identities proceed in parallel. A bucket identity is held shared
/// by object writers and exclusively by bucket create/delete. Slots are
/// dropped once no caller holds or waits on them. Only coordinates threads of
/// one process.
#[derive(Default)]
pub struct IdentityLocks {
    slots: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key` exclusively.
    pub fn with<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let slot = self.acquire_slot(key);
        let result = {
            let _held = slot.write().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release_slot(key, slot);
        result
    }

    /// Run `f` while holding the lock for `key` shared with other readers.
    pub fn with_shared<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let slot = self.acquire_slot(key);
        let result = {
            let _held = slot.read().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release_slot(key, slot);
        result
    }

    fn acquire_slot(&self, key: &str) -> Arc<RwLock<()>> {
        let mut slots = self.slots.lock().expect("lock poisoned");
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    fn release_slot(&self, key: &str, slot: Arc<RwLock<()>>) {
        let mut slots = self.slots.lock().expect("lock poisoned");
        // The table and this call are the only owners: nobody else waits.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
    }

    /// Number of identities currently locked or awaited.
    pub fn active(&self) -> usize {
        self.slots.lock().expect("lock poisoned").len()
    }
}

impl std::fmt::Debug for IdentityLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityLocks")
            .field("active", &self.active())
            .finish()
    }
}

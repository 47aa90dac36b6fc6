//! Per-OS-thread ambient storage
//!
//! Each OS thread is its own logical call chain. This is the natural choice
//! for synchronous applications and for test harnesses that run every test on
//! its own thread. Values never cross threads, so unrelated chains are
//! isolated by construction.

use crate::token::StorageToken;
use crate::ContextualStorage;
use ambit_core::error::Result;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static SLOT: RefCell<HashMap<String, StorageToken>> = RefCell::new(HashMap::new());
}

/// Ambient storage backed by a `thread_local!` slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLocalStorage;

impl ThreadLocalStorage {
    /// New storage handle. All handles on one thread share the same slot.
    pub fn new() -> Self {
        ThreadLocalStorage
    }
}

impl ContextualStorage for ThreadLocalStorage {
    fn get(&self, key: &str) -> Result<Option<StorageToken>> {
        Ok(SLOT.with(|slot| slot.borrow().get(key).cloned()))
    }

    fn set(&self, key: &str, value: StorageToken) -> Result<()> {
        SLOT.with(|slot| slot.borrow_mut().insert(key.to_string(), value));
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        SLOT.with(|slot| slot.borrow().contains_key(key))
    }

    fn remove(&self, key: &str) -> Result<()> {
        SLOT.with(|slot| slot.borrow_mut().remove(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = ThreadLocalStorage::new();
        let token = StorageToken::mint();

        assert!(storage.get("k").unwrap().is_none());
        storage.set("k", token.clone()).unwrap();
        assert_eq!(storage.get("k").unwrap(), Some(token));
        assert!(storage.exists("k"));

        storage.remove("k").unwrap();
        assert!(!storage.exists("k"));
    }

    #[test]
    fn test_threads_do_not_share_slots() {
        let storage = ThreadLocalStorage::new();
        storage.set("k", StorageToken::mint()).unwrap();

        let seen_elsewhere = std::thread::spawn(|| {
            let storage = ThreadLocalStorage::new();
            storage.exists("k")
        })
        .join()
        .unwrap();

        assert!(!seen_elsewhere);
        assert!(storage.exists("k"));
    }
}

//! Per-task ambient storage for asynchronous call chains
//!
//! Values flow forward through every `.await` within one chain, because the
//! whole chain runs inside a single task-local scope. Propagation is
//! forward-only: a fork snapshots the parent's slot at fork time, and nothing
//! written inside the fork ever becomes visible to the parent or to sibling
//! forks.
//!
//! Unlike a thread-local, a task-local slot must be entered explicitly.
//! [`TaskLocalStorage::chain`] starts a fresh chain (one per request or
//! top-level job); [`TaskLocalStorage::fork`] carries a copy of the current
//! slot into a spawned subtask. Using the storage outside either is a
//! configuration error, not a panic.

use crate::token::StorageToken;
use crate::ContextualStorage;
use ambit_core::error::{AmbientError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

tokio::task_local! {
    static SLOT: RefCell<HashMap<String, StorageToken>>;
}

/// Ambient storage backed by a `tokio::task_local!` slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalStorage;

impl TaskLocalStorage {
    /// New storage handle. All handles within one chain share the same slot.
    pub fn new() -> Self {
        TaskLocalStorage
    }

    /// Run `fut` inside a fresh chain with an empty slot.
    pub fn chain<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        SLOT.scope(RefCell::new(HashMap::new()), fut)
    }

    /// Run `fut` inside a fork of the current chain.
    ///
    /// The slot contents are snapshotted here, at the call site, so the
    /// returned future can be handed to `tokio::spawn` and still observe the
    /// parent's value at fork time. Called outside a chain, the fork starts
    /// empty.
    pub fn fork<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        let snapshot = SLOT
            .try_with(|slot| slot.borrow().clone())
            .unwrap_or_default();
        SLOT.scope(RefCell::new(snapshot), fut)
    }

    /// Run a synchronous closure inside a fresh chain.
    ///
    /// Useful for driving the scope machinery from blocking sections of an
    /// otherwise asynchronous program.
    pub fn sync_chain<F: FnOnce() -> R, R>(f: F) -> R {
        SLOT.sync_scope(RefCell::new(HashMap::new()), f)
    }
}

impl ContextualStorage for TaskLocalStorage {
    fn get(&self, key: &str) -> Result<Option<StorageToken>> {
        SLOT.try_with(|slot| slot.borrow().get(key).cloned())
            .map_err(|_| AmbientError::NoAmbientChain)
    }

    fn set(&self, key: &str, value: StorageToken) -> Result<()> {
        SLOT.try_with(|slot| {
            slot.borrow_mut().insert(key.to_string(), value);
        })
        .map_err(|_| AmbientError::NoAmbientChain)
    }

    fn exists(&self, key: &str) -> bool {
        SLOT.try_with(|slot| slot.borrow().contains_key(key))
            .unwrap_or(false)
    }

    fn remove(&self, key: &str) -> Result<()> {
        SLOT.try_with(|slot| {
            slot.borrow_mut().remove(key);
        })
        .map_err(|_| AmbientError::NoAmbientChain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outside_chain_is_an_error() {
        let storage = TaskLocalStorage::new();
        assert!(matches!(
            storage.set("k", StorageToken::mint()),
            Err(AmbientError::NoAmbientChain)
        ));
        assert!(!storage.exists("k"));
    }

    #[tokio::test]
    async fn test_value_flows_forward_across_await() {
        TaskLocalStorage::chain(async {
            let storage = TaskLocalStorage::new();
            let token = StorageToken::mint();
            storage.set("k", token.clone()).unwrap();

            tokio::task::yield_now().await;

            assert_eq!(storage.get("k").unwrap(), Some(token));
        })
        .await;
    }

    #[tokio::test]
    async fn test_fork_sees_snapshot_but_writes_stay_local() {
        TaskLocalStorage::chain(async {
            let storage = TaskLocalStorage::new();
            let parent_token = StorageToken::mint();
            storage.set("k", parent_token.clone()).unwrap();

            let fork_token = StorageToken::mint();
            let seen_in_fork = tokio::spawn(TaskLocalStorage::fork({
                let fork_token = fork_token.clone();
                async move {
                    let storage = TaskLocalStorage::new();
                    let seen = storage.get("k").unwrap();
                    storage.set("k", fork_token).unwrap();
                    seen
                }
            }))
            .await
            .unwrap();

            // Fork observed the parent's value at fork time.
            assert_eq!(seen_in_fork, Some(parent_token.clone()));
            // The fork's write never propagated backward.
            assert_eq!(storage.get("k").unwrap(), Some(parent_token));
            assert_ne!(storage.get("k").unwrap(), Some(fork_token));
        })
        .await;
    }

    #[tokio::test]
    async fn test_sibling_forks_are_isolated() {
        TaskLocalStorage::chain(async {
            let storage = TaskLocalStorage::new();
            storage.set("k", StorageToken::mint()).unwrap();

            let first = tokio::spawn(TaskLocalStorage::fork(async {
                let storage = TaskLocalStorage::new();
                storage.set("branch", StorageToken::mint()).unwrap();
                storage.exists("branch")
            }));
            let second = tokio::spawn(TaskLocalStorage::fork(async {
                tokio::task::yield_now().await;
                TaskLocalStorage::new().exists("branch")
            }));

            assert!(first.await.unwrap());
            // A sibling must not observe a peer's later pushes.
            assert!(!second.await.unwrap());
            assert!(!storage.exists("branch"));
        })
        .await;
    }

    #[test]
    fn test_sync_chain() {
        let seen = TaskLocalStorage::sync_chain(|| {
            let storage = TaskLocalStorage::new();
            storage.set("k", StorageToken::mint()).unwrap();
            storage.exists("k")
        });
        assert!(seen);
    }
}

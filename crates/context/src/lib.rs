//! Ambient contextual storage for logical call chains
//!
//! A logical call chain needs exactly one piece of ambient state: the
//! cross-reference token pointing at its scope stack. This crate defines the
//! [`ContextualStorage`] contract for that slot, two implementations
//! ([`ThreadLocalStorage`] for synchronous per-thread chains,
//! [`TaskLocalStorage`] for asynchronous per-task chains), and the
//! process-wide selector that installs the active implementation.
//!
//! Values set in a chain are visible to logically descendant operations,
//! including across asynchronous suspension points, but never to unrelated
//! concurrently-executing chains.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod task_local;
mod thread_local;
mod token;

pub use task_local::TaskLocalStorage;
pub use thread_local::ThreadLocalStorage;
pub use token::StorageToken;

use ambit_core::error::{AmbientError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

/// Slot key under which the chain's cross-reference token is stored.
pub const STORAGE_KEY: &str = "ambit.scope-stack";

/// Key/value storage scoped to one logical call chain.
///
/// Implementations hold only the chain's [`StorageToken`]; the scope stack
/// itself lives in a side table keyed by that token.
pub trait ContextualStorage: Send + Sync {
    /// Read the entry for `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<StorageToken>>;

    /// Insert or replace the entry for `key`.
    fn set(&self, key: &str, value: StorageToken) -> Result<()>;

    /// Whether an entry for `key` exists in the current chain.
    fn exists(&self, key: &str) -> bool;

    /// Remove the entry for `key`, if present.
    fn remove(&self, key: &str) -> Result<()>;
}

static STORAGE: Lazy<RwLock<Option<Arc<dyn ContextualStorage>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide ambient storage implementation.
///
/// Must be called once during process startup, before any scope, factory, or
/// locator is used.
pub fn set_storage(storage: Arc<dyn ContextualStorage>) {
    tracing::debug!("ambient storage configured");
    *STORAGE.write() = Some(storage);
}

/// The configured ambient storage.
///
/// Fails with [`AmbientError::StorageNotConfigured`] if [`set_storage`] has
/// not been called.
pub fn storage() -> Result<Arc<dyn ContextualStorage>> {
    STORAGE
        .read()
        .clone()
        .ok_or(AmbientError::StorageNotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The selector is process-global; tests in other crates rely on it being
    // installed, so this module only exercises the configured path.
    #[test]
    fn test_selector_round_trip() {
        set_storage(Arc::new(ThreadLocalStorage::new()));
        let storage = storage().unwrap();
        assert!(!storage.exists(STORAGE_KEY));
    }
}

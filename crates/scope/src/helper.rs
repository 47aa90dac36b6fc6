//! Bridge between ambient storage and the scope-stack side table
//!
//! `StorageHelper` owns the token lifecycle for one storage handle: mint on
//! first use within a chain, look up and replace the chain's stack on every
//! access, and clear both sides when the chain winds down. A missing token or
//! table entry after initialization means something outside the normal
//! lifecycle cleared the storage, which is reported as a storage-integrity
//! failure rather than silently re-minting.

use crate::stack::ScopeStack;
use crate::table;
use ambit_context::{ContextualStorage, StorageToken, STORAGE_KEY};
use ambit_core::error::{AmbientError, Result};
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
pub(crate) struct StorageHelper {
    storage: Arc<dyn ContextualStorage>,
}

impl StorageHelper {
    pub fn new(storage: Arc<dyn ContextualStorage>) -> Self {
        StorageHelper { storage }
    }

    /// Mint the chain's token and register an empty stack on first use.
    ///
    /// Idempotent; later calls within the same chain are no-ops.
    pub fn initialize(&self) -> Result<()> {
        if self.storage.get(STORAGE_KEY)?.is_none() {
            let token = StorageToken::mint();
            trace!(token = %token, "minted ambient chain token");
            self.storage.set(STORAGE_KEY, token.clone())?;
            table::insert(&token, ScopeStack::new());
        }
        Ok(())
    }

    /// Whether the current chain already carries a token.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.storage.get(STORAGE_KEY)?.is_some())
    }

    fn token(&self) -> Result<StorageToken> {
        self.storage
            .get(STORAGE_KEY)?
            .ok_or(AmbientError::StackMissing)
    }

    /// The chain's current stack.
    pub fn stack(&self) -> Result<ScopeStack> {
        let token = self.token()?;
        table::get(&token).ok_or(AmbientError::StackMissing)
    }

    /// Replace the chain's stack with a new version.
    pub fn save(&self, stack: ScopeStack) -> Result<()> {
        let token = self.token()?;
        if table::get(&token).is_none() {
            return Err(AmbientError::StackMissing);
        }
        table::insert(&token, stack);
        Ok(())
    }

    /// Remove the chain's token and side-table entry.
    pub fn clear(&self) -> Result<()> {
        if let Some(token) = self.storage.get(STORAGE_KEY)? {
            table::remove(&token);
            self.storage.remove(STORAGE_KEY)?;
            trace!(token = %token, "cleared ambient chain token");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambit_context::ThreadLocalStorage;

    fn helper() -> StorageHelper {
        StorageHelper::new(Arc::new(ThreadLocalStorage::new()))
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let helper = helper();
        helper.initialize().unwrap();
        let token = helper.token().unwrap();

        helper.initialize().unwrap();
        assert_eq!(helper.token().unwrap(), token);

        helper.clear().unwrap();
    }

    #[test]
    fn test_stack_starts_empty_and_replaces() {
        let helper = helper();
        helper.initialize().unwrap();

        let stack = helper.stack().unwrap();
        assert!(stack.is_empty());

        helper.clear().unwrap();
    }

    #[test]
    fn test_missing_token_is_integrity_error() {
        let helper = helper();
        helper.initialize().unwrap();

        // Something bypassing the normal lifecycle clears the slot.
        let storage = ThreadLocalStorage::new();
        storage.remove(STORAGE_KEY).unwrap();

        assert!(matches!(helper.stack(), Err(AmbientError::StackMissing)));
        assert!(matches!(
            helper.save(ScopeStack::new()),
            Err(AmbientError::StackMissing)
        ));
    }

    #[test]
    fn test_missing_table_entry_is_integrity_error() {
        let helper = helper();
        helper.initialize().unwrap();
        let token = helper.token().unwrap();

        table::remove(&token);
        assert!(matches!(helper.stack(), Err(AmbientError::StackMissing)));

        helper.clear().unwrap();
    }

    #[test]
    fn test_clear_removes_both_sides() {
        let helper = helper();
        helper.initialize().unwrap();
        let token = helper.token().unwrap();

        helper.clear().unwrap();
        assert!(!table::contains(&token));
        assert!(matches!(helper.stack(), Err(AmbientError::StackMissing)));
    }
}

//! Process-wide side table mapping chain tokens to scope stacks
//!
//! The ambient slot holds only a small serializable token; the actual stack
//! of scope handles lives here, keyed by that token. Entries are removed
//! deterministically when a chain's final scope is disposed, so the table
//! never outlives its chains under normal API usage.

use crate::stack::ScopeStack;
use ambit_context::StorageToken;
use dashmap::DashMap;
use once_cell::sync::Lazy;

static TABLE: Lazy<DashMap<String, ScopeStack>> = Lazy::new(DashMap::new);

/// The stack registered under `token`, if any.
pub(crate) fn get(token: &StorageToken) -> Option<ScopeStack> {
    TABLE.get(token.as_str()).map(|entry| entry.clone())
}

/// Register or replace the stack under `token`.
pub(crate) fn insert(token: &StorageToken, stack: ScopeStack) {
    TABLE.insert(token.as_str().to_string(), stack);
}

/// Drop the entry under `token`.
pub(crate) fn remove(token: &StorageToken) {
    TABLE.remove(token.as_str());
}

#[cfg(test)]
pub(crate) fn contains(token: &StorageToken) -> bool {
    TABLE.contains_key(token.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replace_remove() {
        let token = StorageToken::mint();
        assert!(get(&token).is_none());

        insert(&token, ScopeStack::new());
        assert!(contains(&token));
        assert!(get(&token).unwrap().is_empty());

        remove(&token);
        assert!(!contains(&token));
    }

    #[test]
    fn test_tokens_do_not_collide() {
        let a = StorageToken::mint();
        let b = StorageToken::mint();
        insert(&a, ScopeStack::new());
        assert!(get(&b).is_none());
        remove(&a);
    }
}

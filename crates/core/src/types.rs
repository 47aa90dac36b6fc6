//! Shared types for scope construction and connection state
//!
//! `ScopeOptions` mirrors the flag-style request model: "new" and "join" are
//! independent bits validated at scope construction, because requesting both
//! (or neither) must surface as a usage error without touching the chain's
//! stack.

use serde::{Deserialize, Serialize};

/// Database transaction isolation level requested when a root scope begins
/// its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Dirty reads allowed
    ReadUncommitted,
    /// Only committed data is visible (the default)
    ReadCommitted,
    /// Reads repeat within the transaction
    RepeatableRead,
    /// Full serializable isolation
    Serializable,
}

impl Default for IsolationLevel {
    fn default() -> Self {
        IsolationLevel::ReadCommitted
    }
}

/// Observable state of a database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not yet opened, or closed again
    Closed,
    /// Ready for commands
    Open,
    /// Unusable after a driver-level failure
    Broken,
}

/// Construction options for an ambient scope.
///
/// Exactly one of `new_scope` / `join` must be set. `suppress` and
/// `isolation` only take effect on a root scope; a joined scope reads both
/// from its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Always create a new root scope owning its own connection
    pub new_scope: bool,
    /// Join the chain's current topmost scope
    pub join: bool,
    /// Disable implicit transaction creation for the root
    pub suppress: bool,
    /// Isolation level for the root's transaction
    pub isolation: IsolationLevel,
}

impl ScopeOptions {
    /// Options for a new root scope with default isolation.
    pub fn new_scope() -> Self {
        ScopeOptions {
            new_scope: true,
            join: false,
            suppress: false,
            isolation: IsolationLevel::default(),
        }
    }

    /// Options for joining the currently active scope.
    pub fn join() -> Self {
        ScopeOptions {
            new_scope: false,
            join: true,
            suppress: false,
            isolation: IsolationLevel::default(),
        }
    }

    /// Disable implicit transaction creation.
    pub fn suppress(mut self) -> Self {
        self.suppress = true;
        self
    }

    /// Select the transaction isolation level.
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Whether exactly one of new/join was requested.
    pub fn is_valid(&self) -> bool {
        self.new_scope != self.join
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_default_is_read_committed() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_new_scope_options() {
        let opts = ScopeOptions::new_scope();
        assert!(opts.new_scope);
        assert!(!opts.join);
        assert!(!opts.suppress);
        assert!(opts.is_valid());
    }

    #[test]
    fn test_join_options() {
        let opts = ScopeOptions::join();
        assert!(opts.join);
        assert!(!opts.new_scope);
        assert!(opts.is_valid());
    }

    #[test]
    fn test_builder_flags() {
        let opts = ScopeOptions::new_scope()
            .suppress()
            .isolation(IsolationLevel::Serializable);
        assert!(opts.suppress);
        assert_eq!(opts.isolation, IsolationLevel::Serializable);
    }

    #[test]
    fn test_both_or_neither_is_invalid() {
        let mut both = ScopeOptions::new_scope();
        both.join = true;
        assert!(!both.is_valid());

        let mut neither = ScopeOptions::join();
        neither.join = false;
        assert!(!neither.is_valid());
    }
}

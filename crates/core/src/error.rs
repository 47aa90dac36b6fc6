//! Error types for the ambient scope machinery
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Variants fall into four classes:
//! - configuration errors (caller must fix process wiring before retrying)
//! - usage/protocol errors (caller logic bugs, never retried)
//! - storage-integrity errors (external interference with the ambient storage)
//! - pass-through driver and row-mapping failures

use crate::types::ConnectionState;
use thiserror::Error;

/// Result type alias for ambient scope operations
pub type Result<T> = std::result::Result<T, AmbientError>;

/// Boxed source error produced by a database driver collaborator.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the ambient scope machinery
#[derive(Debug, Error)]
pub enum AmbientError {
    /// Ambient storage accessed before the process-wide selector was set
    #[error("ambient storage has not been configured; install a ContextualStorage implementation with set_storage before creating scopes")]
    StorageNotConfigured,

    /// Task-local storage used outside an established chain
    #[error("no ambient chain is active on this task; enter one with TaskLocalStorage::chain or TaskLocalStorage::fork")]
    NoAmbientChain,

    /// Connection factory contract violated
    #[error("the connection factory returned a database connection in a non-closed state ({state:?}); the ambient scope must own connection state from closed")]
    ConnectionNotClosed {
        /// State the factory-produced connection was actually in
        state: ConnectionState,
    },

    /// Both "new" and "join" (or neither) requested at scope construction
    #[error("the scope options must select either a new scope or a join, not both and not neither")]
    InvalidScopeOptions,

    /// A new root scope was requested without a connection
    #[error("must specify a database connection when creating a new ambient scope")]
    MissingConnection,

    /// Join requested while no scope is active in this chain
    #[error("could not find an available ambient scope to join")]
    NoScopeToJoin,

    /// Locator used while no scope is active in this chain
    #[error("could not find an active ambient scope; create one with ScopeFactory before executing queries")]
    NoActiveScope,

    /// A scope other than the current top of the stack was disposed
    #[error("could not dispose the ambient scope because it is not the active scope; scopes are being disposed out of order")]
    OutOfOrderDisposal,

    /// The scope's connection slot is empty
    ///
    /// Happens when the facade is used after the root scope was disposed, or
    /// when a synchronous call races an in-flight asynchronous operation on
    /// the same root.
    #[error("the ambient scope's connection is unavailable; the root scope may have been disposed")]
    ConnectionUnavailable,

    /// The chain's stack or cross-reference token is missing from storage
    #[error("could not find the ambient scope stack in storage")]
    StackMissing,

    /// Dispose was called while the chain's stack is already empty
    #[error("could not dispose the ambient scope because it does not exist in storage")]
    ScopeNotInStorage,

    /// Failure surfaced by the database driver collaborator
    #[error("database driver error: {0}")]
    Driver(#[source] DriverError),

    /// A row could not be deserialized into the requested type
    #[error("row mapping error: {0}")]
    RowMapping(#[from] serde_json::Error),
}

impl AmbientError {
    /// Wrap a driver-level failure.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        AmbientError::Driver(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_storage_not_configured() {
        let msg = AmbientError::StorageNotConfigured.to_string();
        assert!(msg.contains("has not been configured"));
        assert!(msg.contains("set_storage"));
    }

    #[test]
    fn test_error_display_connection_not_closed() {
        let err = AmbientError::ConnectionNotClosed {
            state: ConnectionState::Open,
        };
        let msg = err.to_string();
        assert!(msg.contains("non-closed state"));
        assert!(msg.contains("Open"));
    }

    #[test]
    fn test_error_display_missing_connection() {
        let msg = AmbientError::MissingConnection.to_string();
        assert!(msg.contains("must specify a database connection"));
    }

    #[test]
    fn test_error_display_no_scope_to_join() {
        let msg = AmbientError::NoScopeToJoin.to_string();
        assert!(msg.contains("to join"));
    }

    #[test]
    fn test_error_display_out_of_order_disposal() {
        let msg = AmbientError::OutOfOrderDisposal.to_string();
        assert!(msg.contains("disposed out of order"));
    }

    #[test]
    fn test_error_display_no_active_scope() {
        let msg = AmbientError::NoActiveScope.to_string();
        assert!(msg.contains("active ambient scope"));
        assert!(msg.contains("before executing queries"));
    }

    #[test]
    fn test_error_display_stack_missing() {
        let msg = AmbientError::StackMissing.to_string();
        assert!(msg.contains("stack in storage"));
    }

    #[test]
    fn test_error_driver_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = AmbientError::driver(io);
        assert!(err.to_string().contains("database driver error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

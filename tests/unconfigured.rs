//! Behavior before `set_storage` has been called.
//!
//! The storage selector is process-global, so these tests live in their own
//! binary and never install a storage implementation.

use ambit::testing::{DriverLog, MockConnectionFactory, MockExecutor};
use ambit::{chain_depth, AmbientError, AmbientScope, ScopeFactory, ScopeLocator};
use std::sync::Arc;

#[test]
fn test_scope_creation_requires_configured_storage() {
    assert!(matches!(
        AmbientScope::join(),
        Err(AmbientError::StorageNotConfigured)
    ));
}

#[test]
fn test_factory_requires_configured_storage() {
    let log = DriverLog::new();
    let factory = ScopeFactory::new(
        Arc::new(MockConnectionFactory::new(Arc::clone(&log))),
        MockExecutor::new(),
    );
    assert!(matches!(
        factory.create(),
        Err(AmbientError::StorageNotConfigured)
    ));
    // The vended connection was never opened.
    assert_eq!(log.opens(), 0);
}

#[test]
fn test_locator_requires_configured_storage() {
    assert!(matches!(
        ScopeLocator::new(),
        Err(AmbientError::StorageNotConfigured)
    ));
}

#[test]
fn test_chain_depth_requires_configured_storage() {
    assert!(matches!(
        chain_depth(),
        Err(AmbientError::StorageNotConfigured)
    ));
}

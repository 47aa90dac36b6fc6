//! Root scope construction with eager preparation
//!
//! The factory vends a connection, verifies the vendor contract (connections
//! arrive closed), creates the root scope, and opens the connection and
//! begins the transaction up front. Code that prefers lazy preparation
//! builds an [`AmbientScope`] directly.

use crate::scope::{AmbientScope, RootDriver};
use crate::ActiveScope;
use ambit_core::error::{AmbientError, Result};
use ambit_core::traits::{ConnectionFactory, QueryExecutor};
use ambit_core::types::{ConnectionState, IsolationLevel, ScopeOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates fully prepared root scopes.
pub struct ScopeFactory {
    connections: Arc<dyn ConnectionFactory>,
    executor: Arc<dyn QueryExecutor>,
}

impl ScopeFactory {
    /// Build a factory over a connection vendor and an executor.
    pub fn new(
        connections: Arc<dyn ConnectionFactory>,
        executor: Arc<dyn QueryExecutor>,
    ) -> ScopeFactory {
        ScopeFactory {
            connections,
            executor,
        }
    }

    fn vend(&self) -> Result<RootDriver> {
        let connection = self.connections.create()?;
        let state = connection.state();
        if state != ConnectionState::Closed {
            return Err(AmbientError::ConnectionNotClosed { state });
        }
        Ok(RootDriver {
            connection,
            executor: Arc::clone(&self.executor),
        })
    }

    /// Create a prepared root scope with default options.
    pub fn create(&self) -> Result<AmbientScope> {
        self.create_with(false, IsolationLevel::default())
    }

    /// Create a prepared root scope with explicit options.
    ///
    /// With `suppress` set, the connection is still opened eagerly but no
    /// transaction is begun, now or on later queries.
    pub fn create_with(&self, suppress: bool, isolation: IsolationLevel) -> Result<AmbientScope> {
        let driver = self.vend()?;
        let mut options = ScopeOptions::new_scope().isolation(isolation);
        if suppress {
            options = options.suppress();
        }
        let scope = AmbientScope::new(options, Some(driver))?;
        if let Err(err) = scope.prepare() {
            // An unpreparable root must not stay on the chain's stack.
            if let Err(cleanup) = scope.dispose() {
                warn!(error = %cleanup, "failed to unwind unprepared root scope");
            }
            return Err(err);
        }
        debug!(suppress, ?isolation, "prepared root scope created");
        Ok(scope)
    }

    /// Asynchronous [`ScopeFactory::create`].
    pub async fn create_async(&self) -> Result<AmbientScope> {
        self.create_with_async(false, IsolationLevel::default())
            .await
    }

    /// Asynchronous [`ScopeFactory::create_with`].
    pub async fn create_with_async(
        &self,
        suppress: bool,
        isolation: IsolationLevel,
    ) -> Result<AmbientScope> {
        let driver = self.vend()?;
        let mut options = ScopeOptions::new_scope().isolation(isolation);
        if suppress {
            options = options.suppress();
        }
        let scope = AmbientScope::new(options, Some(driver))?;
        if let Err(err) = scope.prepare_async_gated().await {
            if let Err(cleanup) = scope.dispose() {
                warn!(error = %cleanup, "failed to unwind unprepared root scope");
            }
            return Err(err);
        }
        debug!(suppress, ?isolation, "prepared root scope created");
        Ok(scope)
    }

    /// Create a root scope when the chain is empty, otherwise join the
    /// active scope.
    pub fn create_or_join(&self) -> Result<AmbientScope> {
        if crate::chain_depth()? == 0 {
            self.create()
        } else {
            AmbientScope::join()
        }
    }

    /// Borrow the chain's active scope without creating or joining.
    pub fn active(&self) -> Result<ActiveScope> {
        crate::ScopeLocator::new()?.get()
    }
}

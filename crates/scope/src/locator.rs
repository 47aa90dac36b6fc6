//! Locating the chain's active scope
//!
//! Plumbing-level code (interceptors, repositories) that wants to run a
//! query against whatever scope is ambient, without creating or joining one,
//! goes through the locator. The returned [`ActiveScope`] exposes only the
//! query facade and lifecycle reads; commit, rollback, and dispose stay with
//! the code that created the scope.

use crate::helper::StorageHelper;
use crate::scope::AmbientScope;
use ambit_core::command::SqlCommand;
use ambit_core::error::{AmbientError, Result};
use ambit_core::row::Row;
use ambit_core::traits::RowReader;
use ambit_core::types::{ConnectionState, IsolationLevel};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Finds the active scope of the current ambient chain.
pub struct ScopeLocator {
    helper: StorageHelper,
}

impl ScopeLocator {
    /// Build a locator over the configured ambient storage.
    pub fn new() -> Result<ScopeLocator> {
        let storage = ambit_context::storage()?;
        Ok(ScopeLocator {
            helper: StorageHelper::new(storage),
        })
    }

    /// The chain's active scope, or [`AmbientError::NoActiveScope`] when the
    /// chain is empty.
    ///
    /// A lookup never mints a chain token; a chain that has not started any
    /// scope is reported as having no active scope, not materialized.
    pub fn get(&self) -> Result<ActiveScope> {
        if !self.helper.is_initialized()? {
            return Err(AmbientError::NoActiveScope);
        }
        let stack = self.helper.stack()?;
        let scope = stack.peek().ok_or(AmbientError::NoActiveScope)?.clone();
        Ok(ActiveScope { scope })
    }
}

/// A borrowed view of the chain's active scope.
///
/// Delegates queries and lifecycle reads; deliberately omits commit,
/// rollback, and dispose.
pub struct ActiveScope {
    scope: AmbientScope,
}

impl ActiveScope {
    /// Whether the viewed scope is the chain's root.
    pub fn is_root(&self) -> bool {
        self.scope.is_root()
    }

    /// Whether implicit transaction creation is disabled.
    pub fn suppress(&self) -> bool {
        self.scope.suppress()
    }

    /// The root's transaction isolation level.
    pub fn isolation_level(&self) -> IsolationLevel {
        self.scope.isolation_level()
    }

    /// Whether a transaction is currently pending on the root.
    pub fn in_transaction(&self) -> bool {
        self.scope.in_transaction()
    }

    /// State of the root's connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.scope.connection_state()
    }

    /// Run a query and map every row onto `T`.
    pub fn query<T: DeserializeOwned>(&self, command: impl Into<SqlCommand>) -> Result<Vec<T>> {
        self.scope.query(command)
    }

    /// Run a query and collect the raw rows.
    pub fn query_rows(&self, command: impl Into<SqlCommand>) -> Result<Vec<Row>> {
        self.scope.query_rows(command)
    }

    /// Run a query and map the first row onto `T`, or `None` on an empty
    /// result set.
    pub fn query_first<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<T>> {
        self.scope.query_first(command)
    }

    /// Run a command and return the affected row count.
    pub fn execute(&self, command: impl Into<SqlCommand>) -> Result<u64> {
        self.scope.execute(command)
    }

    /// Run a command and return the first cell of the first row, if any.
    pub fn execute_scalar(&self, command: impl Into<SqlCommand>) -> Result<Option<Value>> {
        self.scope.execute_scalar(command)
    }

    /// Run a query and return a forward-only reader over the result set.
    pub fn query_reader(&self, command: impl Into<SqlCommand>) -> Result<Box<dyn RowReader>> {
        self.scope.query_reader(command)
    }

    /// Asynchronous [`ActiveScope::query`].
    pub async fn query_async<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Vec<T>> {
        self.scope.query_async(command).await
    }

    /// Asynchronous [`ActiveScope::query_rows`].
    pub async fn query_rows_async(&self, command: impl Into<SqlCommand>) -> Result<Vec<Row>> {
        self.scope.query_rows_async(command).await
    }

    /// Asynchronous [`ActiveScope::query_first`].
    pub async fn query_first_async<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<T>> {
        self.scope.query_first_async(command).await
    }

    /// Asynchronous [`ActiveScope::query_reader`].
    pub async fn query_reader_async(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Box<dyn RowReader>> {
        self.scope.query_reader_async(command).await
    }

    /// Asynchronous [`ActiveScope::execute`].
    pub async fn execute_async(&self, command: impl Into<SqlCommand>) -> Result<u64> {
        self.scope.execute_async(command).await
    }

    /// Asynchronous [`ActiveScope::execute_scalar`].
    pub async fn execute_scalar_async(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<Value>> {
        self.scope.execute_scalar_async(command).await
    }
}

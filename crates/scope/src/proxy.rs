//! Query facade on [`AmbientScope`]
//!
//! Every method follows the same path: prepare the root (open the
//! connection, begin the transaction unless suppressed), then hand the
//! command to the chain's executor with the connection and the pending
//! transaction attached. Joined scopes go through exactly the same code and
//! hit the root's state by construction.
//!
//! The asynchronous variants never hold the state lock across an `.await`.
//! Connection and transaction are moved out of the shared cell, the executor
//! runs, and both are restored on every path; the root's I/O gate serializes
//! concurrent async callers so the slots are never found vacated.

use crate::scope::{AmbientScope, RootShared, RootState};
use ambit_core::command::SqlCommand;
use ambit_core::error::{AmbientError, Result};
use ambit_core::row::Row;
use ambit_core::traits::{Connection, QueryExecutor, RowReader, Transaction};
use serde::de::DeserializeOwned;
use serde_json::Value;

type TakenDriver = (Box<dyn Connection>, Option<Box<dyn Transaction>>);

fn take_driver(shared: &RootShared) -> Result<TakenDriver> {
    let mut state = shared.state.lock();
    let conn = state
        .connection
        .take()
        .ok_or(AmbientError::ConnectionUnavailable)?;
    let tx = state.transaction.take();
    Ok((conn, tx))
}

fn restore_driver(shared: &RootShared, conn: Box<dyn Connection>, tx: Option<Box<dyn Transaction>>) {
    let mut state = shared.state.lock();
    state.connection = Some(conn);
    state.transaction = tx;
}

impl AmbientScope {
    fn with_driver<R>(
        &self,
        run: impl FnOnce(
            &dyn QueryExecutor,
            &mut dyn Connection,
            Option<&mut dyn Transaction>,
        ) -> Result<R>,
    ) -> Result<R> {
        self.prepare()?;
        let shared = self.shared();
        let mut state = shared.state.lock();
        let RootState {
            connection,
            transaction,
        } = &mut *state;
        let conn = connection
            .as_deref_mut()
            .ok_or(AmbientError::ConnectionUnavailable)?;
        // Reborrow the transaction per element so the trait-object lifetime
        // follows the lock guard instead of the box.
        let tx = transaction.as_deref_mut().map(|t| t as &mut dyn Transaction);
        run(&*shared.executor, conn, tx)
    }

    /// Run a query and map every row onto `T`.
    pub fn query<T: DeserializeOwned>(&self, command: impl Into<SqlCommand>) -> Result<Vec<T>> {
        let command = command.into();
        let rows = self.with_driver(|executor, conn, tx| executor.query(conn, tx, &command))?;
        rows.into_iter().map(Row::into_typed).collect()
    }

    /// Run a query and collect the raw rows.
    pub fn query_rows(&self, command: impl Into<SqlCommand>) -> Result<Vec<Row>> {
        let command = command.into();
        self.with_driver(|executor, conn, tx| executor.query(conn, tx, &command))
    }

    /// Run a query and map the first row onto `T`, or `None` on an empty
    /// result set.
    pub fn query_first<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<T>> {
        let command = command.into();
        let rows = self.with_driver(|executor, conn, tx| executor.query(conn, tx, &command))?;
        rows.into_iter().next().map(Row::into_typed).transpose()
    }

    /// Run a command and return the affected row count.
    pub fn execute(&self, command: impl Into<SqlCommand>) -> Result<u64> {
        let command = command.into();
        self.with_driver(|executor, conn, tx| executor.execute(conn, tx, &command))
    }

    /// Run a command and return the first cell of the first row, if any.
    pub fn execute_scalar(&self, command: impl Into<SqlCommand>) -> Result<Option<Value>> {
        let command = command.into();
        self.with_driver(|executor, conn, tx| executor.execute_scalar(conn, tx, &command))
    }

    /// Run a query and return a forward-only reader over the result set.
    pub fn query_reader(&self, command: impl Into<SqlCommand>) -> Result<Box<dyn RowReader>> {
        let command = command.into();
        self.with_driver(|executor, conn, tx| executor.query_reader(conn, tx, &command))
    }

    /// Asynchronous [`AmbientScope::query`].
    pub async fn query_async<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Vec<T>> {
        let rows = self.query_rows_async(command).await?;
        rows.into_iter().map(Row::into_typed).collect()
    }

    /// Asynchronous [`AmbientScope::query_rows`].
    pub async fn query_rows_async(&self, command: impl Into<SqlCommand>) -> Result<Vec<Row>> {
        let command = command.into();
        let shared = self.shared();
        let _io = shared.io_gate.lock().await;
        self.prepare_async().await?;
        let (mut conn, mut tx) = take_driver(shared)?;
        let result = shared
            .executor
            .query_async(
                conn.as_mut(),
                tx.as_deref_mut().map(|t| t as &mut dyn Transaction),
                &command,
            )
            .await;
        restore_driver(shared, conn, tx);
        result
    }

    /// Asynchronous [`AmbientScope::query_first`].
    pub async fn query_first_async<T: DeserializeOwned>(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<T>> {
        let rows = self.query_rows_async(command).await?;
        rows.into_iter().next().map(Row::into_typed).transpose()
    }

    /// Asynchronous [`AmbientScope::execute`].
    pub async fn execute_async(&self, command: impl Into<SqlCommand>) -> Result<u64> {
        let command = command.into();
        let shared = self.shared();
        let _io = shared.io_gate.lock().await;
        self.prepare_async().await?;
        let (mut conn, mut tx) = take_driver(shared)?;
        let result = shared
            .executor
            .execute_async(
                conn.as_mut(),
                tx.as_deref_mut().map(|t| t as &mut dyn Transaction),
                &command,
            )
            .await;
        restore_driver(shared, conn, tx);
        result
    }

    /// Asynchronous [`AmbientScope::execute_scalar`].
    pub async fn execute_scalar_async(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Option<Value>> {
        let command = command.into();
        let shared = self.shared();
        let _io = shared.io_gate.lock().await;
        self.prepare_async().await?;
        let (mut conn, mut tx) = take_driver(shared)?;
        let result = shared
            .executor
            .execute_scalar_async(
                conn.as_mut(),
                tx.as_deref_mut().map(|t| t as &mut dyn Transaction),
                &command,
            )
            .await;
        restore_driver(shared, conn, tx);
        result
    }

    /// Asynchronous [`AmbientScope::query_reader`].
    pub async fn query_reader_async(
        &self,
        command: impl Into<SqlCommand>,
    ) -> Result<Box<dyn RowReader>> {
        let command = command.into();
        let shared = self.shared();
        let _io = shared.io_gate.lock().await;
        self.prepare_async().await?;
        let (mut conn, mut tx) = take_driver(shared)?;
        let result = shared
            .executor
            .query_reader_async(
                conn.as_mut(),
                tx.as_deref_mut().map(|t| t as &mut dyn Transaction),
                &command,
            )
            .await;
        restore_driver(shared, conn, tx);
        result
    }
}

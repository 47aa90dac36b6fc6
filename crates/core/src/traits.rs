//! Collaborator contracts at the edge of the ambient scope machinery
//!
//! The core owns connection/transaction *lifecycle*; everything that actually
//! talks to a database is behind these traits. Drivers implement
//! [`Connection`] and [`Transaction`], wiring supplies a [`ConnectionFactory`]
//! and a [`QueryExecutor`].
//!
//! Asynchronous variants default to their synchronous counterparts so that a
//! purely synchronous driver needs no extra code.

use crate::command::SqlCommand;
use crate::error::Result;
use crate::row::Row;
use crate::types::{ConnectionState, IsolationLevel};
use async_trait::async_trait;
use serde_json::Value;

/// A database transaction handle.
///
/// Produced by [`Connection::begin`] and owned exclusively by the root scope.
/// Dropping an uncommitted transaction must dispose driver resources; whether
/// that implies rollback is the driver's concern.
pub trait Transaction: Send {
    /// Commit the transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll the transaction back.
    fn rollback(&mut self) -> Result<()>;
}

/// A database connection owned by a root scope.
///
/// The scope machinery only ever drives the state machine: factory-produced
/// connections start `Closed`, are opened lazily on first query (or eagerly
/// by the factory), and are closed and dropped when the root scope is
/// disposed.
#[async_trait]
pub trait Connection: Send {
    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Open the connection.
    fn open(&mut self) -> Result<()>;

    /// Open the connection asynchronously.
    async fn open_async(&mut self) -> Result<()> {
        self.open()
    }

    /// Close the connection.
    fn close(&mut self) -> Result<()>;

    /// Begin a transaction at the given isolation level.
    fn begin(&mut self, isolation: IsolationLevel) -> Result<Box<dyn Transaction>>;
}

/// Produces connections for new root scopes.
///
/// Contract: returned connections must be in the `Closed` state. The factory
/// violating this surfaces as [`AmbientError::ConnectionNotClosed`]
/// (connection reuse and pooling surprises are rejected up front).
///
/// [`AmbientError::ConnectionNotClosed`]: crate::error::AmbientError::ConnectionNotClosed
pub trait ConnectionFactory: Send + Sync {
    /// Create a closed connection.
    fn create(&self) -> Result<Box<dyn Connection>>;
}

/// Forward-only reader over a result set.
pub trait RowReader: Send {
    /// Advance to the next row, or `None` at the end of the result set.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Executes commands against an open connection.
///
/// The scope machinery guarantees the connection is open and the transaction
/// (when one exists) is attached before delegating; the executor does all SQL
/// interpretation, parameter binding, and result mapping.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query and collect the full result set.
    fn query(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Vec<Row>>;

    /// Run a command and return the affected row count.
    fn execute(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<u64>;

    /// Run a command and return the first cell of the first row, if any.
    fn execute_scalar(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Option<Value>> {
        let rows = self.query(connection, transaction, command)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.first_value().cloned()))
    }

    /// Run a query and return a forward-only reader over the result set.
    fn query_reader(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Box<dyn RowReader>>;

    /// Asynchronous [`QueryExecutor::query`].
    async fn query_async(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Vec<Row>> {
        self.query(connection, transaction, command)
    }

    /// Asynchronous [`QueryExecutor::execute`].
    async fn execute_async(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<u64> {
        self.execute(connection, transaction, command)
    }

    /// Asynchronous [`QueryExecutor::execute_scalar`].
    async fn execute_scalar_async(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Option<Value>> {
        self.execute_scalar(connection, transaction, command)
    }

    /// Asynchronous [`QueryExecutor::query_reader`].
    async fn query_reader_async(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Box<dyn RowReader>> {
        self.query_reader(connection, transaction, command)
    }
}

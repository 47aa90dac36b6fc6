//! Test doubles for the collaborator contracts
//!
//! This module provides in-memory mock drivers used by unit and integration
//! tests across the workspace:
//!
//! - **MockConnection**: scripted connection state machine with failure
//!   injection for open, commit, and rollback
//! - **MockConnectionFactory**: vends mock connections, optionally in a
//!   contract-violating initial state
//! - **MockExecutor**: records every command it receives and replays canned
//!   rows
//!
//! All counters and logs are shared through a [`DriverLog`] handle so tests
//! keep visibility after ownership of the connection moves into a scope.

use crate::command::SqlCommand;
use crate::error::{AmbientError, Result};
use crate::row::Row;
use crate::traits::{Connection, ConnectionFactory, QueryExecutor, RowReader, Transaction};
use crate::types::{ConnectionState, IsolationLevel};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Terminal outcome of a mock transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Still pending when last observed
    Pending,
    /// Committed
    Committed,
    /// Rolled back
    RolledBack,
}

/// Shared observation log for a mock driver family.
#[derive(Default)]
pub struct DriverLog {
    opens: AtomicUsize,
    closes: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    outcomes: Mutex<Vec<TxOutcome>>,
    isolation_levels: Mutex<Vec<IsolationLevel>>,
}

impl DriverLog {
    /// New empty log behind a shared handle.
    pub fn new() -> Arc<Self> {
        Arc::new(DriverLog::default())
    }

    /// Number of `open` calls observed.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls observed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Number of `begin` calls observed.
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Number of successful commits observed.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of successful rollbacks observed.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Final outcome of each transaction, in begin order.
    pub fn outcomes(&self) -> Vec<TxOutcome> {
        self.outcomes.lock().clone()
    }

    /// Isolation level of each transaction, in begin order.
    pub fn isolation_levels(&self) -> Vec<IsolationLevel> {
        self.isolation_levels.lock().clone()
    }
}

impl fmt::Debug for DriverLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverLog")
            .field("opens", &self.opens())
            .field("closes", &self.closes())
            .field("begins", &self.begins())
            .field("commits", &self.commits())
            .field("rollbacks", &self.rollbacks())
            .finish()
    }
}

/// Failure injection switches for [`MockConnection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FailurePlan {
    /// `open` fails
    pub fail_open: bool,
    /// `commit` fails (the transaction stays live so rollback can follow)
    pub fail_commit: bool,
    /// `rollback` fails
    pub fail_rollback: bool,
}

fn driver_failure(op: &str) -> AmbientError {
    AmbientError::driver(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("injected {op} failure"),
    ))
}

/// Scripted in-memory connection.
pub struct MockConnection {
    state: ConnectionState,
    log: Arc<DriverLog>,
    plan: FailurePlan,
}

impl MockConnection {
    /// A closed connection reporting into `log`.
    pub fn closed(log: Arc<DriverLog>) -> Self {
        MockConnection {
            state: ConnectionState::Closed,
            log,
            plan: FailurePlan::default(),
        }
    }

    /// A connection in an arbitrary initial state, for factory-contract tests.
    pub fn in_state(state: ConnectionState, log: Arc<DriverLog>) -> Self {
        MockConnection {
            state,
            log,
            plan: FailurePlan::default(),
        }
    }

    /// Attach a failure plan.
    pub fn with_failures(mut self, plan: FailurePlan) -> Self {
        self.plan = plan;
        self
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn open(&mut self) -> Result<()> {
        if self.plan.fail_open {
            self.state = ConnectionState::Broken;
            return Err(driver_failure("open"));
        }
        self.state = ConnectionState::Open;
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<Box<dyn Transaction>> {
        let index = {
            let mut outcomes = self.log.outcomes.lock();
            outcomes.push(TxOutcome::Pending);
            outcomes.len() - 1
        };
        self.log.isolation_levels.lock().push(isolation);
        self.log.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockTransaction {
            log: Arc::clone(&self.log),
            plan: self.plan,
            index,
        }))
    }
}

/// Transaction handle produced by [`MockConnection::begin`].
pub struct MockTransaction {
    log: Arc<DriverLog>,
    plan: FailurePlan,
    index: usize,
}

impl Transaction for MockTransaction {
    fn commit(&mut self) -> Result<()> {
        if self.plan.fail_commit {
            return Err(driver_failure("commit"));
        }
        self.log.commits.fetch_add(1, Ordering::SeqCst);
        self.log.outcomes.lock()[self.index] = TxOutcome::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.plan.fail_rollback {
            return Err(driver_failure("rollback"));
        }
        self.log.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.log.outcomes.lock()[self.index] = TxOutcome::RolledBack;
        Ok(())
    }
}

/// Connection factory vending mock connections.
pub struct MockConnectionFactory {
    log: Arc<DriverLog>,
    initial_state: ConnectionState,
    plan: FailurePlan,
}

impl MockConnectionFactory {
    /// A factory honoring the closed-connection contract.
    pub fn new(log: Arc<DriverLog>) -> Self {
        MockConnectionFactory {
            log,
            initial_state: ConnectionState::Closed,
            plan: FailurePlan::default(),
        }
    }

    /// A factory that violates the contract by vending connections in `state`.
    pub fn violating(state: ConnectionState, log: Arc<DriverLog>) -> Self {
        MockConnectionFactory {
            log,
            initial_state: state,
            plan: FailurePlan::default(),
        }
    }

    /// Attach a failure plan to every vended connection.
    pub fn with_failures(mut self, plan: FailurePlan) -> Self {
        self.plan = plan;
        self
    }
}

impl ConnectionFactory for MockConnectionFactory {
    fn create(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(
            MockConnection::in_state(self.initial_state, Arc::clone(&self.log))
                .with_failures(self.plan),
        ))
    }
}

/// Query executor that records commands and replays canned rows.
pub struct MockExecutor {
    rows: Mutex<Vec<Row>>,
    commands: Mutex<Vec<(SqlCommand, bool)>>,
}

impl MockExecutor {
    /// Executor returning an empty result set.
    pub fn new() -> Arc<Self> {
        Arc::new(MockExecutor {
            rows: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
        })
    }

    /// Executor replaying `rows` for every query.
    pub fn with_rows(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(MockExecutor {
            rows: Mutex::new(rows),
            commands: Mutex::new(Vec::new()),
        })
    }

    /// Every command seen so far, with whether a transaction was attached.
    pub fn commands(&self) -> Vec<(SqlCommand, bool)> {
        self.commands.lock().clone()
    }

    fn record(
        &self,
        connection: &dyn Connection,
        transaction: &Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<()> {
        // The scope must have opened the connection before delegating.
        if connection.state() != ConnectionState::Open {
            return Err(AmbientError::driver(std::io::Error::new(
                std::io::ErrorKind::Other,
                "executor invoked with a connection that is not open",
            )));
        }
        self.commands
            .lock()
            .push((command.clone(), transaction.is_some()));
        Ok(())
    }
}

#[async_trait::async_trait]
impl QueryExecutor for MockExecutor {
    fn query(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Vec<Row>> {
        self.record(connection, &transaction, command)?;
        Ok(self.rows.lock().clone())
    }

    fn execute(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<u64> {
        self.record(connection, &transaction, command)?;
        Ok(1)
    }

    fn execute_scalar(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Option<Value>> {
        self.record(connection, &transaction, command)?;
        Ok(self
            .rows
            .lock()
            .first()
            .and_then(|row| row.first_value().cloned()))
    }

    fn query_reader(
        &self,
        connection: &mut dyn Connection,
        transaction: Option<&mut dyn Transaction>,
        command: &SqlCommand,
    ) -> Result<Box<dyn RowReader>> {
        self.record(connection, &transaction, command)?;
        Ok(Box::new(VecRowReader {
            rows: self.rows.lock().clone().into_iter(),
        }))
    }
}

struct VecRowReader {
    rows: std::vec::IntoIter<Row>,
}

impl RowReader for VecRowReader {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

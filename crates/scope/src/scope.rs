//! The ambient scope entity
//!
//! An `AmbientScope` is one unit of ambient database work. A root scope owns
//! a connection and (unless suppressed) a transaction; a joined scope shares
//! the root's state outright. Scope handles have reference identity: the
//! stack-top check on disposal and the parent link both compare `Arc`
//! pointers, never contents.
//!
//! All root state lives in one shared cell (`Arc<RootShared>`). A joined
//! scope clones the root's `Arc`, so connection, transaction, suppress flag,
//! and isolation level read through to the root by construction, and any
//! write to the transaction slot is a write to the root's slot. Preparation
//! therefore converges on the root no matter which scope in the chain issues
//! the first query.
//!
//! Connection opening and transaction creation are lazy: nothing touches the
//! driver until the first query (or an eager `ScopeFactory::create`).

use crate::helper::StorageHelper;
use ambit_core::error::{AmbientError, Result};
use ambit_core::traits::{Connection, QueryExecutor, Transaction};
use ambit_core::types::{ConnectionState, IsolationLevel, ScopeOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Driver bundle a new root scope takes ownership of.
pub struct RootDriver {
    /// The connection the root scope will own; must start closed
    pub connection: Box<dyn Connection>,
    /// Executor the whole chain delegates queries to
    pub executor: Arc<dyn QueryExecutor>,
}

pub(crate) struct RootState {
    pub connection: Option<Box<dyn Connection>>,
    pub transaction: Option<Box<dyn Transaction>>,
}

pub(crate) struct RootShared {
    pub suppress: bool,
    pub isolation: IsolationLevel,
    pub executor: Arc<dyn QueryExecutor>,
    pub state: Mutex<RootState>,
    /// Serializes asynchronous facade calls against one root so concurrent
    /// read-only forks queue instead of finding the connection slot vacated.
    pub io_gate: tokio::sync::Mutex<()>,
}

struct ScopeInner {
    shared: Arc<RootShared>,
    parent: Option<AmbientScope>,
    helper: StorageHelper,
    disposed: AtomicBool,
}

/// One unit of ambient database work.
///
/// Created through [`ScopeFactory`](crate::ScopeFactory) or by joining the
/// chain's active scope directly; every scope must be disposed in strict
/// reverse-of-creation order, and only the root's `commit`/`rollback` act on
/// the transaction.
#[derive(Clone)]
pub struct AmbientScope {
    inner: Arc<ScopeInner>,
}

impl AmbientScope {
    /// Create a new root scope or join the chain's active scope.
    ///
    /// `driver` is required when creating new and ignored when joining (a
    /// joined scope always shares its parent's connection and executor).
    pub fn new(options: ScopeOptions, driver: Option<RootDriver>) -> Result<AmbientScope> {
        if !options.is_valid() {
            return Err(AmbientError::InvalidScopeOptions);
        }

        let storage = ambit_context::storage()?;
        let helper = StorageHelper::new(storage);
        let minted = !helper.is_initialized()?;
        helper.initialize()?;

        let outcome = AmbientScope::construct(options, driver, helper.clone());
        if outcome.is_err() && minted {
            // A failed construction on a fresh chain must not leave the
            // minted token and its empty side-table entry behind.
            if let Err(cleanup) = helper.clear() {
                warn!(error = %cleanup, "failed to unwind freshly minted chain token");
            }
        }
        outcome
    }

    fn construct(
        options: ScopeOptions,
        driver: Option<RootDriver>,
        helper: StorageHelper,
    ) -> Result<AmbientScope> {
        let stack = helper.stack()?;

        let inner = if options.join {
            let parent = stack.peek().ok_or(AmbientError::NoScopeToJoin)?.clone();
            debug!("joined ambient scope chain at depth {}", stack.len());
            ScopeInner {
                shared: Arc::clone(&parent.inner.shared),
                parent: Some(parent),
                helper,
                disposed: AtomicBool::new(false),
            }
        } else {
            let driver = driver.ok_or(AmbientError::MissingConnection)?;
            debug!(isolation = ?options.isolation, suppress = options.suppress, "created root ambient scope");
            ScopeInner {
                shared: Arc::new(RootShared {
                    suppress: options.suppress,
                    isolation: options.isolation,
                    executor: driver.executor,
                    state: Mutex::new(RootState {
                        connection: Some(driver.connection),
                        transaction: None,
                    }),
                    io_gate: tokio::sync::Mutex::new(()),
                }),
                parent: None,
                helper,
                disposed: AtomicBool::new(false),
            }
        };

        let scope = AmbientScope {
            inner: Arc::new(inner),
        };
        let stack = stack.push(scope.clone());
        scope.inner.helper.save(stack)?;

        Ok(scope)
    }

    /// Join the chain's currently active scope.
    ///
    /// Fails with [`AmbientError::NoScopeToJoin`] when no scope is active.
    pub fn join() -> Result<AmbientScope> {
        AmbientScope::new(ScopeOptions::join(), None)
    }

    /// Whether this scope is a root (owns its connection).
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// The scope this one joined, if any.
    pub fn parent(&self) -> Option<&AmbientScope> {
        self.inner.parent.as_ref()
    }

    /// Whether implicit transaction creation is disabled, read through to
    /// the root.
    pub fn suppress(&self) -> bool {
        self.inner.shared.suppress
    }

    /// The root's transaction isolation level.
    pub fn isolation_level(&self) -> IsolationLevel {
        self.inner.shared.isolation
    }

    /// Whether a transaction is currently pending on the root.
    pub fn in_transaction(&self) -> bool {
        self.inner.shared.state.lock().transaction.is_some()
    }

    /// Whether the root still owns a connection.
    pub fn has_connection(&self) -> bool {
        self.inner.shared.state.lock().connection.is_some()
    }

    /// State of the root's connection; `Closed` once the root is disposed.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner
            .shared
            .state
            .lock()
            .connection
            .as_ref()
            .map(|conn| conn.state())
            .unwrap_or(ConnectionState::Closed)
    }

    /// Whether this scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same scope (reference identity).
    pub fn same_scope(&self, other: &AmbientScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether two scopes share one root state cell (connection,
    /// transaction, suppress flag, and isolation level).
    pub fn shares_root(&self, other: &AmbientScope) -> bool {
        Arc::ptr_eq(&self.inner.shared, &other.inner.shared)
    }

    pub(crate) fn shared(&self) -> &Arc<RootShared> {
        &self.inner.shared
    }

    /// Open the connection and begin the transaction if not yet done.
    ///
    /// Runs on every query before delegating to the executor; state is
    /// shared, so preparation issued through any scope materializes on the
    /// root.
    pub(crate) fn prepare(&self) -> Result<()> {
        let shared = &self.inner.shared;
        let mut state = shared.state.lock();
        let RootState {
            connection,
            transaction,
        } = &mut *state;

        let conn = connection
            .as_mut()
            .ok_or(AmbientError::ConnectionUnavailable)?;
        if conn.state() != ConnectionState::Open {
            conn.open()?;
            trace!("opened ambient connection");
        }
        if transaction.is_none() && !shared.suppress {
            *transaction = Some(conn.begin(shared.isolation)?);
            trace!(isolation = ?shared.isolation, "began ambient transaction");
        }
        Ok(())
    }

    /// Asynchronous [`AmbientScope::prepare`].
    ///
    /// The connection is moved out of the state cell around the `.await` so
    /// no lock is held across suspension, and restored on every path. Must
    /// run under the root's I/O gate.
    pub(crate) async fn prepare_async(&self) -> Result<()> {
        let shared = &self.inner.shared;
        let mut conn = {
            shared
                .state
                .lock()
                .connection
                .take()
                .ok_or(AmbientError::ConnectionUnavailable)?
        };

        if conn.state() != ConnectionState::Open {
            if let Err(err) = conn.open_async().await {
                shared.state.lock().connection = Some(conn);
                return Err(err);
            }
            trace!("opened ambient connection");
        }

        let mut state = shared.state.lock();
        if state.transaction.is_none() && !shared.suppress {
            match conn.begin(shared.isolation) {
                Ok(tx) => {
                    state.transaction = Some(tx);
                    trace!(isolation = ?shared.isolation, "began ambient transaction");
                }
                Err(err) => {
                    state.connection = Some(conn);
                    return Err(err);
                }
            }
        }
        state.connection = Some(conn);
        Ok(())
    }

    /// [`AmbientScope::prepare_async`] holding the root's I/O gate.
    pub(crate) async fn prepare_async_gated(&self) -> Result<()> {
        let _io = self.inner.shared.io_gate.lock().await;
        self.prepare_async().await
    }

    /// Commit the pending transaction.
    ///
    /// No-op on a joined scope; only the root acts. If the driver's commit
    /// fails, a rollback of the same transaction is attempted (its own
    /// failure is logged, not surfaced), the transaction reference is
    /// cleared either way, and the original commit error propagates.
    pub fn commit(&self) -> Result<()> {
        if self.inner.parent.is_some() {
            return Ok(());
        }
        let taken = self.inner.shared.state.lock().transaction.take();
        if let Some(mut tx) = taken {
            if let Err(commit_err) = tx.commit() {
                warn!("commit failed; attempting rollback");
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                return Err(commit_err);
            }
            debug!("ambient transaction committed");
        }
        Ok(())
    }

    /// Roll the pending transaction back.
    ///
    /// No-op on a joined scope. The transaction reference is cleared and the
    /// handle dropped even when the driver's rollback fails.
    pub fn rollback(&self) -> Result<()> {
        if self.inner.parent.is_some() {
            return Ok(());
        }
        if let Some(mut tx) = self.inner.shared.state.lock().transaction.take() {
            tx.rollback()?;
            debug!("ambient transaction rolled back");
        }
        Ok(())
    }

    /// Dispose this scope, popping it off the chain's stack.
    ///
    /// Scopes must be disposed in strict reverse-of-creation order; only the
    /// topmost scope may be disposed. A root additionally commits a pending
    /// transaction, then closes and releases its connection. The chain's
    /// token is cleared exactly when the stack becomes empty. Calling this
    /// twice on the same scope is safe.
    pub fn dispose(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let stack = self.inner.helper.stack()?;
        let Some((top, remaining)) = stack.pop() else {
            return Err(AmbientError::ScopeNotInStorage);
        };
        if !top.same_scope(self) {
            return Err(AmbientError::OutOfOrderDisposal);
        }

        self.inner.helper.save(remaining.clone())?;
        self.inner.disposed.store(true, Ordering::SeqCst);

        let mut commit_result = Ok(());
        let mut close_result = Ok(());
        if self.is_root() {
            commit_result = self.commit();

            // Even a failed commit must not leak the connection.
            let taken = self.inner.shared.state.lock().connection.take();
            if let Some(mut conn) = taken {
                if conn.state() == ConnectionState::Open {
                    close_result = conn.close();
                }
                debug!("ambient connection closed and released");
            }
        }

        if remaining.is_empty() {
            self.inner.helper.clear()?;
            debug!("ambient chain wound down");
        }
        commit_result?;
        close_result
    }
}

impl std::fmt::Debug for AmbientScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientScope")
            .field("root", &self.is_root())
            .field("suppress", &self.suppress())
            .field("isolation", &self.isolation_level())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ScopeStack;
    use ambit_core::testing::{DriverLog, MockConnectionFactory, MockExecutor};
    use ambit_core::traits::ConnectionFactory;
    use ambit_context::ThreadLocalStorage;

    fn root_scope(log: &Arc<DriverLog>) -> AmbientScope {
        let connections = MockConnectionFactory::new(Arc::clone(log));
        let driver = RootDriver {
            connection: connections.create().unwrap(),
            executor: MockExecutor::new(),
        };
        AmbientScope::new(ScopeOptions::new_scope(), Some(driver)).unwrap()
    }

    // Each test runs on its own thread, so ThreadLocalStorage keeps the
    // chains isolated even though the selector is process-global.
    #[test]
    fn test_dispose_with_externally_emptied_stack_errors() {
        ambit_context::set_storage(Arc::new(ThreadLocalStorage::new()));
        let log = DriverLog::new();
        let scope = root_scope(&log);

        // Interference from outside the normal lifecycle: the chain's stack
        // is replaced with an empty one while the scope is still live.
        let helper = StorageHelper::new(ambit_context::storage().unwrap());
        helper.save(ScopeStack::new()).unwrap();

        assert!(matches!(
            scope.dispose(),
            Err(AmbientError::ScopeNotInStorage)
        ));
        assert!(!scope.is_disposed());

        helper.clear().unwrap();
    }
}

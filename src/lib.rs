//! Ambit - Ambient scoped transactions for database work
//!
//! Ambit manages a connection and transaction per logical call chain without
//! threading either through function signatures. An outer scope opens the
//! unit of work, nested code joins it implicitly, and the connection and
//! transaction materialize lazily on the first query.
//!
//! # Quick Start
//!
//! ```ignore
//! use ambit::{set_storage, AmbientScope, ScopeFactory, ThreadLocalStorage};
//! use std::sync::Arc;
//!
//! // Once at startup: pick how chains are identified.
//! set_storage(Arc::new(ThreadLocalStorage::new()));
//!
//! let factory = ScopeFactory::new(connections, executor);
//!
//! // Outer unit of work.
//! let scope = factory.create()?;
//! scope.execute("INSERT INTO users (name) VALUES (@name)")?;
//! do_nested_work()?; // joins the same scope, same transaction
//! scope.commit()?;
//! scope.dispose()?;
//!
//! fn do_nested_work() -> ambit::Result<()> {
//!     let scope = AmbientScope::join()?;
//!     scope.execute("UPDATE counters SET n = n + 1")?;
//!     scope.dispose()
//! }
//! ```
//!
//! # Architecture
//!
//! The ambient slot (thread-local or task-local) holds only a small
//! serializable token; the actual stack of scopes lives in a process-wide
//! side table keyed by that token. One root scope per chain owns the
//! connection and transaction; joined scopes share the root's state through
//! one cell, so commit and rollback are meaningful only at the root.

pub use ambit_context::{
    set_storage, storage, ContextualStorage, StorageToken, TaskLocalStorage, ThreadLocalStorage,
    STORAGE_KEY,
};
pub use ambit_core::command::{CommandKind, SqlCommand, SqlParam};
pub use ambit_core::error::{AmbientError, DriverError, Result};
pub use ambit_core::row::Row;
pub use ambit_core::traits::{
    Connection, ConnectionFactory, QueryExecutor, RowReader, Transaction,
};
pub use ambit_core::types::{ConnectionState, IsolationLevel, ScopeOptions};
pub use ambit_scope::{
    chain_depth, ActiveScope, AmbientScope, RootDriver, ScopeFactory, ScopeLocator,
};

/// Test doubles for driver-facing traits.
pub mod testing {
    pub use ambit_core::testing::*;
}

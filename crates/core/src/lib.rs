//! Core types and collaborator contracts for the ambient scope machinery
//!
//! This crate holds everything the scope engine and the outside world agree
//! on: the error taxonomy, scope construction options, the command and row
//! models, and the driver-facing traits ([`Connection`], [`Transaction`],
//! [`ConnectionFactory`], [`QueryExecutor`]).
//!
//! The scope lifecycle engine itself lives in `ambit-scope`; ambient storage
//! lives in `ambit-context`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod row;
pub mod testing;
pub mod traits;
pub mod types;

pub use command::{CommandKind, SqlCommand, SqlParam};
pub use error::{AmbientError, DriverError, Result};
pub use row::Row;
pub use traits::{Connection, ConnectionFactory, QueryExecutor, RowReader, Transaction};
pub use types::{ConnectionState, IsolationLevel, ScopeOptions};

//! Ambient scope machinery
//!
//! Scopes for one logical call chain form a stack. The stack itself lives in
//! a process-wide side table keyed by an opaque token; the ambient slot (see
//! `ambit-context`) only ever holds the token, so the ambient value stays
//! small and serializable no matter what the scopes own.
//!
//! A chain has at most one root scope at the bottom of any contiguous run of
//! joined scopes; the root owns the connection and transaction, and joined
//! scopes read and write the root's state through one shared cell. Disposal
//! is strictly stack-ordered and the chain's token is removed from the
//! ambient slot exactly when the last scope unwinds.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod factory;
mod helper;
mod locator;
mod proxy;
mod scope;
mod stack;
mod table;

pub use factory::ScopeFactory;
pub use locator::{ActiveScope, ScopeLocator};
pub use scope::{AmbientScope, RootDriver};

use ambit_core::error::Result;
use helper::StorageHelper;

/// Number of scopes on the current chain's stack.
///
/// Zero when no chain has been started or the chain has fully unwound.
pub fn chain_depth() -> Result<usize> {
    let storage = ambit_context::storage()?;
    let helper = StorageHelper::new(storage);
    if !helper.is_initialized()? {
        return Ok(0);
    }
    Ok(helper.stack()?.len())
}

//! Opaque cross-reference tokens
//!
//! A token is minted once per logical call chain and stored in the ambient
//! slot; it is only ever used as a lookup key into the scope-stack side
//! table. Tokens are serializable so that storage implementations that cross
//! serialization boundaries can carry them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique, opaque key for one logical call chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageToken(String);

impl StorageToken {
    /// Mint a fresh token: a random 128-bit identifier rendered as hex.
    pub fn mint() -> Self {
        StorageToken(Uuid::new_v4().simple().to_string())
    }

    /// The token's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = StorageToken::mint();
        let b = StorageToken::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_is_hex() {
        let token = StorageToken::mint();
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_round_trips_through_serde() {
        let token = StorageToken::mint();
        let json = serde_json::to_string(&token).unwrap();
        let back: StorageToken = serde_json::from_str(&json).unwrap();
        assert_eq!(token, back);
    }
}

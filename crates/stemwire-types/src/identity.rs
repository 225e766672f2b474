//! Identity types for Stemwire
//!
//! String-backed newtype ids for catalog records and users, plus numeric
//! ids for on-chain entities (listings and tokens are uint256 indices on
//! the marketplace contract, kept as u64 here since the contract assigns
//! them sequentially).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random id
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// A user of the marketplace
    UserId, "user"
);
string_id!(
    /// A listening session (spending window), distinct from a session key
    SessionId, "session"
);
string_id!(
    /// A catalog track
    TrackId, "track"
);
string_id!(
    /// An isolated audio layer of a track, independently licensable
    StemId, "stem"
);
string_id!(
    /// A registered session key (delegated signing authority)
    SessionKeyId, "sk"
);
string_id!(
    /// A row in the agent transaction ledger
    AgentTxId, "agenttx"
);
string_id!(
    /// An AI generation job handed back by the generation backend
    JobId, "job"
);

/// On-chain listing index on the marketplace contract
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ListingId(pub u64);

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain token index (ERC-1155 id of the stem)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenId(pub u64);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transaction hash as returned by the network layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TrackId::new(), TrackId::new());
        assert_ne!(SessionKeyId::new(), SessionKeyId::new());
    }

    #[test]
    fn test_id_prefixes() {
        assert!(TrackId::new().as_str().starts_with("track_"));
        assert!(SessionKeyId::new().as_str().starts_with("sk_"));
    }
}

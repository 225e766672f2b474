//! Marketplace listing records
//!
//! A `Listing` is the database view of an on-chain offer. The chain is the
//! source of truth; reconciliation only ever moves a listing from `Active`
//! toward a terminal/excluded status, never backward:
//!
//! - `Active -> Stale`     when an on-chain read contradicts the DB
//!   (zero-address seller, zero amount, or elapsed expiry)
//! - `Active -> Sold`      when a purchase exhausts the supply
//! - `Active -> Cancelled` only on an explicit cancellation signal

use crate::{ListingId, StemId, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Stale,
    Sold,
    Cancelled,
}

impl ListingStatus {
    /// Whether the transition `self -> next` is permitted
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Stale)
                | (Self::Active, Self::Sold)
                | (Self::Active, Self::Cancelled)
        )
    }
}

/// An offer to sell a quantity of a tokenized stem at a price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub listing_id: ListingId,
    pub token_id: TokenId,
    pub stem_id: StemId,
    /// Price per unit in native-currency base units (wei)
    pub price_per_unit_wei: u128,
    pub chain_id: u64,
    /// Stem layer this listing sells ("vocals", "drums", "bass", ...)
    pub stem_type: String,
    pub status: ListingStatus,
    pub expiry: DateTime<Utc>,
}

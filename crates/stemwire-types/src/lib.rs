//! Stemwire Types - Canonical domain types for the stem-licensing agent
//!
//! This crate contains all foundational types for Stemwire with zero
//! dependencies on other stemwire crates. It defines the type system for:
//!
//! - Identity types (TrackId, ListingId, SessionKeyId, etc.)
//! - Taste preferences and orchestration requests
//! - Catalog candidates and marketplace listings
//! - Mix plans, negotiation results, and orchestration outcomes
//! - Session keys and the agent transaction ledger row
//!
//! # Architectural Invariants
//!
//! These types support the core Stemwire invariants:
//!
//! 1. The sum of accepted track prices never exceeds the initial budget
//! 2. A listing only moves from `Active` toward a terminal status, never back
//! 3. At most one non-revoked, non-expired session key exists per user
//! 4. `Confirmed` and `Failed` are terminal transaction statuses

pub mod identity;
pub mod preferences;
pub mod catalog;
pub mod listing;
pub mod mix;
pub mod negotiation;
pub mod orchestration;
pub mod session_key;
pub mod transaction;
pub mod wallet;

pub use identity::*;
pub use preferences::*;
pub use catalog::*;
pub use listing::*;
pub use mix::*;
pub use negotiation::*;
pub use orchestration::*;
pub use session_key::*;
pub use transaction::*;
pub use wallet::*;

/// Version of the Stemwire types schema
pub const TYPES_VERSION: &str = "0.1.0";

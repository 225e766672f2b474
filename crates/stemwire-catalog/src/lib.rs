//! Stemwire Catalog - tracks, stems, listings, and quality ratings
//!
//! The store is the persistence contract of the core: single-record
//! updates are atomic (one write lock), and listing status changes go
//! through the forward-only transition rules in `stemwire-types`.

mod curator;
mod store;

pub use curator::{CuratorAgent, QualityOracle};
pub use store::{CatalogStore, Stem, StemQualityRating, Track};

use stemwire_types::ListingId;
use thiserror::Error;

/// Errors that can occur in catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Track not found: {track_id}")]
    TrackNotFound { track_id: String },

    #[error("Stem not found: {stem_id}")]
    StemNotFound { stem_id: String },

    #[error("Listing not found: {listing_id}")]
    ListingNotFound { listing_id: ListingId },

    #[error("Invalid listing transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Quality lookup failed: {message}")]
    QualityLookup { message: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;

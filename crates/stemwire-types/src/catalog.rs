//! Catalog candidate shape used by the selection pipeline

use crate::TrackId;
use serde::{Deserialize, Serialize};

/// A catalog track considered for selection.
///
/// `has_listing` is a hard ranking boost: listed candidates always sort
/// before unlisted ones. `quality_score` (0-100) is a soft reorder signal
/// filled in when a quality oracle is attached; it never hard-filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: TrackId,
    pub title: String,
    pub has_listing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
}

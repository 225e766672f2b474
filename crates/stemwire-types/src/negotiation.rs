//! Negotiation results

use crate::{LicenseType, Listing};
use serde::{Deserialize, Serialize};

/// Outcome of negotiating one track against the pricing policy and the
/// live chain state.
///
/// Budget rejection is never an error: `allowed == false` with reason
/// `"over_budget"` is a structured result callers can surface directly.
/// When `allowed` is false, `listings` is always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationResult {
    pub license_type: LicenseType,
    pub price_usd: f64,
    pub allowed: bool,
    pub reason: String,
    /// First valid listing, retained for backward compatibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<Listing>,
    /// All chain-validated listings, in catalog order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listings: Vec<Listing>,
}

impl NegotiationResult {
    /// Structured rejection - no listings are enumerated over budget
    pub fn over_budget(license_type: LicenseType, price_usd: f64) -> Self {
        Self {
            license_type,
            price_usd,
            allowed: false,
            reason: "over_budget".to_string(),
            listing: None,
            listings: Vec::new(),
        }
    }
}

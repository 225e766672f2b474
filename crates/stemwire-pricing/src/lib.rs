//! Stemwire Pricing - license pricing policy
//!
//! Prices start from a base play price and are scaled by license-tier
//! multipliers, optionally discounted for volume, then clamped to a
//! floor/ceiling band and rounded to whole cents.

use serde::{Deserialize, Serialize};
use stemwire_types::LicenseType;

/// Pricing policy knobs. The defaults match the marketplace's standard
/// tier sheet: $0.02 base, remix x3, commercial x5, 5% volume discount,
/// clamped to [$0.01, $1.00].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    pub base_play_price_usd: f64,
    pub remix_surcharge_multiplier: f64,
    pub commercial_multiplier: f64,
    pub volume_discount_percent: f64,
    pub floor_usd: f64,
    pub ceiling_usd: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            base_play_price_usd: 0.02,
            remix_surcharge_multiplier: 3.0,
            commercial_multiplier: 5.0,
            volume_discount_percent: 5.0,
            floor_usd: 0.01,
            ceiling_usd: 1.00,
        }
    }
}

impl PricingPolicy {
    /// Quote a price for one license. Floor and ceiling short-circuit the
    /// cent rounding so the clamp values are returned exactly.
    pub fn quote(&self, license_type: LicenseType, volume_eligible: bool) -> f64 {
        let mut price = self.base_play_price_usd;
        match license_type {
            LicenseType::Personal => {}
            LicenseType::Remix => price *= self.remix_surcharge_multiplier,
            LicenseType::Commercial => price *= self.commercial_multiplier,
        }
        if volume_eligible {
            price *= 1.0 - self.volume_discount_percent / 100.0;
        }
        if price < self.floor_usd {
            return self.floor_usd;
        }
        if price > self.ceiling_usd {
            return self.ceiling_usd;
        }
        round_cents(price)
    }
}

/// Round to two decimals (whole cents)
pub fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

//! Agent wallet status and budget alert levels

use serde::{Deserialize, Serialize};

/// Budget alert level by spend percentage of the monthly cap:
/// `<80%` none, `[80,95)%` warning, `[95,100)%` critical, `>=100%` exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    Warning,
    Critical,
    Exhausted,
}

impl AlertLevel {
    /// Compute the alert level for `spent_usd` against `monthly_cap_usd`.
    /// A non-positive cap never alerts.
    pub fn compute(spent_usd: f64, monthly_cap_usd: f64) -> Self {
        if monthly_cap_usd <= 0.0 {
            return Self::None;
        }
        let pct = (spent_usd / monthly_cap_usd) * 100.0;
        if pct >= 100.0 {
            Self::Exhausted
        } else if pct >= 95.0 {
            Self::Critical
        } else if pct >= 80.0 {
            Self::Warning
        } else {
            Self::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Merged status of a user's agent wallet: wallet row, session-key
/// validity, and budget aggregation against the monthly cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWalletStatus {
    pub enabled: bool,
    pub wallet_address: Option<String>,
    pub account_type: String,
    pub session_key_valid: bool,
    /// Unix millis of the session key expiry, when known
    pub session_key_expires_at: Option<i64>,
    pub budget_cap_usd: f64,
    pub spent_usd: f64,
    pub remaining_usd: f64,
    pub alert_level: AlertLevel,
}

impl AgentWalletStatus {
    /// Status for a user without any wallet row
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            wallet_address: None,
            account_type: "none".to_string(),
            session_key_valid: false,
            session_key_expires_at: None,
            budget_cap_usd: 0.0,
            spent_usd: 0.0,
            remaining_usd: 0.0,
            alert_level: AlertLevel::None,
        }
    }
}

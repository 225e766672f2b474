//! Taste preferences and license types

use serde::{Deserialize, Serialize};

/// License tier for a stem purchase - determines price and usage rights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    Personal,
    Remix,
    Commercial,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Remix => "remix",
            Self::Commercial => "commercial",
        }
    }

    /// Parse a license type, tolerating surrounding whitespace and case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Some(Self::Personal),
            "remix" => Some(Self::Remix),
            "commercial" => Some(Self::Commercial),
            _ => None,
        }
    }
}

impl Default for LicenseType {
    fn default() -> Self {
        Self::Personal
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested energy level for the next stretch of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// User taste preferences carried by every orchestration request.
///
/// All fields are optional; an empty preference set still produces a
/// valid (single empty-query) catalog search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TastePreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stem_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_explicit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
}

impl TastePreferences {
    /// Compile the taste queries for candidate selection: the preference
    /// genres plus the mood, deduplicated, in that order.
    pub fn compile_queries(&self) -> Vec<String> {
        let mut queries: Vec<String> = Vec::new();
        for genre in &self.genres {
            if !genre.is_empty() && !queries.contains(genre) {
                queries.push(genre.clone());
            }
        }
        if let Some(mood) = &self.mood {
            if !mood.is_empty() && !queries.contains(mood) {
                queries.push(mood.clone());
            }
        }
        queries
    }
}

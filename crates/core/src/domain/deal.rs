use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ebay,
    GoogleShopping,
}

impl Platform {
    /// Stable machine key, also the serde form.
    pub fn key(self) -> &'static str {
        match self {
            Platform::Ebay => "ebay",
            Platform::GoogleShopping => "google_shopping",
        }
    }

    pub fn store_name(self) -> &'static str {
        match self {
            Platform::Ebay => "eBay",
            Platform::GoogleShopping => "Google Shopping",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub title: String,
    pub price: f64,
    pub url: String,
    pub store: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SafetyStatus {
    #[serde(rename = "Verified Model")]
    VerifiedModel,
    #[serde(rename = "Check Recall")]
    CheckRecall,
    #[default]
    Unknown,
    Recalled,
}

impl SafetyStatus {
    pub fn label(self) -> &'static str {
        match self {
            SafetyStatus::VerifiedModel => "Verified Model",
            SafetyStatus::CheckRecall => "Check Recall",
            SafetyStatus::Unknown => "Unknown",
            SafetyStatus::Recalled => "Recalled",
        }
    }
}

/// A deal as written to the `found_items` collection.
///
/// `safety_status`, `is_viewed`, `image_url` and `location` are schema
/// defaults: the scraping pipeline has no data for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDeal {
    pub id: Uuid,
    pub hunt_id: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[serde(flatten)]
    pub deal: Deal,
    pub image_url: Option<String>,
    pub safety_status: SafetyStatus,
    pub location: Option<String>,
    pub found_at: DateTime<Utc>,
    pub is_viewed: bool,
}

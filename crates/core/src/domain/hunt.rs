use crate::error::ScoutError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-generated session key grouping every deal found for one hunt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HuntId(String);

impl HuntId {
    pub fn parse(raw: &str) -> Result<Self, ScoutError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScoutError::invalid_input("hunt_id", "hunt_id must be non-empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HuntId {
    type Error = ScoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HuntId> for String {
    fn from(value: HuntId) -> Self {
        value.0
    }
}

impl fmt::Display for HuntId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Labels of the hunt copied onto every persisted record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuntTags {
    pub brand: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DealRequest {
    pub query: String,
    pub hunt_id: HuntId,
    pub max_price: Option<f64>,
    pub tags: HuntTags,
}

impl DealRequest {
    pub fn new(query: &str, hunt_id: &str, max_price: Option<f64>) -> Result<Self, ScoutError> {
        let hunt_id = HuntId::parse(hunt_id)?;
        let max_price = validate_max_price(max_price)?;
        Ok(Self {
            query: query.to_string(),
            hunt_id,
            max_price,
            tags: HuntTags::default(),
        })
    }

    /// Builds a request the way the dashboard submits a hunt: brand plus an
    /// optional item name.
    pub fn from_parts(
        brand: &str,
        item_name: Option<&str>,
        hunt_id: &str,
        max_price: Option<f64>,
        category: Option<&str>,
    ) -> Result<Self, ScoutError> {
        let mut req = Self::new(&compose_query(brand, item_name), hunt_id, max_price)?;
        req.tags = HuntTags {
            brand: non_empty(brand),
            category: category.and_then(non_empty),
        };
        Ok(req)
    }

    pub fn with_tags(mut self, tags: HuntTags) -> Self {
        self.tags = tags;
        self
    }
}

pub fn compose_query(brand: &str, item_name: Option<&str>) -> String {
    format!("{} {}", brand.trim(), item_name.unwrap_or("").trim())
        .trim()
        .to_string()
}

fn validate_max_price(max_price: Option<f64>) -> Result<Option<f64>, ScoutError> {
    match max_price {
        Some(p) if !p.is_finite() => Err(ScoutError::invalid_input(
            "max_price",
            format!("max_price must be a finite number (got {p})"),
        )),
        Some(p) if p < 0.0 => Err(ScoutError::invalid_input(
            "max_price",
            format!("max_price must be non-negative (got {p})"),
        )),
        other => Ok(other),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

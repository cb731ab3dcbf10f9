use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::models::FamilyKey;
use crate::utils::error::{AppError, Result};

/// One tracked SKU within a product family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,

    // Infinite when the retailer's price text could not be read
    #[serde(with = "price_format", default = "unknown_price")]
    pub price: f64,

    #[serde(default)]
    pub stock: bool,
    #[serde(default)]
    pub target: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub alert: bool,

    #[serde(default)]
    pub time_updated: Option<DateTime<Utc>>,
}

impl Variant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: String::new(),
            price: f64::INFINITY,
            stock: false,
            target: false,
            priority: 0,
            alert: false,
            time_updated: None,
        }
    }

    pub fn has_known_price(&self) -> bool {
        self.price.is_finite()
    }

    pub fn formatted_price(&self) -> String {
        format_price(self.price)
    }
}

/// Formats a normalized price for display; the unknown sentinel prints as "unknown".
pub fn format_price(price: f64) -> String {
    if price.is_finite() {
        format!("{:.2}", price)
    } else {
        "unknown".to_string()
    }
}

/// Parsed search result for one variant, keyed by variant name in a cycle's result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub stock: bool,
    pub price: f64,
    pub url: String,
}

/// Persisted aggregate of every tracked variant of one family.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FamilyProfile {
    #[serde(default)]
    pub time_updated: Option<DateTime<Utc>>,
    #[serde(rename = "products")]
    pub variants: BTreeMap<String, Variant>,
}

impl FamilyProfile {
    pub fn from_variants(variants: impl IntoIterator<Item = Variant>) -> Self {
        Self {
            time_updated: None,
            variants: variants.into_iter().map(|v| (v.id.clone(), v)).collect(),
        }
    }

    /// Fills in ids left blank in the document and rejects records whose id
    /// disagrees with the key they are stored under.
    pub fn normalize_ids(&mut self, family: &FamilyKey) -> Result<()> {
        for (key, variant) in self.variants.iter_mut() {
            if variant.id.is_empty() {
                variant.id = key.clone();
            } else if &variant.id != key {
                return Err(AppError::profile(
                    family,
                    format!("variant stored under '{}' has id '{}'", key, variant.id),
                ));
            }
        }

        if self.variants.is_empty() {
            return Err(AppError::profile(family, "profile tracks no variants"));
        }

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Variant> {
        self.variants.get(id)
    }

    pub fn in_stock_count(&self) -> usize {
        self.variants.values().filter(|v| v.stock).count()
    }
}

fn unknown_price() -> f64 {
    f64::INFINITY
}

// JSON has no infinity; the unknown price travels as null.
mod price_format {
    use super::*;

    pub fn serialize<S: Serializer>(price: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if price.is_finite() {
            serializer.serialize_f64(*price)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        let price = Option::<f64>::deserialize(deserializer)?;
        Ok(price.filter(|p| p.is_finite()).unwrap_or(f64::INFINITY))
    }
}

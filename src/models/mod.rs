use serde::{Deserialize, Serialize};
use std::fmt;

pub mod request;
pub mod variant;

// Re-exports for convenience
pub use request::*;
pub use variant::*;

/// Identifies one tracked product family: a product searched at one retailer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyKey {
    pub retailer: String,
    pub product: String,
}

impl FamilyKey {
    pub fn new(retailer: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            product: product.into(),
        }
    }
}

impl fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.retailer, self.product)
    }
}

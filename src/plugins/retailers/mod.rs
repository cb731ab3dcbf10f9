// Retailer plugin implementations
pub mod alternate;

pub use alternate::AlternateRetailer;

use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// One row of a retailer's search results, as printed on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRow {
    pub name: String,
    pub stock_message: String,
    pub price_text: String,
    pub url: String,
}

/// Retailer-specific page knowledge used by the search loop and focused watcher.
pub trait RetailerPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn retailer_key(&self) -> &str;
    fn description(&self) -> &str;

    /// Extracts every result row from a search response body.
    fn parse_search_results(&self, body: &str) -> Result<Vec<SearchRow>>;

    /// True when an item page offers a way to buy the item.
    fn parse_detail_availability(&self, body: &str) -> Result<bool>;

    /// True when a row's delivery text means the item can be ordered now.
    fn stock_message_matches(&self, message: &str) -> bool;

    /// Price text to number; `INFINITY` when unreadable.
    fn normalize_price(&self, text: &str) -> f64 {
        crate::price::normalize_price(text)
    }
}

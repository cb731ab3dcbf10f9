use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::plugins::traits::{RetailerPlugin, SearchRow};
use crate::utils::error::{AppError, Result};

static DEFAULT_STOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Auf Lager.*|^Ware neu eingetroffen.*|^Artikel kann.*").unwrap()
});
const ADD_TO_CART_TITLE: &str = "In den Warenkorb";

/// Parser for alternate.de search listings and product pages.
pub struct AlternateRetailer {
    stock_regex: Regex,
}

impl AlternateRetailer {
    pub const KEY: &'static str = "alternate";

    pub fn new() -> Self {
        Self {
            stock_regex: DEFAULT_STOCK_PATTERN.clone(),
        }
    }

    /// Stock messages must match from their first character, whether or not
    /// the pattern starts with `^`.
    pub fn with_stock_pattern(pattern: &str) -> Result<Self> {
        let stock_regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| AppError::Plugin {
            plugin_type: Self::KEY.to_string(),
            message: format!("invalid stock pattern: {}", e),
        })?;
        Ok(Self { stock_regex })
    }
}

impl Default for AlternateRetailer {
    fn default() -> Self {
        Self::new()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::parse(format!("invalid selector '{}': {:?}", css, e)))
}

fn child_text(row: &ElementRef, css: &Selector, what: &str) -> Result<String> {
    row.select(css)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| AppError::parse(format!("search row without {}", what)))
}

impl RetailerPlugin for AlternateRetailer {
    fn name(&self) -> &str {
        "Alternate"
    }

    fn retailer_key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Search listings and product pages of alternate.de"
    }

    fn parse_search_results(&self, body: &str) -> Result<Vec<SearchRow>> {
        let document = Html::parse_document(body);
        let rows = selector("a.productBox")?;
        let name = selector("div.product-name")?;
        let delivery = selector("div.delivery-info")?;
        let price = selector("span.price")?;

        let mut results = Vec::new();
        for row in document.select(&rows) {
            let url = row
                .value()
                .attr("href")
                .ok_or_else(|| AppError::parse("search row without href"))?;

            results.push(SearchRow {
                name: child_text(&row, &name, "product name")?.trim().to_string(),
                stock_message: child_text(&row, &delivery, "delivery info")?.trim().to_string(),
                price_text: child_text(&row, &price, "price")?,
                url: url.to_string(),
            });
        }

        Ok(results)
    }

    fn parse_detail_availability(&self, body: &str) -> Result<bool> {
        let document = Html::parse_document(body);
        let add_to_cart = selector(&format!("a[title=\"{}\"]", ADD_TO_CART_TITLE))?;
        Ok(document.select(&add_to_cart).next().is_some())
    }

    fn stock_message_matches(&self, message: &str) -> bool {
        self.stock_regex.is_match(message)
    }
}

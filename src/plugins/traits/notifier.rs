use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FamilyKey, Variant, format_price};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StockAlert,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::StockAlert => "stock_alert",
        }
    }
}

/// Everything a notifier needs to tell people an item can be bought.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlert {
    pub alert_kind: AlertKind,
    pub product_family: String,
    pub retailer: String,
    pub url: String,
    pub name: String,
    pub price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl StockAlert {
    pub fn from_variant(family: &FamilyKey, variant: &Variant, timestamp: DateTime<Utc>) -> Self {
        Self {
            alert_kind: AlertKind::StockAlert,
            product_family: family.product.clone(),
            retailer: family.retailer.clone(),
            url: variant.url.clone(),
            name: variant.name.clone(),
            price: variant.has_known_price().then_some(variant.price),
            timestamp,
        }
    }

    pub fn formatted_price(&self) -> String {
        format_price(self.price.unwrap_or(f64::INFINITY))
    }

    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub recipient: String,
    pub error: String,
}

/// Per-recipient outcome of one notification. Failures are data, not errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationReport {
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

impl NotificationReport {
    pub fn delivered_to(recipient: impl Into<String>) -> Self {
        Self {
            delivered: vec![recipient.into()],
            failed: Vec::new(),
        }
    }

    pub fn failed_for(recipient: impl Into<String>, error: impl ToString) -> Self {
        Self {
            delivered: Vec::new(),
            failed: vec![DeliveryFailure {
                recipient: recipient.into(),
                error: error.to_string(),
            }],
        }
    }

    pub fn merge(&mut self, other: NotificationReport) {
        self.delivered.extend(other.delivered);
        self.failed.extend(other.failed);
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.delivered.is_empty()
    }
}

/// Trait for implementing notification methods (email, Discord, etc.)
///
/// Implementations never fail the caller: anything that goes wrong for a
/// recipient is recorded in the returned report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;
    fn description(&self) -> &str;

    async fn notify(&self, alert: &StockAlert) -> NotificationReport;
}

use async_trait::async_trait;

use crate::plugins::traits::{NotificationReport, NotifierPlugin, StockAlert};

/// Writes alerts to the log only. Used for dry runs and when nothing else is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    fn description(&self) -> &str {
        "Logs restock alerts instead of sending them"
    }

    async fn notify(&self, alert: &StockAlert) -> NotificationReport {
        tracing::info!(
            alert_kind = alert.alert_kind.as_str(),
            retailer = %alert.retailer,
            family = %alert.product_family,
            "🟢 {} can be bought for {}: {}",
            alert.name,
            alert.formatted_price(),
            alert.url
        );
        NotificationReport::delivered_to("log")
    }
}

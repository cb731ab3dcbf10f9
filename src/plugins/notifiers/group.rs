use async_trait::async_trait;
use std::sync::Arc;

use crate::plugins::traits::{NotificationReport, NotifierPlugin, StockAlert};

/// Sends one alert through every registered notifier and merges the reports.
#[derive(Clone, Default)]
pub struct NotifierGroup {
    members: Vec<Arc<dyn NotifierPlugin>>,
}

impl NotifierGroup {
    pub fn new(members: Vec<Arc<dyn NotifierPlugin>>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl NotifierPlugin for NotifierGroup {
    fn name(&self) -> &str {
        "Notifier Group"
    }

    fn plugin_type(&self) -> &str {
        "group"
    }

    fn description(&self) -> &str {
        "Fans an alert out to every configured notifier"
    }

    async fn notify(&self, alert: &StockAlert) -> NotificationReport {
        let mut report = NotificationReport::default();

        for notifier in &self.members {
            let outcome = notifier.notify(alert).await;
            for failure in &outcome.failed {
                tracing::warn!(
                    "{} could not deliver alert for '{}' to {}: {}",
                    notifier.name(),
                    alert.name,
                    failure.recipient,
                    failure.error
                );
            }
            report.merge(outcome);
        }

        report
    }
}

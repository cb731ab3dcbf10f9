use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::http::{HttpClient, HttpRequest, send_cancellable};
use crate::interval::IntervalGenerator;
use crate::models::{DetailHeaders, Variant};
use crate::plugins::traits::RetailerPlugin;
use crate::utils::error::{AppError, Result};

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// How a focused watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The item page offered a way to buy before the deadline.
    AlertTriggered,
    Expired,
    Cancelled,
}

impl WatchOutcome {
    pub fn should_alert(&self) -> bool {
        matches!(self, WatchOutcome::AlertTriggered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchOutcome::AlertTriggered => "alert_triggered",
            WatchOutcome::Expired => "expired",
            WatchOutcome::Cancelled => "cancelled",
        }
    }
}

/// Polls one promoted variant's item page until it is confirmed buyable or
/// the watch window closes.
pub struct FocusedWatcher<'a> {
    variant_id: String,
    url: String,
    headers: &'a DetailHeaders,
    http: &'a dyn HttpClient,
    retailer: &'a dyn RetailerPlugin,
    deadline: Instant,
    available: bool,
}

impl<'a> FocusedWatcher<'a> {
    pub fn new(
        variant: &Variant,
        headers: &'a DetailHeaders,
        http: &'a dyn HttpClient,
        retailer: &'a dyn RetailerPlugin,
        window: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            variant_id: variant.id.clone(),
            url: variant.url.clone(),
            headers,
            http,
            retailer,
            // A window past what Instant can represent never closes
            deadline: now.checked_add(window).unwrap_or_else(|| now + FAR_FUTURE),
            available: false,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    async fn tick(&mut self, cancel: &CancellationToken) -> Result<()> {
        let request = HttpRequest::get(self.url.clone(), self.headers.clone());
        let response = send_cancellable(self.http, &request, cancel).await?;
        self.available = self.retailer.parse_detail_availability(&response.body)?;
        Ok(())
    }

    pub async fn run(mut self, intervals: &mut IntervalGenerator, cancel: &CancellationToken) -> WatchOutcome {
        tracing::info!("Watching {} at {}", self.variant_id, self.url);

        loop {
            if cancel.is_cancelled() {
                return WatchOutcome::Cancelled;
            }

            match self.tick(cancel).await {
                Ok(()) => {}
                Err(AppError::Cancelled) => return WatchOutcome::Cancelled,
                Err(e) => tracing::warn!("Watch tick for {} failed: {}", self.variant_id, e),
            }

            if self.available {
                tracing::info!("{} is available", self.variant_id);
                return WatchOutcome::AlertTriggered;
            }

            if Instant::now() > self.deadline {
                tracing::info!("Watch window for {} closed without confirmation", self.variant_id);
                return WatchOutcome::Expired;
            }

            let delay = intervals.focused();
            tracing::debug!("Next check of {} in {:.1}s", self.variant_id, delay.as_secs_f64());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return WatchOutcome::Cancelled,
            }
        }
    }
}

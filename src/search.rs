use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::arbiter::select_target;
use crate::detector::{DiffSummary, apply_search_results};
use crate::http::{HttpClient, HttpRequest, Method, send_cancellable};
use crate::interval::IntervalGenerator;
use crate::models::{DetailHeaders, FamilyKey, FamilyProfile, SearchHit, SearchRequests};
use crate::plugins::traits::{NotificationReport, NotifierPlugin, RetailerPlugin, SearchRow, StockAlert};
use crate::store::VariantStore;
use crate::utils::error::{AppError, Result};
use crate::watcher::{FocusedWatcher, WatchOutcome};

/// Collaborators owned by one family's search loop.
pub struct SearchLoopParts {
    pub family: FamilyKey,
    pub store: Box<dyn VariantStore>,
    pub retailer: Arc<dyn RetailerPlugin>,
    pub http: Box<dyn HttpClient>,
    pub requests: SearchRequests,
    pub detail_headers: DetailHeaders,
    pub notifier: Arc<dyn NotifierPlugin>,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub watch_window: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            watch_window: Duration::from_secs(300),
        }
    }
}

/// Result of one broad cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub family: FamilyKey,
    pub fetched: bool,
    pub cancelled: bool,
    pub in_stock: usize,
    pub transitions: Vec<String>,
    pub persisted: bool,
    pub promoted: Option<String>,
    pub watch_outcome: Option<WatchOutcome>,
    pub notification: Option<NotificationReport>,
}

impl CycleReport {
    fn new(family: FamilyKey) -> Self {
        Self {
            family,
            fetched: false,
            cancelled: false,
            in_stock: 0,
            transitions: Vec::new(),
            persisted: false,
            promoted: None,
            watch_outcome: None,
            notification: None,
        }
    }

    pub fn alert_sent(&self) -> bool {
        self.notification.is_some()
    }
}

/// Broad polling of one product family's search results.
pub struct SearchLoop {
    family: FamilyKey,
    profile: FamilyProfile,
    store: Box<dyn VariantStore>,
    retailer: Arc<dyn RetailerPlugin>,
    http: Box<dyn HttpClient>,
    requests: SearchRequests,
    detail_headers: DetailHeaders,
    notifier: Arc<dyn NotifierPlugin>,
    settings: LoopSettings,
}

impl SearchLoop {
    /// Loads the family's profile. A missing or unreadable profile is fatal.
    pub fn new(parts: SearchLoopParts, settings: LoopSettings) -> Result<Self> {
        let profile = parts.store.load(&parts.family)?;
        tracing::info!(
            "Tracking {} variants of {} ({} in stock)",
            profile.variants.len(),
            parts.family,
            profile.in_stock_count()
        );

        Ok(Self {
            family: parts.family,
            profile,
            store: parts.store,
            retailer: parts.retailer,
            http: parts.http,
            requests: parts.requests,
            detail_headers: parts.detail_headers,
            notifier: parts.notifier,
            settings,
        })
    }

    pub fn family(&self) -> &FamilyKey {
        &self.family
    }

    pub fn profile(&self) -> &FamilyProfile {
        &self.profile
    }

    async fn fetch_hits(&self, cancel: &CancellationToken) -> Result<HashMap<String, SearchHit>> {
        let request = HttpRequest::from_template(Method::Post, &self.requests.search);
        let response = send_cancellable(self.http.as_ref(), &request, cancel).await?;
        let rows = self.retailer.parse_search_results(&response.body)?;
        Ok(self.index_rows(rows, &response.final_url))
    }

    // Later rows with the same name win.
    fn index_rows(&self, rows: Vec<SearchRow>, page_url: &str) -> HashMap<String, SearchHit> {
        let base = Url::parse(page_url)
            .or_else(|_| Url::parse(&self.requests.search.url))
            .ok();

        rows.into_iter()
            .map(|row| {
                let url = match &base {
                    Some(base) => base
                        .join(&row.url)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| row.url.clone()),
                    None => row.url.clone(),
                };
                let hit = SearchHit {
                    stock: self.retailer.stock_message_matches(&row.stock_message),
                    price: self.retailer.normalize_price(&row.price_text),
                    url,
                };
                (row.name.trim().to_string(), hit)
            })
            .collect()
    }

    /// One broad cycle: fetch, diff, persist, arbitrate, and maybe watch and notify.
    ///
    /// When the fetch fails the held flags are persisted and arbitrated unchanged.
    pub async fn run_cycle(&mut self, intervals: &mut IntervalGenerator, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::new(self.family.clone());
        let now = Utc::now();
        metrics::counter!("restock_cycles_total", "family" => self.family.to_string()).increment(1);

        match self.fetch_hits(cancel).await {
            Ok(hits) => {
                let diff = apply_search_results(&mut self.profile, &hits, now);
                self.log_diff(&diff, hits.len());
                report.fetched = true;
                report.transitions = diff.transitions;
            }
            Err(AppError::Cancelled) => {
                report.cancelled = true;
                return report;
            }
            Err(e) => {
                metrics::counter!("restock_fetch_failures_total", "family" => self.family.to_string())
                    .increment(1);
                tracing::warn!("Error downloading product data for {}: {}", self.family, e);
                self.profile.time_updated = Some(now);
            }
        }

        report.in_stock = self.profile.in_stock_count();
        report.persisted = self.persist();

        let Some(target) = select_target(&self.profile).cloned() else {
            return report;
        };
        report.promoted = Some(target.id.clone());
        tracing::info!(
            "Found stock for target product {} via search, starting product page watcher",
            target.name
        );

        let started = Instant::now();
        let watcher = FocusedWatcher::new(
            &target,
            &self.detail_headers,
            self.http.as_ref(),
            self.retailer.as_ref(),
            self.settings.watch_window,
        );
        let outcome = watcher.run(intervals, cancel).await;
        metrics::histogram!("restock_watch_duration_seconds", "outcome" => outcome.as_str())
            .record(started.elapsed().as_secs_f64());
        report.watch_outcome = Some(outcome);

        match outcome {
            WatchOutcome::AlertTriggered => {
                let timestamp: DateTime<Utc> = target.time_updated.unwrap_or(now);
                let alert = StockAlert::from_variant(&self.family, &target, timestamp);
                let notification = tokio::select! {
                    notification = self.notifier.notify(&alert) => notification,
                    _ = cancel.cancelled() => {
                        tracing::warn!("Shutdown interrupted the stock alert for {}", target.name);
                        report.cancelled = true;
                        return report;
                    }
                };
                metrics::counter!("restock_alerts_sent_total", "family" => self.family.to_string())
                    .increment(notification.delivered.len() as u64);
                tracing::info!(
                    "Stock alert for {} delivered to {} recipient(s), {} failed",
                    target.name,
                    notification.delivered.len(),
                    notification.failed.len()
                );
                report.notification = Some(notification);
            }
            WatchOutcome::Cancelled => report.cancelled = true,
            WatchOutcome::Expired => {}
        }

        report
    }

    fn log_diff(&self, diff: &DiffSummary, rows: usize) {
        tracing::info!(
            "Successfully downloaded product data for {}: {} rows, {} variants matched, {} missing",
            self.family,
            rows,
            diff.updated,
            diff.missing
        );
        for id in &diff.transitions {
            metrics::counter!("restock_transitions_total", "family" => self.family.to_string()).increment(1);
            if let Some(variant) = self.profile.get(id) {
                tracing::info!("{} is back in stock at {}", variant.name, variant.formatted_price());
            }
        }
    }

    fn persist(&self) -> bool {
        match self.store.persist(&self.family, &self.profile) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Could not save profile for {}: {}", self.family, e);
                false
            }
        }
    }
}

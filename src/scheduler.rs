use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use crate::interval::IntervalGenerator;
use crate::search::{CycleReport, SearchLoop};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyStats {
    pub run_count: u64,
    pub failed_fetches: u64,
    pub transitions: u64,
    pub watches: u64,
    pub alerts_sent: u64,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub families: usize,
    pub completed_cycles: u64,
    pub failed_fetches: u64,
    pub alerts_sent: u64,
    pub uptime_seconds: u64,
    pub per_family: BTreeMap<String, FamilyStats>,
}

/// Drives every family's search loop in turn, one at a time, with a broad
/// jittered delay after each cycle.
pub struct MonitorScheduler {
    loops: Vec<SearchLoop>,
    intervals: IntervalGenerator,
    stats: BTreeMap<String, FamilyStats>,
    start_time: DateTime<Utc>,
}

impl MonitorScheduler {
    pub fn new(intervals: IntervalGenerator) -> Self {
        Self {
            loops: Vec::new(),
            intervals,
            stats: BTreeMap::new(),
            start_time: Utc::now(),
        }
    }

    pub fn add_family(&mut self, search: SearchLoop) {
        tracing::debug!("Scheduling {}", search.family());
        self.stats.entry(search.family().to_string()).or_default();
        self.loops.push(search);
    }

    pub fn family_count(&self) -> usize {
        self.loops.len()
    }

    pub fn loops(&self) -> &[SearchLoop] {
        &self.loops
    }

    fn record(&mut self, report: &CycleReport) {
        let stats = self.stats.entry(report.family.to_string()).or_default();
        stats.run_count += 1;
        stats.last_run = Some(Utc::now());
        if !report.fetched && !report.cancelled {
            stats.failed_fetches += 1;
        }
        stats.transitions += report.transitions.len() as u64;
        if report.watch_outcome.is_some() {
            stats.watches += 1;
        }
        if report.alert_sent() {
            stats.alerts_sent += 1;
        }
    }

    /// One cycle for every family, without delays in between.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(self.loops.len());

        for index in 0..self.loops.len() {
            if cancel.is_cancelled() {
                break;
            }
            let report = self.loops[index].run_cycle(&mut self.intervals, cancel).await;
            self.record(&report);
            reports.push(report);
        }

        reports
    }

    /// Cycles through the families until the token is cancelled.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        if self.loops.is_empty() {
            tracing::warn!("No product families to monitor");
            return;
        }
        tracing::info!("Monitoring {} product families", self.loops.len());

        loop {
            for index in 0..self.loops.len() {
                if cancel.is_cancelled() {
                    tracing::info!("Monitor shutting down");
                    return;
                }

                let report = self.loops[index].run_cycle(&mut self.intervals, cancel).await;
                self.record(&report);
                if report.cancelled {
                    tracing::info!("Monitor shutting down");
                    return;
                }

                let delay = self.intervals.broad(self.loops.len());
                tracing::debug!("Next search in {:.1}s", delay.as_secs_f64());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!("Monitor shutting down");
                        return;
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            families: self.loops.len(),
            completed_cycles: self.stats.values().map(|s| s.run_count).sum(),
            failed_fetches: self.stats.values().map(|s| s.failed_fetches).sum(),
            alerts_sent: self.stats.values().map(|s| s.alerts_sent).sum(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
            per_family: self.stats.clone(),
        }
    }
}

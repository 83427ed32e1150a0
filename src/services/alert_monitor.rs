use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    error::FetchError,
    models::WatchedItem,
    services::{
        buff::PriceSource, discord::AlertSink, pacer::RequestPacer, watchlist_store::WatchlistStore,
    },
};

/// Whether an item that stays under its threshold re-alerts on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    Disabled,
    /// Re-alert only when the price moved, or when `cooldown` passed since the last alert.
    Enabled { cooldown: Option<Duration> },
}

impl DedupPolicy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, DedupPolicy::Enabled { .. })
    }

    pub fn should_alert(&self, item: &WatchedItem, price: f64, now: i64) -> bool {
        let DedupPolicy::Enabled { cooldown } = self else {
            return true;
        };
        if item.last_alerted_price != Some(price) {
            return true;
        }
        match (cooldown, item.last_alerted_at) {
            (Some(c), Some(at)) => now.saturating_sub(at) >= c.as_secs() as i64,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub no_data: usize,
    pub fetch_failed: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub suppressed: usize,
}

pub struct AlertMonitor {
    store: Arc<WatchlistStore>,
    prices: Arc<dyn PriceSource>,
    alerts: Arc<dyn AlertSink>,
    interval: Duration,
    pacer: RequestPacer,
    dedup: DedupPolicy,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<WatchlistStore>,
        prices: Arc<dyn PriceSource>,
        alerts: Arc<dyn AlertSink>,
        interval: Duration,
        item_delay: Duration,
    ) -> Self {
        Self {
            store,
            prices,
            alerts,
            interval,
            pacer: RequestPacer::new(item_delay),
            dedup: DedupPolicy::Disabled,
        }
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Runs ticks on a fixed interval until `shutdown` flips to true.
    ///
    /// Ticks run inline in this loop, so a slow tick delays the next one
    /// rather than overlapping it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            item_delay_ms = self.pacer.spacing().as_millis() as u64,
            dedup = ?self.dedup,
            "starting monitor loop"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let report = self.run_tick(&mut shutdown).await;
            tracing::info!(
                checked = report.checked,
                no_data = report.no_data,
                fetch_failed = report.fetch_failed,
                alerts_sent = report.alerts_sent,
                alerts_failed = report.alerts_failed,
                suppressed = report.suppressed,
                "tick complete"
            );

            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("monitor loop stopped");
    }

    /// One pass over the watchlist snapshot taken at tick start.
    pub async fn run_tick(&mut self, shutdown: &mut watch::Receiver<bool>) -> TickReport {
        let items = self.store.snapshot().await;
        let mut report = TickReport::default();

        for item in items.iter() {
            if !self.pacer.ready(shutdown).await {
                tracing::info!("shutdown requested, ending tick early");
                break;
            }
            self.check_item(item, &mut report).await;
            self.pacer.finish();
        }

        report
    }

    async fn check_item(&self, item: &WatchedItem, report: &mut TickReport) {
        report.checked += 1;

        let price = match self.prices.fetch_price(&item.id).await {
            Ok(p) => p,
            Err(FetchError::NoData) => {
                tracing::debug!(item_id = %item.id, "no sell orders");
                report.no_data += 1;
                return;
            }
            Err(FetchError::Transient(reason)) => {
                tracing::debug!(item_id = %item.id, %reason, "skipping item this tick");
                report.fetch_failed += 1;
                return;
            }
        };

        if !item.is_triggered_by(price) {
            tracing::debug!(item_id = %item.id, price, max_price = item.max_price, "above threshold");
            if self.dedup.is_enabled() && item.last_alerted_price.is_some() {
                // back above the threshold, so the next drop counts as new
                if let Err(e) = self.store.clear_alert(&item.id).await {
                    tracing::warn!(item_id = %item.id, error = %e, "could not reset dedup state");
                }
            }
            return;
        }

        let now = Utc::now().timestamp();
        if !self.dedup.should_alert(item, price, now) {
            tracing::debug!(item_id = %item.id, price, "already alerted at this price");
            report.suppressed += 1;
            return;
        }

        if let Err(e) = self.alerts.send(item, price).await {
            tracing::warn!(item_id = %item.id, price, error = %e, "alert delivery failed");
            report.alerts_failed += 1;
            return;
        }

        tracing::info!(item_id = %item.id, price, max_price = item.max_price, "alert sent");
        report.alerts_sent += 1;

        if self.dedup.is_enabled() {
            if let Err(e) = self.store.record_alert(&item.id, price, now).await {
                tracing::warn!(item_id = %item.id, price, error = %e, "could not record dedup state");
            }
        }
    }
}

pub fn spawn_alert_monitor(monitor: AlertMonitor, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(monitor.run(shutdown))
}

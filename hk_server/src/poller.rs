//! Background HKT price poller.

use homekrypto::PriceFeed;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{logging, metrics};

/// Run one poll and record its outcome
pub async fn poll(feed: &PriceFeed) -> bool {
    let start = Instant::now();
    let result = feed.poll_once().await;
    let duration_ms = start.elapsed().as_millis() as u64;
    metrics::price_poll_duration_ms(duration_ms as f64);

    match result {
        Ok(snapshot) => {
            metrics::price_polls_total(true);
            metrics::hkt_price_usd(snapshot.price);
            logging::log_price_poll(Some(&snapshot.source), Some(snapshot.price), duration_ms);
            true
        }
        Err(e) => {
            metrics::price_polls_total(false);
            logging::log_price_poll(None, None, duration_ms);
            tracing::warn!(error = %e, "HKT price providers unavailable");
            false
        }
    }
}

/// Poll `feed` immediately and then every `interval` for the life of the process
pub fn spawn(feed: Arc<PriceFeed>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = interval.as_secs(),
            providers = ?feed.provider_names(),
            "HKT price poller started"
        );

        loop {
            ticker.tick().await;
            poll(&feed).await;
        }
    })
}

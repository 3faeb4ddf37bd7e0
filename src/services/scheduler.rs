//! Daily digest scheduling.
//!
//! The scheduler alternates between WAITING and FIRING forever. On every
//! WAITING entry it re-reads the report time from the store, computes the
//! next fire instant (today at HH:MM, or tomorrow when that has passed) and
//! sleeps exactly until it. Comparing formatted clock strings on a poll tick
//! was considered and rejected: a missed tick silently skips the fire.

use chrono::{Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::adapters::FeedFetcher;
use crate::persistence::BotStore;
use crate::services::broadcaster::{Broadcaster, DeliveryReport};
use crate::services::composer::compose;
use crate::services::snapshot::MarketSnapshotProvider;
use crate::error::Result;

/// Fallback when the stored report time is missing or malformed
pub fn default_report_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("static time")
}

/// Parse a 24-hour "HH:MM" schedule string
pub fn parse_report_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Next occurrence of `at` strictly after `now`.
///
/// When today's occurrence is not in the future (including exactly now),
/// the fire moves to tomorrow; this also stops a cycle that finishes within
/// the scheduled minute from firing twice.
pub fn next_fire(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = NaiveDateTime::new(now.date(), at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// One fetch -> compose -> broadcast cycle
pub struct DigestPipeline {
    store: Arc<BotStore>,
    provider: Arc<MarketSnapshotProvider>,
    feeds: FeedFetcher,
    broadcaster: Broadcaster,
    broadcast_chat_id: Option<String>,
}

impl DigestPipeline {
    pub fn new(
        store: Arc<BotStore>,
        provider: Arc<MarketSnapshotProvider>,
        feeds: FeedFetcher,
        broadcaster: Broadcaster,
        broadcast_chat_id: Option<String>,
    ) -> Self {
        Self {
            store,
            provider,
            feeds,
            broadcaster,
            broadcast_chat_id,
        }
    }

    /// Run one full cycle. Source failures degrade sections; only a store
    /// read error aborts the cycle.
    pub async fn run_cycle(&self) -> Result<DeliveryReport> {
        let state = self.store.load().await?;

        // Market and feed fetches are independent; join before composing
        let (snapshot, feeds) = tokio::join!(
            self.provider.snapshot(),
            self.fetch_feeds(&state.news_sources)
        );

        let report = compose(&snapshot, &feeds);
        Ok(self
            .broadcaster
            .broadcast(
                &report,
                &state.subscribers,
                self.broadcast_chat_id.as_deref(),
            )
            .await)
    }

    async fn fetch_feeds(
        &self,
        sources: &[String],
    ) -> Vec<(String, Vec<crate::domain::FeedItem>)> {
        let mut feeds = Vec::with_capacity(sources.len());
        for source in sources {
            feeds.push((source.clone(), self.feeds.fetch(source).await));
        }
        feeds
    }
}

pub struct DigestScheduler {
    store: Arc<BotStore>,
    pipeline: DigestPipeline,
}

impl DigestScheduler {
    pub fn new(store: Arc<BotStore>, pipeline: DigestPipeline) -> Self {
        Self { store, pipeline }
    }

    /// Loop forever: WAITING until the next fire instant, then FIRING one
    /// cycle. A failed cycle is logged and the loop resumes WAITING.
    pub async fn run(&self) {
        loop {
            let at = self.report_time().await;
            let now = Local::now().naive_local();
            let target = next_fire(now, at);
            let wait = (target - now).to_std().unwrap_or_default();

            info!(
                "next digest at {} (in {}s)",
                target.format("%Y-%m-%d %H:%M"),
                wait.as_secs()
            );
            sleep(wait).await;

            match self.pipeline.run_cycle().await {
                Ok(outcome) => info!(
                    "digest cycle complete: {} delivered, {} failed",
                    outcome.delivered,
                    outcome.failed.len()
                ),
                Err(e) => error!("digest cycle failed: {}", e),
            }
        }
    }

    /// Stored report time, re-read on every WAITING entry so an external
    /// update takes effect on the following cycle without restart
    async fn report_time(&self) -> NaiveTime {
        match self.store.load().await {
            Ok(state) => parse_report_time(&state.report_time).unwrap_or_else(|| {
                warn!(
                    "malformed report_time {:?}, using default 08:00",
                    state.report_time
                );
                default_report_time()
            }),
            Err(e) => {
                warn!("could not read schedule from store, using default 08:00: {}", e);
                default_report_time()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_past_time_fires_tomorrow() {
        let fire = next_fire(on(8, 5, 0), at(8, 0));
        assert_eq!(fire.date(), NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
        assert_eq!(fire.hour(), 8);
        assert_eq!(fire.minute(), 0);
    }

    #[test]
    fn test_future_time_fires_today() {
        let fire = next_fire(on(6, 30, 0), at(8, 0));
        assert_eq!(fire.date(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(fire.hour(), 8);
    }

    #[test]
    fn test_exact_instant_moves_to_tomorrow() {
        let fire = next_fire(on(8, 0, 0), at(8, 0));
        assert_eq!(fire.date(), NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
    }

    #[test]
    fn test_parse_report_time() {
        assert_eq!(parse_report_time("08:00"), Some(at(8, 0)));
        assert_eq!(parse_report_time(" 23:59 "), Some(at(23, 59)));
        assert_eq!(parse_report_time("25:99"), None);
        assert_eq!(parse_report_time("8am"), None);
        assert_eq!(parse_report_time(""), None);
    }
}

//! Market snapshot assembly.
//!
//! One snapshot is built from four independently-fallible sub-fetches run
//! concurrently and joined before composition: global aggregates, sentiment,
//! watch-list quotes, and the ranked sample the movers are picked from. A
//! failed sub-fetch degrades its own section only.

use std::sync::Arc;
use tracing::warn;

use crate::adapters::{CoinGeckoClient, FearGreedClient};
use crate::domain::{select_movers, AssetQuote, MarketSnapshot};
use crate::error::Result;

const MOVERS_PER_SIDE: usize = 3;

pub struct MarketSnapshotProvider {
    market: Arc<CoinGeckoClient>,
    sentiment: Arc<FearGreedClient>,
    watchlist: Vec<String>,
    movers_sample: usize,
}

impl MarketSnapshotProvider {
    pub fn new(
        market: Arc<CoinGeckoClient>,
        sentiment: Arc<FearGreedClient>,
        watchlist: Vec<String>,
        movers_sample: usize,
    ) -> Self {
        Self {
            market,
            sentiment,
            watchlist,
            movers_sample,
        }
    }

    /// Build one snapshot; never fails as a whole
    pub async fn snapshot(&self) -> MarketSnapshot {
        let watchlist_fut = async {
            if self.watchlist.is_empty() {
                Ok(Vec::new())
            } else {
                self.market
                    .markets(self.watchlist.len(), Some(&self.watchlist))
                    .await
            }
        };

        let (global, sentiment, quotes, sample) = tokio::join!(
            self.market.global_stats(),
            self.sentiment.current(),
            watchlist_fut,
            self.market.markets(self.movers_sample, None),
        );

        let global = global
            .map_err(|e| warn!("global stats unavailable: {}", e))
            .ok();
        let sentiment = sentiment
            .map_err(|e| warn!("sentiment index unavailable: {}", e))
            .ok();
        let quotes = quotes
            .map_err(|e| warn!("watchlist quotes unavailable: {}", e))
            .unwrap_or_default();
        let (gainers, losers) = sample
            .map_err(|e| warn!("ranked markets unavailable: {}", e))
            .map(|sample| select_movers(&sample, MOVERS_PER_SIDE))
            .unwrap_or_default();

        MarketSnapshot {
            global,
            sentiment,
            quotes,
            gainers,
            losers,
        }
    }

    /// Top `n` assets by market cap (on-demand lookup path)
    pub async fn top(&self, n: usize) -> Result<Vec<AssetQuote>> {
        self.market.markets(n, None).await
    }
}

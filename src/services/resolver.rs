//! Coin resolution: token -> catalog entry.
//!
//! Keeps a TTL-cached snapshot of the full asset catalog and resolves a
//! user-supplied token against it by id, then symbol, then name. Ambiguous
//! symbols (several assets sharing a ticker) are settled by market-cap rank
//! through the secondary search endpoint.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{CatalogEntry, CoinIndex};
use crate::error::{HeraldError, Result};

/// Upstream capability the resolver needs; kept narrow so tests can mock it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full catalog listing (id/symbol/name; ranks usually absent)
    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>>;

    /// Search hits for a query string, with market-cap ranks where known
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>>;
}

pub struct CoinResolver {
    source: Arc<dyn CatalogSource>,
    index: RwLock<CoinIndex>,
    ttl: Duration,
}

impl CoinResolver {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            index: RwLock::new(CoinIndex::empty()),
            ttl,
        }
    }

    /// Resolve a token (id, symbol, or name, any case) to one catalog entry
    pub async fn resolve(&self, token: &str) -> Result<CatalogEntry> {
        self.ensure_fresh().await;

        let token = token.trim();
        let (id_hit, symbol_hits, name_hit) = {
            let index = self.index.read().await;
            let id_hit = index
                .entries
                .iter()
                .find(|e| e.id.eq_ignore_ascii_case(token))
                .cloned();
            let symbol_hits: Vec<CatalogEntry> = index
                .entries
                .iter()
                .filter(|e| e.symbol.eq_ignore_ascii_case(token))
                .cloned()
                .collect();
            let name_hit = index
                .entries
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(token))
                .cloned();
            (id_hit, symbol_hits, name_hit)
        };

        // Ids are globally unique, so an id hit always wins
        if let Some(entry) = id_hit {
            return Ok(entry);
        }

        match symbol_hits.as_slice() {
            [] => {}
            [only] => return Ok(only.clone()),
            _ => return Ok(self.disambiguate(token, &symbol_hits).await),
        }

        if let Some(entry) = name_hit {
            return Ok(entry);
        }

        Err(HeraldError::CoinNotFound(token.to_string()))
    }

    /// Refresh the catalog when empty or past its TTL. A failed or empty
    /// refresh keeps the previous snapshot: availability over freshness.
    async fn ensure_fresh(&self) {
        let stale = {
            let index = self.index.read().await;
            index.is_stale(Utc::now(), self.ttl)
        };
        if !stale {
            return;
        }

        match self.source.list_catalog().await {
            Ok(entries) if !entries.is_empty() => {
                debug!("catalog refreshed: {} entries", entries.len());
                let mut index = self.index.write().await;
                *index = CoinIndex {
                    entries,
                    fetched_at: Utc::now(),
                };
            }
            Ok(_) => {
                warn!("catalog refresh returned no entries, keeping previous catalog");
            }
            Err(e) => {
                warn!("catalog refresh failed, keeping previous catalog: {}", e);
            }
        }
    }

    /// Several catalog entries share this symbol: rank them via the search
    /// endpoint (ascending market-cap rank, unranked last). When the search
    /// is unusable, fall back to the first match in catalog order —
    /// deterministic, but not rank-aware.
    async fn disambiguate(&self, symbol: &str, matches: &[CatalogEntry]) -> CatalogEntry {
        match self.source.search(symbol).await {
            Ok(hits) => {
                let mut ranked: Vec<&CatalogEntry> = hits
                    .iter()
                    .filter(|c| c.symbol.eq_ignore_ascii_case(symbol))
                    .collect();
                ranked.sort_by_key(|c| c.market_cap_rank.unwrap_or(u32::MAX));

                for candidate in ranked {
                    if let Some(hit) = matches.iter().find(|m| m.id == candidate.id) {
                        return hit.clone();
                    }
                }
                debug!("search gave no usable candidate for symbol {}", symbol);
            }
            Err(e) => {
                warn!("symbol disambiguation search failed for {}: {}", symbol, e);
            }
        }

        matches[0].clone()
    }
}

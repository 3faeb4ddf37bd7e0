use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tradable asset in the catalog (id is globally unique, symbol is not)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

/// Point-in-time snapshot of the full asset catalog.
///
/// Invariant: `entries` is either empty or fully populated. A refresh
/// replaces the whole struct, never patches entries in place.
#[derive(Debug, Clone)]
pub struct CoinIndex {
    pub entries: Vec<CatalogEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl CoinIndex {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Whether the snapshot must be refreshed before resolution
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.entries.is_empty() || now - self.fetched_at > ttl
    }
}

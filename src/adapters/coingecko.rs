//! CoinGecko REST adapter.
//!
//! Serves the asset catalog, symbol-disambiguation search, price lookups,
//! global aggregates and the ranked markets pull. Payload structs keep every
//! non-key field optional so a missing upstream field degrades to a fallback
//! value instead of failing the whole fetch.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::{AssetQuote, CatalogEntry, GlobalStats};
use crate::error::{HeraldError, Result};
use crate::services::resolver::CatalogSource;

const DEFAULT_API_BASE: &str = "https://api.coingecko.com/api/v3";

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .user_agent("herald/0.1 (market digest bot)")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HeraldError::Internal(format!("failed to build CoinGecko HTTP client: {}", e))
            })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();

        if status.as_u16() == 429 {
            return Err(HeraldError::RateLimited(format!(
                "CoinGecko rate limited for {}",
                path
            )));
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Upstream(format!(
                "CoinGecko {} failed: status={} body={}",
                path, status, body
            )));
        }

        Ok(resp.json::<T>().await?)
    }

    /// Full catalog of known assets (no ranks on this endpoint)
    pub async fn coin_list(&self) -> Result<Vec<CatalogEntry>> {
        self.get_json("/coins/list", &[]).await
    }

    /// Search endpoint; its hits carry a market cap rank
    pub async fn search_coins(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let result: SearchResponse = self
            .get_json("/search", &[("query", query.to_string())])
            .await?;
        Ok(result.coins)
    }

    /// Current USD price for one asset id, None when the id is unknown
    pub async fn simple_price_usd(&self, id: &str) -> Result<Option<f64>> {
        let result: HashMap<String, HashMap<String, f64>> = self
            .get_json(
                "/simple/price",
                &[
                    ("ids", id.to_string()),
                    ("vs_currencies", "usd".to_string()),
                ],
            )
            .await?;
        Ok(result.get(id).and_then(|prices| prices.get("usd")).copied())
    }

    /// Aggregate market totals; an incomplete payload is a failure here so
    /// callers omit the overview instead of rendering zeros
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let result: GlobalEnvelope = self.get_json("/global", &[]).await?;
        let data = result.data;

        let usd_of = |map: &HashMap<String, f64>, what: &str| {
            map.get("usd").copied().ok_or_else(|| {
                HeraldError::InvalidPayload(format!("global stats missing usd {}", what))
            })
        };

        Ok(GlobalStats {
            total_market_cap_usd: usd_of(&data.total_market_cap, "market cap")?,
            total_volume_24h_usd: usd_of(&data.total_volume, "volume")?,
            btc_dominance_pct: data
                .market_cap_percentage
                .get("btc")
                .copied()
                .ok_or_else(|| {
                    HeraldError::InvalidPayload("global stats missing btc dominance".to_string())
                })?,
        })
    }

    /// Ranked markets by descending market cap, optionally restricted to a
    /// list of asset ids
    pub async fn markets(&self, per_page: usize, ids: Option<&[String]>) -> Result<Vec<AssetQuote>> {
        let mut query = vec![
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(ids) = ids {
            query.push(("ids", ids.join(",")));
        }

        let rows: Vec<MarketRow> = self.get_json("/coins/markets", &query).await?;
        Ok(rows.into_iter().map(AssetQuote::from).collect())
    }
}

#[async_trait]
impl CatalogSource for CoinGeckoClient {
    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.coin_list().await
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        self.search_coins(query).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct GlobalEnvelope {
    data: GlobalData,
}

#[derive(Debug, Deserialize, Default)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

impl From<MarketRow> for AssetQuote {
    fn from(row: MarketRow) -> Self {
        AssetQuote {
            id: row.id,
            symbol: row.symbol,
            name: row.name,
            price_usd: row.current_price,
            change_24h_pct: row.price_change_percentage_24h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_row_tolerates_missing_fields() {
        let row: MarketRow = serde_json::from_str(r#"{"id":"bitcoin"}"#).unwrap();
        let quote = AssetQuote::from(row);
        assert_eq!(quote.id, "bitcoin");
        assert!(quote.price_usd.is_none());
        assert!(quote.change_24h_pct.is_none());
    }

    #[test]
    fn test_global_envelope_parse() {
        let payload = r#"{
            "data": {
                "total_market_cap": {"usd": 2.5e12, "eur": 2.3e12},
                "total_volume": {"usd": 9.1e10},
                "market_cap_percentage": {"btc": 52.3, "eth": 17.1}
            }
        }"#;
        let envelope: GlobalEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(
            envelope.data.market_cap_percentage.get("btc").copied(),
            Some(52.3)
        );
    }

    #[test]
    fn test_search_response_parse_carries_rank() {
        let payload = r#"{
            "coins": [
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "market_cap_rank": 1},
                {"id": "batcat", "symbol": "btc", "name": "BatCat"}
            ]
        }"#;
        let result: SearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(result.coins.len(), 2);
        assert_eq!(result.coins[0].market_cap_rank, Some(1));
        assert_eq!(result.coins[1].market_cap_rank, None);
    }
}

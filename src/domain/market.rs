use serde::{Deserialize, Serialize};

/// Aggregate market totals from the global endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_market_cap_usd: f64,
    pub total_volume_24h_usd: f64,
    pub btc_dominance_pct: f64,
}

/// Externally-computed market mood (Fear & Greed index)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    pub value: u32,
    pub label: String,
}

/// Price and 24h change for one asset; fields missing upstream stay None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetQuote {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub price_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
}

/// Everything the market side contributes to one digest.
///
/// Each field degrades independently: a failed sub-fetch leaves its field
/// None/empty and the rest of the snapshot intact.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub global: Option<GlobalStats>,
    pub sentiment: Option<Sentiment>,
    pub quotes: Vec<AssetQuote>,
    pub gainers: Vec<AssetQuote>,
    pub losers: Vec<AssetQuote>,
}

/// Pick the top `n` gainers and losers by 24h percentage change.
///
/// Quotes without a change value are skipped. Sorting is stable, so assets
/// with equal change keep their source order.
pub fn select_movers(sample: &[AssetQuote], n: usize) -> (Vec<AssetQuote>, Vec<AssetQuote>) {
    let with_change: Vec<&AssetQuote> = sample
        .iter()
        .filter(|q| q.change_24h_pct.is_some())
        .collect();

    let pct = |q: &AssetQuote| q.change_24h_pct.unwrap_or(0.0);

    let mut gainers = with_change.clone();
    gainers.sort_by(|a, b| pct(b).total_cmp(&pct(a)));

    let mut losers = with_change;
    losers.sort_by(|a, b| pct(a).total_cmp(&pct(b)));

    (
        gainers.into_iter().take(n).cloned().collect(),
        losers.into_iter().take(n).cloned().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(id: &str, change: Option<f64>) -> AssetQuote {
        AssetQuote {
            id: id.into(),
            symbol: id.into(),
            name: id.into(),
            price_usd: Some(1.0),
            change_24h_pct: change,
        }
    }

    #[test]
    fn test_select_movers_top_three() {
        let sample = vec![
            quote("a", Some(5.0)),
            quote("b", Some(-2.0)),
            quote("c", Some(12.0)),
            quote("d", Some(-8.0)),
            quote("e", Some(1.0)),
        ];

        let (gainers, losers) = select_movers(&sample, 3);

        let gainer_ids: Vec<&str> = gainers.iter().map(|q| q.id.as_str()).collect();
        let loser_ids: Vec<&str> = losers.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(gainer_ids, vec!["c", "a", "e"]);
        assert_eq!(loser_ids, vec!["d", "b", "e"]);
    }

    #[test]
    fn test_select_movers_skips_missing_change() {
        let sample = vec![quote("a", None), quote("b", Some(3.0)), quote("c", None)];

        let (gainers, losers) = select_movers(&sample, 3);
        assert_eq!(gainers.len(), 1);
        assert_eq!(losers.len(), 1);
        assert_eq!(gainers[0].id, "b");
    }

    #[test]
    fn test_select_movers_ties_preserve_source_order() {
        let sample = vec![
            quote("first", Some(4.0)),
            quote("second", Some(4.0)),
            quote("third", Some(4.0)),
            quote("fourth", Some(9.0)),
        ];

        let (gainers, _) = select_movers(&sample, 4);
        let ids: Vec<&str> = gainers.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["fourth", "first", "second", "third"]);
    }
}

//! Digest composition: a pure transform over already-fetched data.
//!
//! Section order is fixed so recipients always receive a structurally
//! consistent report; a section whose source failed renders its fallback
//! line instead of disappearing.

use crate::domain::{
    escape_html, format_usd, format_usd_whole, AssetQuote, FeedItem, MarketSnapshot, Report,
    Section,
};

/// Headlines kept per source in the scheduled digest
const DIGEST_ITEMS_PER_SOURCE: usize = 3;

const OVERVIEW_TITLE: &str = "🌍 MARKET OVERVIEW";
const NEWS_TITLE: &str = "📰 NEWS HIGHLIGHTS";
const WATCHLIST_TITLE: &str = "💰 WATCHLIST";
const GAINERS_TITLE: &str = "📈 TOP GAINERS (24H)";
const LOSERS_TITLE: &str = "📉 TOP LOSERS (24H)";

/// Merge one market snapshot and the per-source feed items into a report
pub fn compose(snapshot: &MarketSnapshot, feeds: &[(String, Vec<FeedItem>)]) -> Report {
    Report {
        sections: vec![
            overview_section(snapshot),
            news_section(feeds),
            watchlist_section(snapshot),
            movers_section(GAINERS_TITLE, &snapshot.gainers),
            movers_section(LOSERS_TITLE, &snapshot.losers),
        ],
    }
}

fn overview_section(snapshot: &MarketSnapshot) -> Section {
    let mut lines = match &snapshot.global {
        Some(global) => vec![
            format!(
                "Total market cap: {}",
                format_usd_whole(global.total_market_cap_usd)
            ),
            format!(
                "24h volume: {}",
                format_usd_whole(global.total_volume_24h_usd)
            ),
            format!("BTC dominance: {:.2}%", global.btc_dominance_pct),
        ],
        None => vec!["data unavailable from this source".to_string()],
    };

    // Sentiment failure degrades to its marker line, nothing else
    lines.push(match &snapshot.sentiment {
        Some(s) => format!("Fear & Greed: {} ({})", s.value, escape_html(&s.label)),
        None => "Fear & Greed: not available".to_string(),
    });

    Section::new(OVERVIEW_TITLE, lines)
}

fn news_section(feeds: &[(String, Vec<FeedItem>)]) -> Section {
    let mut lines = Vec::new();
    for (_source, items) in feeds {
        for item in items.iter().take(DIGEST_ITEMS_PER_SOURCE) {
            lines.push(format!(
                "• <a href=\"{}\">{}</a>",
                escape_html(item.link.as_str()),
                escape_html(&item.title)
            ));
        }
    }

    if lines.is_empty() {
        Section::unavailable(NEWS_TITLE)
    } else {
        Section::new(NEWS_TITLE, lines)
    }
}

fn watchlist_section(snapshot: &MarketSnapshot) -> Section {
    if snapshot.quotes.is_empty() {
        return Section::unavailable(WATCHLIST_TITLE);
    }

    let lines = snapshot
        .quotes
        .iter()
        .map(|q| {
            let price = q
                .price_usd
                .map(format_usd)
                .unwrap_or_else(|| "N/A".to_string());
            let change = q
                .change_24h_pct
                .map(|pct| format!(" ({:+.2}%)", pct))
                .unwrap_or_default();
            format!(
                "{} ({}): {}{}",
                escape_html(&q.name),
                q.symbol.to_uppercase(),
                price,
                change
            )
        })
        .collect();

    Section::new(WATCHLIST_TITLE, lines)
}

fn movers_section(title: &str, movers: &[AssetQuote]) -> Section {
    if movers.is_empty() {
        return Section::unavailable(title);
    }

    let lines = movers
        .iter()
        .map(|q| {
            let price = q
                .price_usd
                .map(format_usd)
                .unwrap_or_else(|| "N/A".to_string());
            format!(
                "{}: {:+.2}% ({})",
                q.symbol.to_uppercase(),
                q.change_24h_pct.unwrap_or(0.0),
                price
            )
        })
        .collect();

    Section::new(title, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetQuote, GlobalStats, Sentiment};
    use url::Url;

    fn item(title: &str, link: &str) -> FeedItem {
        let url = Url::parse(link).unwrap();
        FeedItem {
            title: title.to_string(),
            link: url.clone(),
            source_url: url,
        }
    }

    fn quote(id: &str, symbol: &str, price: f64, change: f64) -> AssetQuote {
        AssetQuote {
            id: id.into(),
            symbol: symbol.into(),
            name: id.into(),
            price_usd: Some(price),
            change_24h_pct: Some(change),
        }
    }

    #[test]
    fn test_fully_failed_cycle_still_yields_five_sections() {
        let report = compose(&MarketSnapshot::default(), &[]);

        assert_eq!(report.sections.len(), 5);
        for section in &report.sections {
            assert!(!section.lines.is_empty());
        }
        // Overview carries the sentiment marker alongside its fallback line
        assert!(report.sections[0]
            .lines
            .contains(&"Fear & Greed: not available".to_string()));
        assert_eq!(
            report.sections[1].lines,
            vec!["data unavailable from this source".to_string()]
        );
    }

    #[test]
    fn test_section_order_is_fixed() {
        let report = compose(&MarketSnapshot::default(), &[]);
        let titles: Vec<&str> = report
            .sections
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                OVERVIEW_TITLE,
                NEWS_TITLE,
                WATCHLIST_TITLE,
                GAINERS_TITLE,
                LOSERS_TITLE
            ]
        );
    }

    #[test]
    fn test_news_caps_items_per_source() {
        let feed_items: Vec<FeedItem> = (0..5)
            .map(|i| item(&format!("Post {}", i), "https://news.example.com/p"))
            .collect();
        let feeds = vec![("https://news.example.com/feed/".to_string(), feed_items)];

        let report = compose(&MarketSnapshot::default(), &feeds);
        assert_eq!(report.sections[1].lines.len(), DIGEST_ITEMS_PER_SOURCE);
    }

    #[test]
    fn test_news_titles_are_escaped() {
        let feeds = vec![(
            "https://news.example.com/feed/".to_string(),
            vec![item("Pump & dump <alert>", "https://news.example.com/p")],
        )];

        let report = compose(&MarketSnapshot::default(), &feeds);
        assert!(report.sections[1].lines[0].contains("Pump &amp; dump &lt;alert&gt;"));
    }

    #[test]
    fn test_populated_snapshot_renders_every_section() {
        let snapshot = MarketSnapshot {
            global: Some(GlobalStats {
                total_market_cap_usd: 2.5e12,
                total_volume_24h_usd: 9.0e10,
                btc_dominance_pct: 52.31,
            }),
            sentiment: Some(Sentiment {
                value: 71,
                label: "Greed".into(),
            }),
            quotes: vec![quote("bitcoin", "btc", 67000.0, 1.2)],
            gainers: vec![quote("solana", "sol", 180.0, 9.5)],
            losers: vec![quote("dogecoin", "doge", 0.12, -4.1)],
        };

        let report = compose(&snapshot, &[]);
        assert!(report.sections[0].lines[2].contains("52.31%"));
        assert!(report.sections[0].lines[3].contains("71 (Greed)"));
        assert!(report.sections[2].lines[0].contains("BTC"));
        assert!(report.sections[3].lines[0].contains("+9.50%"));
        assert!(report.sections[4].lines[0].contains("-4.10%"));
    }
}

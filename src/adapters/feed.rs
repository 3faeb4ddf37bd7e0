//! Syndication feed adapter.
//!
//! Fetches one feed URL and extracts its items. Parsing runs in two passes:
//! a strict XML pass first, and when that yields nothing, a relaxed re-parse
//! with end-name checking disabled. The relaxed pass recovers `<item>`
//! blocks from payloads that are acceptable HTML but not well-formed XML,
//! including the shape where `<link>` is treated as a void element and the
//! URL ends up as trailing text.
//!
//! `fetch` never propagates an error: a broken source yields an empty item
//! list so one feed cannot take down the rest of a digest.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{resolve_link, FeedItem};
use crate::error::{HeraldError, Result};

#[derive(Clone)]
pub struct FeedFetcher {
    http: Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
}

#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
}

impl RawItem {
    fn push_text(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
        };
        match slot {
            Some(existing) => existing.push_str(text),
            None => *slot = Some(text.to_string()),
        }
    }

    fn into_feed_item(self, source: &Url) -> FeedItem {
        let link = resolve_link(self.link.as_deref(), self.guid.as_deref(), source);
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "(untitled)".to_string());
        FeedItem {
            title,
            link,
            source_url: source.clone(),
        }
    }
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; herald/0.1; market digest bot)")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HeraldError::Internal(format!("failed to build feed HTTP client: {}", e))
            })?;

        Ok(Self { http })
    }

    /// Fetch and parse one feed; any failure degrades to an empty list
    pub async fn fetch(&self, source: &str) -> Vec<FeedItem> {
        let url = match Url::parse(source) {
            Ok(url) => url,
            Err(e) => {
                warn!("invalid feed source url {}: {}", source, e);
                return Vec::new();
            }
        };

        match self.try_fetch(&url).await {
            Ok(items) => {
                debug!("feed {} yielded {} items", url, items.len());
                items
            }
            Err(e) => {
                warn!("feed fetch failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, source: &Url) -> Result<Vec<FeedItem>> {
        let body = self
            .http
            .get(source.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut raw = parse_items(&body, ParseMode::Strict);
        if raw.is_empty() {
            raw = parse_items(&body, ParseMode::Relaxed);
        }

        Ok(raw
            .into_iter()
            .map(|item| item.into_feed_item(source))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Strict,
    Relaxed,
}

/// Extract item/entry blocks from a syndication payload.
///
/// Strict mode aborts (returning nothing) on the first malformation so the
/// caller can retry relaxed; relaxed mode keeps whatever was extracted up to
/// the point of failure.
fn parse_items(payload: &str, mode: ParseMode) -> Vec<RawItem> {
    let mut reader = Reader::from_str(payload);
    let config = reader.config_mut();
    config.trim_text_start = true;
    config.trim_text_end = true;
    config.check_end_names = mode == ParseMode::Strict;

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        current = Some(RawItem::default());
                        field = None;
                    }
                    b"title" => field = Some(Field::Title),
                    b"link" => {
                        field = Some(Field::Link);
                        // Atom-style <link href="..."/>
                        if let Some(item) = current.as_mut() {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"href" {
                                    let href = String::from_utf8_lossy(&attr.value).into_owned();
                                    item.push_text(Field::Link, &href);
                                }
                            }
                        }
                    }
                    b"guid" | b"id" => field = Some(Field::Guid),
                    _ => field = None,
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    // Undefined entities (e.g. &nbsp;) are common in HTML-ish
                    // feeds; keep the raw bytes when unescaping fails
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    item.push_text(field, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    item.push_text(field, &text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("feed parse error ({:?} mode): {}", mode, e);
                if mode == ParseMode::Strict {
                    return Vec::new();
                }
                break;
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://news.example.com/feed/").unwrap()
    }

    #[test]
    fn test_strict_parse_of_wellformed_rss() {
        let payload = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Example Feed</title>
  <item>
    <title>Hello world</title>
    <link>https://news.example.com/post/1</link>
    <guid>https://news.example.com/post/1</guid>
  </item>
  <item>
    <title><![CDATA[Markets & more]]></title>
    <link>https://news.example.com/post/2</link>
  </item>
</channel></rss>"#;

        let items = parse_items(payload, ParseMode::Strict);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Hello world"));
        assert_eq!(
            items[0].link.as_deref(),
            Some("https://news.example.com/post/1")
        );
        assert_eq!(items[1].title.as_deref(), Some("Markets & more"));
    }

    #[test]
    fn test_channel_title_does_not_leak_into_items() {
        let payload = r#"<rss><channel><title>Feed title</title>
<item><title>Post</title><link>https://news.example.com/p</link></item>
</channel></rss>"#;

        let items = parse_items(payload, ParseMode::Strict);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Post"));
    }

    #[test]
    fn test_relaxed_pass_recovers_html_items() {
        // Unclosed <link> tags: not XML, but acceptable HTML
        let payload = r#"<html><body>
<item><title>First post</title><link>https://news.example.com/a</item>
<item><title>Second post</title><link>https://news.example.com/b</item>
</body></html>"#;

        assert!(parse_items(payload, ParseMode::Strict).is_empty());

        let items = parse_items(payload, ParseMode::Relaxed);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("First post"));
        assert_eq!(items[0].link.as_deref(), Some("https://news.example.com/a"));
        assert_eq!(items[1].link.as_deref(), Some("https://news.example.com/b"));
    }

    #[test]
    fn test_void_link_followed_by_text() {
        let payload = r#"<rss><channel>
<item><title>Post</title><link/>https://news.example.com/x<guid>https://news.example.com/x</guid></item>
</channel></rss>"#;

        let items = parse_items(payload, ParseMode::Strict);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link.as_deref(), Some("https://news.example.com/x"));
    }

    #[test]
    fn test_atom_entries_with_href_links() {
        let payload = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Atom post</title>
    <link href="https://news.example.com/atom/1"/>
    <id>tag:news.example.com,2024:1</id>
  </entry>
</feed>"#;

        let items = parse_items(payload, ParseMode::Strict);
        assert_eq!(items.len(), 1);
        let feed_item = items.into_iter().next().unwrap().into_feed_item(&source());
        assert_eq!(feed_item.link.as_str(), "https://news.example.com/atom/1");
    }

    #[test]
    fn test_item_without_usable_link_falls_back_to_source() {
        let payload = r#"<rss><channel>
<item><title>No link here</title><guid>internal-id-17</guid></item>
</channel></rss>"#;

        let items = parse_items(payload, ParseMode::Strict);
        let feed_item = items.into_iter().next().unwrap().into_feed_item(&source());
        assert_eq!(feed_item.link, source());
        assert_eq!(feed_item.title, "No link here");
    }
}

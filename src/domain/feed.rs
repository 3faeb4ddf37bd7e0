use serde::{Deserialize, Serialize};
use url::Url;

/// One headline pulled from a syndication feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: Url,
    pub source_url: Url,
}

/// Resolve an item's link from the raw `<link>`/`<guid>` text.
///
/// Precedence: the link element when it is an absolute URL, then an
/// absolute-URL substring of the guid, then the feed source itself.
pub fn resolve_link(link: Option<&str>, guid: Option<&str>, source: &Url) -> Url {
    if let Some(link) = link {
        let link = link.trim();
        if is_absolute(link) {
            if let Ok(url) = Url::parse(link) {
                return url;
            }
        }
    }

    if let Some(guid) = guid {
        if let Some(idx) = guid.find("http") {
            let candidate = guid[idx..].trim();
            if is_absolute(candidate) {
                if let Ok(url) = Url::parse(candidate) {
                    return url;
                }
            }
        }
    }

    source.clone()
}

fn is_absolute(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://news.example.com/feed/").unwrap()
    }

    #[test]
    fn test_absolute_link_wins() {
        let url = resolve_link(
            Some("https://news.example.com/post/1"),
            Some("https://news.example.com/guid/1"),
            &source(),
        );
        assert_eq!(url.as_str(), "https://news.example.com/post/1");
    }

    #[test]
    fn test_guid_substring_when_link_relative() {
        let url = resolve_link(
            Some("/post/1"),
            Some("permalink: https://news.example.com/guid/1"),
            &source(),
        );
        assert_eq!(url.as_str(), "https://news.example.com/guid/1");
    }

    #[test]
    fn test_source_fallback() {
        let url = resolve_link(Some("not-a-url"), Some("tag:1234"), &source());
        assert_eq!(url, source());
    }

    #[test]
    fn test_missing_everything_falls_back_to_source() {
        assert_eq!(resolve_link(None, None, &source()), source());
    }
}

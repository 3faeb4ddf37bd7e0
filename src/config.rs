use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot API token (usually set via HERALD_TELEGRAM__BOT_TOKEN)
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Bot API base URL override (tests/self-hosted gateways)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Optional group/channel chat that receives every digest
    #[serde(default)]
    pub broadcast_chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// CoinGecko API base URL
    #[serde(default = "default_market_api_base")]
    pub api_base: String,
    /// Asset ids quoted individually in every digest
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
    /// Size of the ranked pull used to pick top gainers/losers
    #[serde(default = "default_movers_sample")]
    pub movers_sample: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    /// Fear & Greed index API base URL
    #[serde(default = "default_sentiment_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON state file (subscribers, feed sources, report time)
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Catalog cache lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_market_api_base() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_watchlist() -> Vec<String> {
    ["bitcoin", "ethereum", "binancecoin", "solana"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_movers_sample() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_sentiment_api_base() -> String {
    "https://api.alternative.me".to_string()
}

fn default_store_path() -> String {
    "herald.json".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_base: default_market_api_base(),
            watchlist: default_watchlist(),
            movers_sample: default_movers_sample(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            api_base: default_sentiment_api_base(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HERALD_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HERALD_TELEGRAM__BOT_TOKEN, etc.)
            .add_source(
                Environment::with_prefix("HERALD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.market.movers_sample < 10 {
            errors.push("movers_sample must be at least 10".to_string());
        }

        if self.market.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }

        if self.resolver.cache_ttl_secs == 0 {
            errors.push("cache_ttl_secs must be positive".to_string());
        }

        if self.store.path.trim().is_empty() {
            errors.push("store path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.market.movers_sample, 50);
        assert_eq!(config.resolver.cache_ttl_secs, 3600);
        assert_eq!(config.store.path, "herald.json");
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_validate_rejects_small_movers_sample() {
        let mut config = AppConfig::default();
        config.market.movers_sample = 3;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("movers_sample")));
    }
}

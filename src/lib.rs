pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod services;

pub use adapters::{CoinGeckoClient, FearGreedClient, FeedFetcher, TelegramClient};
pub use config::AppConfig;
pub use domain::{
    AssetQuote, CatalogEntry, CoinIndex, FeedItem, GlobalStats, MarketSnapshot, Report, Section,
    Sentiment,
};
pub use error::{HeraldError, Result};
pub use persistence::{BotState, BotStore, Subscriber};
pub use services::{
    Broadcaster, CoinResolver, DeliveryReport, DigestPipeline, DigestScheduler,
    MarketSnapshotProvider,
};

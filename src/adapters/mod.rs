pub mod coingecko;
pub mod feed;
pub mod sentiment;
pub mod telegram;

pub use coingecko::CoinGeckoClient;
pub use feed::FeedFetcher;
pub use sentiment::FearGreedClient;
pub use telegram::TelegramClient;

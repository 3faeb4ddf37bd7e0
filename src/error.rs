use thiserror::Error;

/// Main error type for the digest bot
#[derive(Error, Debug)]
pub enum HeraldError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // Catalog/resolution errors
    #[error("Coin not found: {0}")]
    CoinNotFound(String),

    // Delivery errors
    #[error("Delivery failed: {0}")]
    Delivery(String),

    // Schedule errors
    #[error("Invalid schedule time: {0}")]
    InvalidSchedule(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for HeraldError
pub type Result<T> = std::result::Result<T, HeraldError>;

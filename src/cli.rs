use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "herald")]
#[command(version = "0.1.0")]
#[command(about = "Crypto market digest bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduled digest daemon
    Run,
    /// Build and broadcast one digest immediately
    Report,
    /// Resolve a coin (id, symbol, or name) and show its USD price
    Price {
        /// Token to look up, e.g. "btc" or "bitcoin"
        token: String,
    },
    /// Show the top coins by market cap
    Top {
        /// Number of coins to show
        #[arg(default_value = "10")]
        count: usize,
    },
    /// Show the latest headlines from the configured feeds
    News,
    /// Manage digest subscribers
    Subscriber {
        #[command(subcommand)]
        action: SubscriberAction,
    },
    /// Manage news feed sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Set the daily report time (24-hour HH:MM)
    SetTime {
        /// Report time, e.g. "08:00"
        time: String,
    },
}

#[derive(Subcommand)]
pub enum SubscriberAction {
    /// Register a chat id as a digest recipient
    Add {
        id: String,
        /// Display name kept alongside the id
        #[arg(default_value = "")]
        name: String,
    },
    /// Remove a recipient
    Remove { id: String },
    /// List all recipients
    List,
}

#[derive(Subcommand)]
pub enum SourceAction {
    /// Add a feed URL
    Add { url: String },
    /// Remove a feed URL
    Remove { url: String },
    /// List all feed URLs
    List,
}

use clap::Parser;
use herald::adapters::{CoinGeckoClient, FearGreedClient, FeedFetcher, TelegramClient};
use herald::cli::{Cli, Commands, SourceAction, SubscriberAction};
use herald::config::AppConfig;
use herald::domain::format_usd;
use herald::error::{HeraldError, Result};
use herald::persistence::BotStore;
use herald::services::scheduler::parse_report_time;
use herald::services::{
    Broadcaster, CoinResolver, DigestPipeline, DigestScheduler, MarketSnapshotProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        return Err(HeraldError::Internal("invalid configuration".to_string()));
    }

    match &cli.command {
        Commands::Run => {
            init_logging(&config);
            run_daemon(&config).await?;
        }
        Commands::Report => {
            init_logging(&config);
            run_report_once(&config).await?;
        }
        Commands::Price { token } => {
            init_logging_simple();
            run_price(&config, token).await?;
        }
        Commands::Top { count } => {
            init_logging_simple();
            run_top(&config, *count).await?;
        }
        Commands::News => {
            init_logging_simple();
            run_news(&config).await?;
        }
        Commands::Subscriber { action } => {
            init_logging_simple();
            run_subscriber(&config, action).await?;
        }
        Commands::Source { action } => {
            init_logging_simple();
            run_source(&config, action).await?;
        }
        Commands::SetTime { time } => {
            init_logging_simple();
            run_set_time(&config, time).await?;
        }
    }

    Ok(())
}

async fn run_daemon(config: &AppConfig) -> Result<()> {
    let (store, pipeline) = build_pipeline(config)?;
    let scheduler = DigestScheduler::new(store, pipeline);

    info!("herald daemon started");
    tokio::select! {
        _ = scheduler.run() => {}
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn run_report_once(config: &AppConfig) -> Result<()> {
    let (_store, pipeline) = build_pipeline(config)?;
    let outcome = pipeline.run_cycle().await?;

    println!(
        "Digest sent: {} delivered, {} failed",
        outcome.delivered,
        outcome.failed.len()
    );
    for (chat_id, error) in &outcome.failed {
        println!("  ✗ {}: {}", chat_id, error);
    }
    Ok(())
}

async fn run_price(config: &AppConfig, token: &str) -> Result<()> {
    let market = market_client(config)?;
    let resolver = CoinResolver::new(
        Arc::new(market.clone()),
        chrono::Duration::seconds(config.resolver.cache_ttl_secs as i64),
    );

    let entry = resolver.resolve(token).await?;
    match market.simple_price_usd(&entry.id).await? {
        Some(price) => println!(
            "💰 {} ({}): {}",
            entry.name,
            entry.symbol.to_uppercase(),
            format_usd(price)
        ),
        None => println!("⚠️ no USD price available for {}", entry.id),
    }
    Ok(())
}

async fn run_top(config: &AppConfig, count: usize) -> Result<()> {
    let provider = snapshot_provider(config)?;
    let rows = provider.top(count).await?;

    println!("🏆 Top {} coins by market cap:", count);
    for (i, quote) in rows.iter().enumerate() {
        let price = quote
            .price_usd
            .map(format_usd)
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:>2}. {} ({}): {}",
            i + 1,
            quote.name,
            quote.symbol.to_uppercase(),
            price
        );
    }
    Ok(())
}

async fn run_news(config: &AppConfig) -> Result<()> {
    // Compact on-demand listing keeps more headlines than the digest
    const ITEMS_PER_SOURCE: usize = 5;

    let store = BotStore::new(&config.store.path);
    let fetcher = FeedFetcher::new(request_timeout(config))?;
    let state = store.load().await?;

    for source in &state.news_sources {
        println!("🗞️ {}", source);
        let items = fetcher.fetch(source).await;
        if items.is_empty() {
            println!("   (no items)");
        }
        for item in items.iter().take(ITEMS_PER_SOURCE) {
            println!("   • {} — {}", item.title, item.link);
        }
    }
    Ok(())
}

async fn run_subscriber(config: &AppConfig, action: &SubscriberAction) -> Result<()> {
    let store = BotStore::new(&config.store.path);
    match action {
        SubscriberAction::Add { id, name } => {
            if store.add_subscriber(id, name).await? {
                println!("✅ subscriber {} added", id);
            } else {
                println!("⚠️ subscriber {} already registered", id);
            }
        }
        SubscriberAction::Remove { id } => {
            if store.remove_subscriber(id).await? {
                println!("🗑️ subscriber {} removed", id);
            } else {
                println!("⚠️ subscriber {} not found", id);
            }
        }
        SubscriberAction::List => {
            let state = store.load().await?;
            if state.subscribers.is_empty() {
                println!("(no subscribers)");
            }
            for subscriber in &state.subscribers {
                if subscriber.name.is_empty() {
                    println!("• {}", subscriber.id);
                } else {
                    println!("• {} — {}", subscriber.name, subscriber.id);
                }
            }
        }
    }
    Ok(())
}

async fn run_source(config: &AppConfig, action: &SourceAction) -> Result<()> {
    let store = BotStore::new(&config.store.path);
    match action {
        SourceAction::Add { url } => {
            url::Url::parse(url)
                .map_err(|e| HeraldError::Internal(format!("invalid feed url {}: {}", url, e)))?;
            if store.add_source(url).await? {
                println!("✅ source added");
            } else {
                println!("⚠️ source already present");
            }
        }
        SourceAction::Remove { url } => {
            if store.remove_source(url).await? {
                println!("🗑️ source removed");
            } else {
                println!("⚠️ source not found");
            }
        }
        SourceAction::List => {
            let state = store.load().await?;
            for source in &state.news_sources {
                println!("• {}", source);
            }
        }
    }
    Ok(())
}

async fn run_set_time(config: &AppConfig, time: &str) -> Result<()> {
    if parse_report_time(time).is_none() {
        return Err(HeraldError::InvalidSchedule(format!(
            "{} (expected 24-hour HH:MM)",
            time
        )));
    }

    let store = BotStore::new(&config.store.path);
    store.set_report_time(time.trim()).await?;
    println!("⏰ daily report time set to {}", time.trim());
    Ok(())
}

fn build_pipeline(config: &AppConfig) -> Result<(Arc<BotStore>, DigestPipeline)> {
    let telegram = telegram_client(config)?;
    let store = Arc::new(BotStore::new(&config.store.path));
    let provider = Arc::new(snapshot_provider(config)?);
    let feeds = FeedFetcher::new(request_timeout(config))?;
    let broadcaster = Broadcaster::new(Arc::new(telegram));

    let pipeline = DigestPipeline::new(
        Arc::clone(&store),
        provider,
        feeds,
        broadcaster,
        config.telegram.broadcast_chat_id.clone(),
    );
    Ok((store, pipeline))
}

fn snapshot_provider(config: &AppConfig) -> Result<MarketSnapshotProvider> {
    let market = Arc::new(market_client(config)?);
    let sentiment = Arc::new(FearGreedClient::new(
        Some(&config.sentiment.api_base),
        request_timeout(config),
    )?);
    Ok(MarketSnapshotProvider::new(
        market,
        sentiment,
        config.market.watchlist.clone(),
        config.market.movers_sample,
    ))
}

fn market_client(config: &AppConfig) -> Result<CoinGeckoClient> {
    CoinGeckoClient::new(Some(&config.market.api_base), request_timeout(config))
}

fn telegram_client(config: &AppConfig) -> Result<TelegramClient> {
    // The bot token is the one mandatory startup credential
    let token = config
        .telegram
        .bot_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            HeraldError::Internal(
                "telegram bot token is not configured (set HERALD_TELEGRAM__BOT_TOKEN)".to_string(),
            )
        })?;

    TelegramClient::new(
        token,
        config.telegram.api_base.as_deref(),
        request_timeout(config),
    )
}

fn request_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.market.request_timeout_secs)
}

fn init_logging(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},herald=debug", config.logging.level)));

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial log file, so writability is checked up front.
    let file_layer = std::env::var("HERALD_LOG_DIR").ok().and_then(|log_dir| {
        if std::fs::create_dir_all(&log_dir).is_err() {
            eprintln!(
                "Warning: could not create log directory {}, file logging disabled",
                log_dir
            );
            return None;
        }
        let test_path = std::path::Path::new(&log_dir).join(".herald_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(&log_dir, "herald.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the process lifetime
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn init_logging_simple() {
    // Minimal logging for quick CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

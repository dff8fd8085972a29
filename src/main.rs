use std::sync::Arc;

use matchbot::bot::MatchBot;
use matchbot::channels::{Channel, ChannelManager, CliChannel, Responder, TelegramChannel};
use matchbot::config::BotConfig;
use matchbot::profile::{InMemoryProfileStore, ProfileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::load()?;

    eprintln!("💘 Match bot v{}", env!("CARGO_PKG_VERSION"));
    if let Some(ref name) = config.bot_username {
        eprintln!("   Bot: @{}", name);
    }

    // Set up channels
    let mut channels = ChannelManager::new();

    if config.enable_cli {
        channels.add(Box::new(CliChannel::new()));
        eprintln!("   CLI: enabled (type /photo <id> to send a photo)");
    }

    if let Some(token) = config.telegram_token {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if config.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                config.allowed_users.join(", ")
            }
        );
        let telegram = TelegramChannel::new(token, config.allowed_users);
        if let Err(e) = telegram.health_check().await {
            eprintln!("   Warning: Telegram health check failed: {}", e);
        }
        channels.add(Box::new(telegram));
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    let channels = Arc::new(channels);
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let responder: Arc<dyn Responder> = channels.clone();
    let bot = Arc::new(MatchBot::new(store, responder));

    let messages = channels.start_all().await?;
    bot.run(messages).await;
    channels.shutdown_all().await;

    Ok(())
}

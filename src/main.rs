//! Anchor - lecture catalog service

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anchor::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("anchor={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Anchor - lecture catalog");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"));
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Datastore: {}", args.supabase_base().unwrap_or("in-memory"));
    info!("Discord guild: {}", args.discord_guild_id);
    info!("Gated paths: {}", args.gated_path_list().join(", "));
    info!("======================================");

    let state = Arc::new(server::AppState::new(args).context("failed to initialise services")?);

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

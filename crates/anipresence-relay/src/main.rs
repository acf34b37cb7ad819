use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use anipresence_core::AppConfig;
use anipresence_relay::discord::DiscordHandle;
use anipresence_relay::{server, RelayError, RelayState};

/// Forward anime viewing status from the browser to Discord Rich Presence.
#[derive(Debug, Parser)]
#[command(name = "anipresence-relay", version)]
struct Args {
    /// Config file to use instead of the user config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `relay.listen`).
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Discord application ID (overrides `relay.discord_app_id`).
    #[arg(long)]
    app_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anipresence=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(app_id) = args.app_id {
        config.relay.discord_app_id = app_id;
    }
    let addr = match args.listen {
        Some(addr) => addr,
        None => config.relay.listen.parse()?,
    };

    let discord = DiscordHandle::start(config.relay.discord_app_id.clone())?;
    let state = RelayState::new(Arc::new(discord.clone()), config.relay);

    let listener = TcpListener::bind(addr).await?;
    let result = server::serve(listener, state).await;
    discord.shutdown();
    result
}

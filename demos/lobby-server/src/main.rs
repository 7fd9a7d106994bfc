//! A minimal Tavern deployment: one persistent lobby, tokens from the
//! environment, players kept in memory.
//!
//! ```text
//! TAVERN_ADDR=0.0.0.0:7400 TAVERN_TOKENS=alpha=alice,beta=bob cargo run -p lobby-server
//! ```

use tavern::prelude::*;

const DEFAULT_TOKENS: &str = "alice-token=alice,bob-token=bob";

/// Parses `token=player` pairs separated by commas. Malformed entries are
/// skipped with a warning.
fn authenticator(spec: &str) -> StaticTokenAuthenticator {
    let mut auth = StaticTokenAuthenticator::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((token, player)) if !token.is_empty() && !player.is_empty() => {
                auth = auth.with_token(token, player);
            }
            _ => tracing::warn!(entry, "ignoring malformed token entry"),
        }
    }
    auth
}

#[tokio::main]
async fn main() -> Result<(), TavernError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("TAVERN_ADDR") {
        config.bind_addr = addr;
    }
    let tokens = std::env::var("TAVERN_TOKENS").unwrap_or_else(|_| DEFAULT_TOKENS.to_string());

    let server = TavernServer::builder()
        .config(config)
        .build(authenticator(&tokens), MemoryPlayerStore::new(), NoActionService)
        .await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("ctrl-c received, shutting down");
        shutdown.shutdown();
    });

    server.run().await
}

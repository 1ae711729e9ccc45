//! Entry point of the orito chat web UI.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use orito_chat::config::AppConfig;
use orito_chat::server::start_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before reading CHATBOT_API_URL and friends
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;

    init_tracing(config.logging.json);

    info!(
        name: "config.loaded",
        api = %config.api.base_url,
        address = %config.listen_addr(),
        "Configuration loaded"
    );

    start_server(Arc::new(config)).await
}

/// Initialize tracing (M-LOG-STRUCTURED). `RUST_LOG` overrides the default level.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (plain, json) = if json {
        (None, Some(fmt::layer().json().with_target(true)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();
}

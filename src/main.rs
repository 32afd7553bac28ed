use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use research_gateway::config::{self, Environment};
use research_gateway::routes;
use research_gateway::state::AppState;
use research_gateway::store::memory::MemoryStore;
use research_gateway::users::MemoryUserDirectory;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = config::config().clone();

    if config.security.token_secret.is_empty() {
        bail!("GATEWAY_TOKEN_SECRET must be set outside development");
    }

    let store = Arc::new(MemoryStore::new());
    let users = if config.environment == Environment::Production {
        Arc::new(MemoryUserDirectory::new())
    } else {
        Arc::new(MemoryUserDirectory::with_dev_users().await)
    };

    info!(environment = ?config.environment, "starting research gateway");

    let state = AppState::new(config, store, users);
    let app = routes::app(state);

    let port: u16 = std::env::var("GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

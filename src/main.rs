//! Limpo authentication server

use anyhow::Context;
use limpo_auth::{bootstrap, create_routes, AuthConfig};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AuthConfig::from_env().context("failed to load configuration")?;
    let auth = bootstrap(&config)
        .await
        .context("failed to initialize authentication service")?;

    let app = create_routes(auth).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Authentication service listening");

    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use sketchsync_server::{AppState, ServerConfig, ServerError, serve};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchsync_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.tokens.is_empty() && config.share_tokens.is_empty() {
        warn!("No tokens configured; set SKETCHSYNC_TOKENS or every connection is rejected");
    }
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SketchSync relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws/{{board_id}}", addr);

    serve(listener, state).await
}

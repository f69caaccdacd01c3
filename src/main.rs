//! Tomoni chat server
//!
//! Serves the streaming and fallback chat endpoints in front of Groq.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tomoni_chat::config::Config;
use tomoni_chat::core::ChatEngine;
use tomoni_chat::providers::{GroqConfig, GroqProvider};
use tomoni_chat::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tomoni_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    if !config.has_api_key() {
        tracing::warn!(
            "{} is not set; chat endpoints will answer with an error",
            config.api_key_env
        );
    }

    let provider = Arc::new(GroqProvider::new(GroqConfig::from(&config))?);
    tracing::info!(
        base_url = %config.base_url,
        default_model = %config.default_model,
        fallbacks = config.fallback_models.len(),
        "upstream provider ready"
    );

    let state = AppState {
        engine: Arc::new(ChatEngine::new(config, provider)),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Tomoni chat running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

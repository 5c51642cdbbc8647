//! TaskFlow API server
//!
//! Serves the REST API and the Socket.IO live-sync channel from one port.

mod auth;
mod config;
mod error;
mod extract;
mod pipeline;
mod realtime;
mod routes;
mod state;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::realtime::create_socket_layer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=debug,tower_http=debug,socketioxide=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let state = AppState::new(config.clone()).await?;

    let (socket_layer, io) = create_socket_layer(state.socket_state());
    state.broadcaster().set_socket_io(io).await;
    state
        .broadcaster()
        .spawn_delivery_log(state.sessions().clone());

    let app = routes::router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error::mask_internal_errors,
        ))
        .with_state(state)
        .layer(socket_layer)
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("TaskFlow listening on {} ({:?})", addr, config.environment);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match &config.client_url {
        Some(origin) => layer.allow_origin(origin.parse::<HeaderValue>()?),
        None => layer.allow_origin(Any),
    })
}

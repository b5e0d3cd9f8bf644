//! Gateway HTTP server: health probe plus webhook dispatch to channel handlers.

use crate::backend::{Backend, MemoryBackend};
use crate::channels::{GlobeHandler, HandlerRegistry, ReceiveOutcome};
use crate::config::{self, Config};
use crate::gateway::protocol::AckResponse;
use crate::init;
use crate::msg::ChannelType;
use crate::transport::ReqwestTransport;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Shared state for the gateway (config, backend, handlers).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
    pub registry: Arc<HandlerRegistry>,
}

/// Build the in-memory backend from configured channels and register every handler.
pub async fn build_state(config: Config) -> Result<GatewayState> {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::with_channels(config.channels.clone()));
    let transport = Arc::new(
        ReqwestTransport::new(config::resolve_http_timeout(&config))
            .context("building http transport")?,
    );

    let registry = HandlerRegistry::new();
    registry
        .register(Arc::new(GlobeHandler::new(
            backend.clone(),
            transport,
            config::resolve_globe_settings(&config),
        )))
        .await;
    log::info!("loaded {} channel(s)", config.channels.len());

    Ok(GatewayState {
        config: Arc::new(config),
        backend,
        registry: Arc::new(registry),
    })
}

/// Routes served by the gateway.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/c/:channel_type/:uuid/:action", post(receive_http))
        .with_state(state)
}

pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path)?;
    let bind = config.gateway.bind.trim().to_string();
    let port = config.gateway.port;
    let state = build_state(config).await?;
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /c/{type}/{uuid}/{action}: hands the raw body to the channel's handler.
async fn receive_http(
    State(state): State<GatewayState>,
    Path((channel_type, channel_uuid, action)): Path<(String, String, String)>,
    body: Bytes,
) -> (StatusCode, Json<AckResponse>) {
    let channel_type = ChannelType::new(&channel_type);
    let Ok(uuid) = Uuid::parse_str(&channel_uuid) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(AckResponse::error(format!("invalid channel uuid: {}", channel_uuid))),
        );
    };
    let Some(handler) = state.registry.route(&channel_type, "POST", &action).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(AckResponse::error(format!(
                "no handler for {} action '{}'",
                channel_type, action
            ))),
        );
    };
    let channel = match state.backend.get_channel(&channel_type, uuid).await {
        Ok(c) => c,
        Err(e) => {
            log::warn!("webhook for unknown channel: {}", e);
            return (StatusCode::BAD_REQUEST, Json(AckResponse::error(e.to_string())));
        }
    };

    match handler.receive(&channel, &action, &body).await {
        Ok(ReceiveOutcome::Ignored { reason }) => {
            log::debug!("{} {}: ignored: {}", channel_type, uuid, reason);
            (StatusCode::OK, Json(AckResponse::ignored(reason)))
        }
        Ok(ReceiveOutcome::Accepted(msgs)) => (StatusCode::OK, Json(AckResponse::accepted(&msgs))),
        Err(e) if e.is_request_error() => {
            log::warn!("{} {}: request error: {}", channel_type, uuid, e);
            (StatusCode::BAD_REQUEST, Json(AckResponse::error(e.to_string())))
        }
        Err(e) => {
            log::error!("{} {}: {}", channel_type, uuid, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse::error(e.to_string())),
            )
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let mut handlers: Vec<String> = state
        .registry
        .channel_types()
        .await
        .into_iter()
        .map(|t| t.to_string())
        .collect();
    handlers.sort();
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "handlers": handlers,
        "channels": state.config.channels.len(),
    }))
}

//! HTTP surface of the cat picker
//!
//! - `POST /api/messages`: relay one user message, reply with the assistant's answer
//! - `GET /health`: liveness probe

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use catpicker_core::config::ServerConfig;
use catpicker_core::{Error, MessagePayload, MessageRelay};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const VALIDATION_STATUS_CODE: u32 = 10422;
const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<MessageRelay>,
    /// Fired on shutdown; in-flight run loops stop polling
    pub shutdown: CancellationToken,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", post(post_message))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(config: &ServerConfig, relay: MessageRelay) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host:port combination: {}", e))?;

    let shutdown = CancellationToken::new();
    let state = AppState {
        relay: Arc::new(relay),
        shutdown: shutdown.clone(),
    };
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<MessagePayload>, JsonRejection>,
) -> Result<Json<MessagePayload>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        ApiError::Validation(rejection.body_text().replace('\n', " "))
    })?;

    let response = state
        .relay
        .message_with_cancel(payload, &state.shutdown)
        .await?;
    Ok(Json(response))
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Internal(Error),
}

#[derive(Serialize)]
struct ValidationBody {
    status_code: u32,
    message: String,
    data: Option<()>,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            ApiError::Validation(err.to_string())
        } else {
            ApiError::Internal(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                tracing::warn!("Rejected request: {}", message);
                let body = Json(ValidationBody {
                    status_code: VALIDATION_STATUS_CODE,
                    message,
                    data: None,
                });
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!(retryable = err.is_retryable(), "Message relay failed: {}", err);
                let body = Json(json!({ "detail": UNEXPECTED_ERROR }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}

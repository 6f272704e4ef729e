//! HTTP surface for the realtime dashboard.
//!
//! A thin axum router over an [`AmiHandle`]:
//!
//! | Route                     | Body / response                                  |
//! |---------------------------|--------------------------------------------------|
//! | `GET /health`             | `ok`                                             |
//! | `GET /realtime`           | [`RealtimeSnapshot`]                             |
//! | `POST /realtime/action`   | [`AgentActionRequest`] → [`AgentActionResponse`] |
//!
//! Errors are rendered as `{"error": "..."}` with a status derived from the
//! [`AppError`] kind.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ami::worker::AmiHandle;
use crate::models::realtime::{AgentActionRequest, AgentActionResponse, RealtimeSnapshot};
use crate::{AppError, Result};

impl AppError {
    /// HTTP status reported for this error kind.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Authentication(_) | Self::Protocol(_) => StatusCode::BAD_GATEWAY,
            Self::Action(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /realtime`.
async fn realtime(State(ami): State<AmiHandle>) -> Result<Json<RealtimeSnapshot>> {
    let snapshot = ami.snapshot().await.map_err(|err| {
        warn!(%err, "realtime snapshot failed");
        err
    })?;
    Ok(Json(snapshot))
}

/// Handler for `POST /realtime/action`.
async fn agent_action(
    State(ami): State<AmiHandle>,
    Json(request): Json<AgentActionRequest>,
) -> Result<Json<AgentActionResponse>> {
    if request.agent.trim().is_empty() {
        return Err(AppError::Action("agent must not be empty".into()));
    }

    let action = request.action;
    let success = ami
        .perform_agent_action(request.into())
        .await
        .map_err(|err| {
            warn!(%err, %action, "agent action failed");
            err
        })?;

    Ok(Json(AgentActionResponse {
        success,
        message: format!("{action} performed successfully"),
    }))
}

/// Build the router serving the realtime endpoints.
#[must_use]
pub fn router(ami: AmiHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/realtime", get(realtime))
        .route("/realtime/action", post(agent_action))
        .with_state(ami)
}

/// Serve [`router`] on `addr` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, ami: AmiHandle, ct: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Io(format!("failed to bind {addr}: {err}")))?;
    let bound = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("failed to read bound address: {err}")))?;
    info!(%bound, "http server listening");

    axum::serve(listener, router(ami))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("http server failed: {err}")))
}

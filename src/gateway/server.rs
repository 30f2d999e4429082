//! Gateway HTTP server powered by axum.
//!
//! Serves:
//! - `POST /login`                      — register or re-register a session
//! - `GET  /notifications?login=`       — list pending marketplace messages
//! - `POST /send_notification?login=`   — relay pending messages to Telegram now
//! - `GET  /users`                      — registered sessions (no secrets)
//! - `GET  /health`                     — health check

use crate::config::ServerSettings;
use crate::gateway::error::ApiError;
use crate::gateway::types::*;
use crate::services::ServiceContext;
use crate::session::PushTarget;
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

/// Shared state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub services: ServiceContext,
}

/// Build the axum router for the gateway.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/notifications", get(list_notifications))
        .route("/send_notification", post(send_notification))
        .route("/users", get(list_users))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Gateway server configuration.
pub struct GatewayParams {
    pub bind: String,
    pub port: u16,
    pub enabled: bool,
}

impl From<&ServerSettings> for GatewayParams {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            bind: settings.bind.clone(),
            port: settings.port,
            enabled: settings.enabled,
        }
    }
}

/// Start the gateway server and serve until `shutdown` fires.
pub async fn start_server(
    params: &GatewayParams,
    services: ServiceContext,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    if !params.enabled {
        tracing::info!("Gateway disabled in config");
        return Ok(());
    }

    let app = build_router(GatewayState { services });
    let listener = tokio::net::TcpListener::bind((params.bind.as_str(), params.port))
        .await
        .with_context(|| format!("Failed to bind gateway to {}:{}", params.bind, params.port))?;
    let addr = listener.local_addr()?;

    tracing::info!("Gateway starting on http://{}", addr);
    tracing::info!("   Register: POST http://{}/login", addr);
    tracing::info!("   Relay:    POST http://{}/send_notification?login=<login>", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// POST /login — register a session.
async fn login(
    State(state): State<GatewayState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    let target = PushTarget::from_json(req.chat_id.as_ref())?;
    let session = state
        .services
        .sessions
        .register(&req.login, &req.password, Some(target))
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        login: session.login,
    }))
}

/// GET /notifications — pending messages for one session, nothing pushed.
async fn list_notifications(
    State(state): State<GatewayState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let Query(query) = query?;
    let messages = state.services.relay.fetch_pending(&query.login).await?;
    Ok(Json(NotificationsResponse {
        notifications: messages.into_iter().map(Notification::from).collect(),
    }))
}

/// POST /send_notification — relay one session now.
async fn send_notification(
    State(state): State<GatewayState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    let Query(query) = query?;
    let report = state.services.relay.relay_once(&query.login).await?;
    Ok(Json(SendNotificationResponse {
        message: "Notifications sent".to_string(),
        report,
    }))
}

/// GET /users — registered sessions, for debugging.
async fn list_users(State(state): State<GatewayState>) -> Json<Vec<SessionSummary>> {
    let sessions = state.services.sessions.list_all().await;
    Json(sessions.iter().map(SessionSummary::from).collect())
}

/// GET /health — Health check.
async fn health_check(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "sessions": state.services.sessions.count().await,
    }))
}

//! REST endpoints for liveness and aggregate statistics.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::dashboard;
use crate::store::DayStore;

pub const SERVICE_NAME: &str = "productivity-bot";

/// Shared state for the status routes. Read-only access to the store.
#[derive(Clone)]
pub struct StatusState {
    pub store: Arc<dyn DayStore>,
    pub bot_username: String,
    pub started_at: DateTime<Utc>,
}

impl StatusState {
    pub fn new(store: Arc<dyn DayStore>, bot_username: impl Into<String>) -> Self {
        Self {
            store,
            bot_username: bot_username.into(),
            started_at: Utc::now(),
        }
    }
}

/// GET /
///
/// HTML dashboard with live global aggregates. Renders zeros when the
/// store cannot be read.
async fn index(State(state): State<StatusState>) -> impl IntoResponse {
    let stats = match state.store.global_summary().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "Dashboard could not load stats");
            Default::default()
        }
    };
    Html(dashboard::render(&stats, &state.bot_username, Utc::now()))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}

/// GET /api/stats
///
/// Service metadata plus global aggregates; 503 when the store is unreachable.
async fn get_stats(State(state): State<StatusState>) -> impl IntoResponse {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);

    match state.store.global_summary().await {
        Ok(stats) => Json(serde_json::json!({
            "status": "running",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "database": state.store.backend_name(),
            "uptime_secs": uptime_secs,
            "users_count": stats.users_count,
            "days_count": stats.days_count,
            "avg_score": stats.avg_score,
            "perfect_days": stats.perfect_days,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Stats endpoint could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "degraded",
                    "service": SERVICE_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                    "database": "unavailable",
                    "uptime_secs": uptime_secs,
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/stats/{user_id}
///
/// One user's aggregates, or 404 if the user has no stored days.
async fn get_user_stats(
    State(state): State<StatusState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.query_aggregate(user_id).await {
        Ok(Some(stats)) => Json(serde_json::json!({
            "user_id": user_id,
            "days_count": stats.days_count,
            "avg_score": stats.avg_score,
            "perfect_days": stats.perfect_days,
            "good_days": stats.good_days,
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No data for this user yet"})),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "User stats could not be loaded");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": "Statistics unavailable"})),
            )
                .into_response()
        }
    }
}

/// Build the status router.
pub fn status_routes(state: StatusState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/api/stats/{user_id}", get(get_user_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Endpoints that work without a session: client navigation and health.

use axum::Json;
use axum::extract::{Query, State};
use fleetcrud::ApiError;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::access::{RouteOutcome, resolve};
use crate::auth::MaybeSession;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct NavigationQuery {
    /// Client path, e.g. `/settings`.
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
}

#[utoipa::path(
    get,
    path = "/navigation",
    params(NavigationQuery),
    responses((status = axum::http::StatusCode::OK, body = RouteOutcome)),
    tag = "navigation",
    summary = "What the client should show for a path",
    description = "Works with or without a bearer token. Answers with a redirect rather than 401/403.",
)]
pub async fn navigation_handler(session: MaybeSession, Query(query): Query<NavigationQuery>) -> Json<RouteOutcome> {
    Json(resolve(&query.path, session.map(|session| session.role)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = axum::http::StatusCode::OK, body = Health),
        (status = axum::http::StatusCode::SERVICE_UNAVAILABLE, description = "Database unreachable"),
    ),
    tag = "system",
    summary = "Liveness and database reachability",
)]
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    if let Err(err) = state.db.ping().await {
        return Err(ApiError::custom(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Database unreachable",
            Some(err.to_string()),
        ));
    }
    Ok(Json(Health {
        status: "ok",
        database: "reachable",
    }))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(navigation_handler))
        .routes(routes!(health_handler))
}

use axum::Json;
use axum::extract::{Path, State};
use fleetcrud::ApiError;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::access::settings_tabs;
use crate::auth::{Role, Session};
use crate::entities::SettingSection;
use crate::settings::{self, SectionSettings, can_access};
use crate::state::AppState;

/// Only the fields that change, e.g. `{"email_enabled": false}`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct SettingsPatch(pub Value);

/// Resolve a section name the caller may open.
fn accessible_section(session: &Session, name: &str) -> Result<SettingSection, ApiError> {
    session.require_any(Role::MANAGEMENT)?;
    let section = SettingSection::parse(name)
        .ok_or_else(|| ApiError::not_found("Settings section", Some(name.to_string())))?;
    if !can_access(session.role, section) {
        return Err(ApiError::forbidden("This settings section is restricted to administrators"));
    }
    Ok(section)
}

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = axum::http::StatusCode::OK, body = [SectionSettings]),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Role not permitted"),
    ),
    tag = "settings",
    security(("bearer" = [])),
    summary = "Every settings section visible to the caller",
)]
pub async fn list_handler(State(state): State<AppState>, session: Session) -> Result<Json<Vec<SectionSettings>>, ApiError> {
    session.require_any(Role::MANAGEMENT)?;
    let sections = settings_tabs(session.role);
    Ok(Json(settings::load_sections(&state.db, &session.scope(), &sections).await?))
}

#[utoipa::path(
    get,
    path = "/settings/{section}",
    params(("section" = String, Path, description = "Section name, e.g. `notifications`")),
    responses(
        (status = axum::http::StatusCode::OK, body = SectionSettings),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Section restricted"),
        (status = axum::http::StatusCode::NOT_FOUND, description = "Unknown section"),
    ),
    tag = "settings",
    security(("bearer" = [])),
    summary = "One settings section with defaults filled in",
)]
pub async fn show_handler(
    State(state): State<AppState>,
    session: Session,
    Path(name): Path<String>,
) -> Result<Json<SectionSettings>, ApiError> {
    let section = accessible_section(&session, &name)?;
    Ok(Json(settings::load_section(&state.db, &session.scope(), section).await?))
}

#[utoipa::path(
    patch,
    path = "/settings/{section}",
    params(("section" = String, Path, description = "Section name, e.g. `notifications`")),
    request_body = SettingsPatch,
    responses(
        (status = axum::http::StatusCode::OK, body = SectionSettings),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Section restricted"),
        (status = axum::http::StatusCode::UNPROCESSABLE_ENTITY, description = "Unknown key or wrong value type"),
    ),
    tag = "settings",
    security(("bearer" = [])),
    summary = "Change some fields of a settings section",
)]
pub async fn patch_handler(
    State(state): State<AppState>,
    session: Session,
    Path(name): Path<String>,
    Json(SettingsPatch(patch)): Json<SettingsPatch>,
) -> Result<Json<SectionSettings>, ApiError> {
    let section = accessible_section(&session, &name)?;
    let saved = settings::update_section(&state.db, &session.scope(), section, &patch).await?;
    state.invalidate(session.organization_id, &["settings"]).await;
    Ok(Json(saved))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_handler))
        .routes(routes!(show_handler, patch_handler))
}

use axum::Json;
use axum::extract::State;
use fleetcrud::{ApiError, CRUDResource, Validatable};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::{Role, Session};
use crate::entities::organization::{Organization, OrganizationUpdate};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/organization",
    responses((status = axum::http::StatusCode::OK, body = Organization)),
    tag = "organization",
    security(("bearer" = [])),
    summary = "The caller's organization",
)]
pub async fn show_handler(State(state): State<AppState>, session: Session) -> Result<Json<Organization>, ApiError> {
    let scope = session.scope();
    Ok(Json(Organization::get_one(&state.db, &scope, scope.organization_id).await?))
}

#[utoipa::path(
    put,
    path = "/organization",
    request_body = OrganizationUpdate,
    responses(
        (status = axum::http::StatusCode::OK, body = Organization),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Admins only"),
        (status = axum::http::StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed"),
    ),
    tag = "organization",
    security(("bearer" = [])),
    summary = "Rename the organization or change its contact email",
)]
pub async fn update_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<OrganizationUpdate>,
) -> Result<Json<Organization>, ApiError> {
    session.require_any(Role::ADMIN)?;
    payload.validate()?;
    let scope = session.scope();
    let organization = Organization::update(&state.db, &scope, scope.organization_id, payload).await?;
    state.invalidate(scope.organization_id, &["organizations"]).await;
    tracing::info!(organization_id = %scope.organization_id, actor = %scope.actor_id, "Organization updated");
    Ok(Json(organization))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(show_handler, update_handler))
}

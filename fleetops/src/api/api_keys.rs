//! API Management: admins list, issue and revoke keys. The plaintext token appears
//! only in the issue response.

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use fleetcrud::{ApiError, CRUDOperations, FilterOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{self, ResourcePolicy};
use crate::auth::{Role, Session, issue_api_key, revoke_api_key};
use crate::entities::ApiKey;
use crate::state::AppState;

#[derive(Default)]
pub struct ApiKeyOperations;

#[async_trait]
impl CRUDOperations for ApiKeyOperations {
    type Resource = ApiKey;
}

impl ResourcePolicy for ApiKeyOperations {
    const READ: &'static [Role] = Role::ADMIN;
    const WRITE: &'static [Role] = Role::ADMIN;
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueApiKey {
    pub profile_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedApiKey {
    #[serde(flatten)]
    pub key: ApiKey,
    /// Shown once. Only its hash is stored.
    pub token: String,
}

#[utoipa::path(
    get,
    path = "/api-keys",
    params(FilterOptions),
    responses(
        (status = StatusCode::OK, body = [ApiKey]),
        (status = StatusCode::FORBIDDEN, description = "Admins only"),
    ),
    tag = "api-keys",
    security(("bearer" = [])),
    summary = "List API keys",
)]
pub async fn list_handler(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<FilterOptions>,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    crud::list::<ApiKeyOperations>(&state, &session, params).await
}

#[utoipa::path(
    post,
    path = "/api-keys",
    request_body = IssueApiKey,
    responses(
        (status = StatusCode::CREATED, body = IssuedApiKey),
        (status = StatusCode::BAD_REQUEST, description = "Profile is not active"),
        (status = StatusCode::NOT_FOUND, description = "Profile not found"),
    ),
    tag = "api-keys",
    security(("bearer" = [])),
    summary = "Issue an API key for a profile",
)]
pub async fn issue_handler(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<IssueApiKey>,
) -> Result<(StatusCode, Json<IssuedApiKey>), ApiError> {
    session.require_any(ApiKeyOperations::WRITE)?;
    let scope = session.scope();
    let (key, token) = issue_api_key(&state.db, &scope, body.profile_id, &body.name).await?;
    crud::invalidate::<ApiKeyOperations>(&state, scope.organization_id).await;
    Ok((StatusCode::CREATED, Json(IssuedApiKey { key, token })))
}

#[utoipa::path(
    post,
    path = "/api-keys/{id}/revoke",
    params(("id" = Uuid, Path, description = "API key id")),
    responses(
        (status = StatusCode::OK, body = ApiKey),
        (status = StatusCode::NOT_FOUND, description = "Key not found"),
    ),
    tag = "api-keys",
    security(("bearer" = [])),
    summary = "Revoke an API key",
)]
pub async fn revoke_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKey>, ApiError> {
    session.require_any(ApiKeyOperations::WRITE)?;
    let scope = session.scope();
    let key = revoke_api_key(&state.db, &scope, id).await?;
    crud::invalidate::<ApiKeyOperations>(&state, scope.organization_id).await;
    Ok(Json(key))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_handler, issue_handler))
        .routes(routes!(revoke_handler))
}

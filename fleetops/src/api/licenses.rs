use async_trait::async_trait;
use axum::Json;
use axum::extract::{Query, State};
use chrono::{Days, NaiveDate, Utc};
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::crud::{ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::license::{self, License, LicenseCreate, LicenseStatus, LicenseUpdate};
use crate::entities::profile::Profile;
use crate::state::AppState;

pub const DEFAULT_EXPIRY_WINDOW_DAYS: u64 = 30;
pub const MAX_EXPIRY_WINDOW_DAYS: u64 = 3650;

#[derive(Default)]
pub struct LicenseOperations;

#[async_trait]
impl CRUDOperations for LicenseOperations {
    type Resource = License;

    async fn before_create(&self, db: &DatabaseConnection, scope: &Scope, data: &mut LicenseCreate) -> Result<(), ApiError> {
        Profile::find_scoped(db, scope, data.holder_id).await?;
        Ok(())
    }
}

impl ResourcePolicy for LicenseOperations {
    const READ: &'static [Role] = Role::MANAGEMENT;
    const WRITE: &'static [Role] = Role::MANAGEMENT;
}

crud_handlers!(
    tag = "licenses",
    path = "/licenses",
    item_path = "/licenses/{id}",
    batch_path = "/licenses/batch",
    ops = LicenseOperations,
    resource = License,
    create = LicenseCreate,
    update = LicenseUpdate,
);

/// Valid licenses whose expiry date is on or before `today + days`, soonest first.
/// Licenses already past their date but still marked valid are included.
///
/// # Errors
///
/// Propagates database errors.
pub async fn expiring<C>(db: &C, scope: &Scope, today: NaiveDate, days: u64) -> Result<Vec<License>, ApiError>
where
    C: ConnectionTrait,
{
    let horizon = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    let rows = license::Entity::find()
        .filter(License::tenant_condition(scope))
        .filter(license::Column::Status.eq(LicenseStatus::Valid))
        .filter(license::Column::ExpiresOn.lte(horizon))
        .order_by_asc(license::Column::ExpiresOn)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExpiringQuery {
    /// Look-ahead window in days (default 30).
    pub days: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/licenses/expiring",
    params(ExpiringQuery),
    responses(
        (status = axum::http::StatusCode::OK, body = [License]),
        (status = axum::http::StatusCode::BAD_REQUEST, description = "Window too large"),
    ),
    tag = "licenses",
    security(("bearer" = [])),
    summary = "Valid licenses expiring soon",
)]
pub async fn expiring_handler(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<License>>, ApiError> {
    session.require_any(LicenseOperations::READ)?;
    let days = query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    if days > MAX_EXPIRY_WINDOW_DAYS {
        return Err(ApiError::bad_request(format!(
            "days must be at most {MAX_EXPIRY_WINDOW_DAYS}"
        )));
    }
    let today = Utc::now().date_naive();
    Ok(Json(expiring(&state.db, &session.scope(), today, days).await?))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router().routes(routes!(expiring_handler))
}

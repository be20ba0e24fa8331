//! Dashboard aggregates and the admin-only operational data reset.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::{Days, NaiveDate, Utc};
use fleetcrud::{ApiError, CRUDResource, Scope};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, Iterable, PaginatorTrait,
    QueryFilter, QuerySelect, TransactionTrait, TryGetable, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::licenses::DEFAULT_EXPIRY_WINDOW_DAYS;
use crate::auth::{Role, Session};
use crate::entities::{
    Bid, Inspection, Job, License, Notification, Organization, Schedule, Vehicle, bid, inspection, job, license,
    notification, schedule, vehicle,
};
use crate::entities::{BidStatus, InspectionStatus, JobStatus, LicenseStatus, VehicleStatus};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub vehicles: BTreeMap<String, u64>,
    pub jobs: BTreeMap<String, u64>,
    pub bids: BTreeMap<String, u64>,
    pub inspections: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Dashboard {
    pub counts: StatusCounts,
    /// Vehicles `in_use` over vehicles that are not retired.
    pub fleet_utilization: f64,
    /// Completed jobs over jobs that are not cancelled.
    pub job_completion_rate: f64,
    /// Passed inspections over completed inspections.
    pub inspection_pass_rate: f64,
    /// Sum of accepted bid amounts.
    pub accepted_revenue: Decimal,
    /// Valid licenses expiring within 30 days, including overdue ones.
    pub licenses_expiring_soon: u64,
}

/// Ratio rounded to four decimal places; `0.0` when there is nothing to divide by.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 10_000.0
}

/// Row count per status, with every status present (zero when absent).
async fn status_counts<E, S, C>(db: &C, condition: Condition, column: E::Column) -> Result<BTreeMap<String, u64>, ApiError>
where
    E: EntityTrait,
    S: ActiveEnum<Value = String> + TryGetable + Iterable,
    C: ConnectionTrait,
{
    let mut counts: BTreeMap<String, u64> = S::iter().map(|status| (status.to_value(), 0)).collect();
    let rows: Vec<(S, i64)> = E::find()
        .select_only()
        .column(column)
        .column_as(Expr::col(column).count(), "count")
        .filter(condition)
        .group_by(column)
        .into_tuple()
        .all(db)
        .await?;
    for (status, count) in rows {
        counts.insert(status.to_value(), u64::try_from(count).unwrap_or_default());
    }
    Ok(counts)
}

fn count_of(counts: &BTreeMap<String, u64>, status: &str) -> u64 {
    counts.get(status).copied().unwrap_or_default()
}

fn total_of(counts: &BTreeMap<String, u64>) -> u64 {
    counts.values().sum()
}

/// # Errors
///
/// Propagates database errors.
pub async fn dashboard<C>(db: &C, scope: &Scope, today: NaiveDate) -> Result<Dashboard, ApiError>
where
    C: ConnectionTrait,
{
    let vehicles =
        status_counts::<vehicle::Entity, VehicleStatus, _>(db, Vehicle::tenant_condition(scope), vehicle::Column::Status)
            .await?;
    let jobs = status_counts::<job::Entity, JobStatus, _>(db, Job::tenant_condition(scope), job::Column::Status).await?;
    let bids = status_counts::<bid::Entity, BidStatus, _>(db, Bid::tenant_condition(scope), bid::Column::Status).await?;
    let inspections = status_counts::<inspection::Entity, InspectionStatus, _>(
        db,
        Inspection::tenant_condition(scope),
        inspection::Column::Status,
    )
    .await?;

    let fleet_utilization = ratio(
        count_of(&vehicles, VehicleStatus::InUse.to_value().as_str()),
        total_of(&vehicles) - count_of(&vehicles, VehicleStatus::Retired.to_value().as_str()),
    );
    let job_completion_rate = ratio(
        count_of(&jobs, JobStatus::Completed.to_value().as_str()),
        total_of(&jobs) - count_of(&jobs, JobStatus::Cancelled.to_value().as_str()),
    );
    let inspection_pass_rate = ratio(
        count_of(&inspections, InspectionStatus::Passed.to_value().as_str()),
        total_of(&inspections) - count_of(&inspections, InspectionStatus::Scheduled.to_value().as_str()),
    );

    let accepted_revenue = bid::Entity::find()
        .select_only()
        .column(bid::Column::Amount)
        .filter(Bid::tenant_condition(scope))
        .filter(bid::Column::Status.eq(BidStatus::Accepted))
        .into_tuple::<Decimal>()
        .all(db)
        .await?
        .into_iter()
        .sum();

    let horizon = today
        .checked_add_days(Days::new(DEFAULT_EXPIRY_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let licenses_expiring_soon = license::Entity::find()
        .filter(License::tenant_condition(scope))
        .filter(license::Column::Status.eq(LicenseStatus::Valid))
        .filter(license::Column::ExpiresOn.lte(horizon))
        .count(db)
        .await?;

    Ok(Dashboard {
        counts: StatusCounts {
            vehicles,
            jobs,
            bids,
            inspections,
        },
        fleet_utilization,
        job_completion_rate,
        inspection_pass_rate,
        accepted_revenue,
        licenses_expiring_soon,
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearDataRequest {
    /// Must equal `DELETE <organization name>`.
    pub confirm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClearedData {
    pub jobs: u64,
    pub bids: u64,
    pub inspections: u64,
    pub notifications: u64,
    pub schedules: u64,
}

#[must_use]
pub fn confirmation_phrase(organization_name: &str) -> String {
    format!("DELETE {organization_name}")
}

/// Delete the organization's operational data in one transaction. Organization,
/// profiles, vehicles, licenses, settings and API keys are kept.
///
/// # Errors
///
/// `BadRequest` when `confirm` is not the confirmation phrase; nothing is deleted.
pub async fn clear_data(db: &DatabaseConnection, scope: &Scope, confirm: &str) -> Result<ClearedData, ApiError> {
    let organization = Organization::find_scoped(db, scope, scope.organization_id).await?;
    if confirm.trim() != confirmation_phrase(&organization.name) {
        return Err(ApiError::bad_request(format!(
            "Type \"{}\" to confirm",
            confirmation_phrase(&organization.name)
        )));
    }

    let txn = db.begin().await?;
    let cleared = ClearedData {
        notifications: notification::Entity::delete_many()
            .filter(Notification::tenant_condition(scope))
            .exec(&txn)
            .await?
            .rows_affected,
        schedules: schedule::Entity::delete_many()
            .filter(Schedule::tenant_condition(scope))
            .exec(&txn)
            .await?
            .rows_affected,
        bids: bid::Entity::delete_many()
            .filter(Bid::tenant_condition(scope))
            .exec(&txn)
            .await?
            .rows_affected,
        inspections: inspection::Entity::delete_many()
            .filter(Inspection::tenant_condition(scope))
            .exec(&txn)
            .await?
            .rows_affected,
        jobs: job::Entity::delete_many()
            .filter(Job::tenant_condition(scope))
            .exec(&txn)
            .await?
            .rows_affected,
    };
    txn.commit().await?;

    tracing::warn!(
        organization_id = %scope.organization_id,
        actor = %scope.actor_id,
        ?cleared,
        "Operational data cleared"
    );
    Ok(cleared)
}

#[utoipa::path(
    get,
    path = "/analytics/dashboard",
    responses(
        (status = axum::http::StatusCode::OK, body = Dashboard),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Role not permitted"),
    ),
    tag = "analytics",
    security(("bearer" = [])),
    summary = "Fleet dashboard aggregates",
)]
pub async fn dashboard_handler(State(state): State<AppState>, session: Session) -> Result<Json<Dashboard>, ApiError> {
    session.require_any(Role::STAFF)?;
    let today = Utc::now().date_naive();
    Ok(Json(dashboard(&state.db, &session.scope(), today).await?))
}

#[utoipa::path(
    post,
    path = "/analytics/clear-data",
    request_body = ClearDataRequest,
    responses(
        (status = axum::http::StatusCode::OK, body = ClearedData),
        (status = axum::http::StatusCode::BAD_REQUEST, description = "Confirmation phrase mismatch"),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Admins only"),
    ),
    tag = "analytics",
    security(("bearer" = [])),
    summary = "Delete all jobs, bids, inspections, notifications and schedules",
)]
pub async fn clear_data_handler(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ClearDataRequest>,
) -> Result<Json<ClearedData>, ApiError> {
    session.require_any(Role::ADMIN)?;
    let cleared = clear_data(&state.db, &session.scope(), &body.confirm).await?;
    state.cache.invalidate_organization(session.organization_id).await;
    Ok(Json(cleared))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(dashboard_handler))
        .routes(routes!(clear_data_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert!((ratio(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
        assert!((ratio(2, 3) - 0.6667).abs() < 1e-9);
    }

    #[test]
    fn test_confirmation_phrase() {
        assert_eq!(confirmation_phrase("Acme Haulage"), "DELETE Acme Haulage");
    }
}

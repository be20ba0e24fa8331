use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{self, ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::bid::{self, Bid, BidStatus, BidWithDriver};
use crate::entities::job::{self, Job, JobCreate, JobStatus, JobUpdate};
use crate::entities::profile::{self, Profile};
use crate::entities::vehicle::Vehicle;
use crate::state::AppState;

/// # Errors
///
/// `Conflict` unless `next` is `current` or one of its legal next states.
pub fn ensure_transition(current: JobStatus, next: JobStatus) -> Result<(), ApiError> {
    if current == next || current.can_transition_to(next) {
        Ok(())
    } else {
        Err(ApiError::conflict(format!(
            "A job cannot move from {} to {}",
            current.to_value(),
            next.to_value()
        )))
    }
}

/// Reject every pending bid on a job. Returns how many were rejected.
async fn reject_pending_bids<C>(db: &C, scope: &Scope, job_id: Uuid) -> Result<u64, ApiError>
where
    C: ConnectionTrait,
{
    let result = bid::Entity::update_many()
        .col_expr(bid::Column::Status, Expr::value(BidStatus::Rejected))
        .col_expr(bid::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Bid::tenant_condition(scope))
        .filter(bid::Column::JobId.eq(job_id))
        .filter(bid::Column::Status.eq(BidStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[derive(Default)]
pub struct JobOperations;

#[async_trait]
impl CRUDOperations for JobOperations {
    type Resource = Job;

    async fn before_create(&self, db: &DatabaseConnection, scope: &Scope, data: &mut JobCreate) -> Result<(), ApiError> {
        if let Some(vehicle_id) = data.vehicle_id {
            Vehicle::find_scoped(db, scope, vehicle_id).await?;
        }
        data.created_by = Some(scope.actor_id);
        Ok(())
    }

    async fn before_update(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid, data: &JobUpdate) -> Result<(), ApiError> {
        let current = Job::find_scoped(db, scope, id).await?;
        if let Some(next) = data.status {
            ensure_transition(current.status, next)?;
        }
        if let Some(Some(driver_id)) = data.assigned_driver_id {
            Profile::find_scoped(db, scope, driver_id).await?;
        }
        if let Some(Some(vehicle_id)) = data.vehicle_id {
            Vehicle::find_scoped(db, scope, vehicle_id).await?;
        }
        Ok(())
    }

    async fn perform_update(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        id: Uuid,
        mut data: JobUpdate,
    ) -> Result<Job, ApiError> {
        let txn = db.begin().await?;
        let previous = Job::find_scoped(&txn, scope, id).await?.status;
        if data.status == Some(JobStatus::Open) && previous != JobStatus::Open {
            data.assigned_driver_id = Some(None);
        }
        let job = Job::update(&txn, scope, id, data).await?;
        if job.status == JobStatus::Cancelled && previous != JobStatus::Cancelled {
            reject_pending_bids(&txn, scope, id).await?;
        }
        txn.commit().await?;
        Ok(job)
    }
}

impl ResourcePolicy for JobOperations {
    const WRITE: &'static [Role] = Role::STAFF;
    const INVALIDATES: &'static [&'static str] = &["bids", "schedules"];
}

crud_handlers!(
    tag = "jobs",
    path = "/jobs",
    item_path = "/jobs/{id}",
    batch_path = "/jobs/batch",
    ops = JobOperations,
    resource = Job,
    create = JobCreate,
    update = JobUpdate,
);

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: JobStatus,
}

/// Move a job to `next`. Staff may make any legal transition; the assigned driver may
/// only start or complete their own job. Reopening clears the assigned driver and
/// cancelling rejects the pending bids, so run this inside a transaction.
///
/// # Errors
///
/// `NotFound`, `Forbidden` for drivers acting outside their own job, `Conflict` for an
/// illegal transition.
pub async fn change_status<C>(db: &C, session: &Session, id: Uuid, next: JobStatus) -> Result<Job, ApiError>
where
    C: ConnectionTrait,
{
    let scope = session.scope();
    let model = Job::find_scoped(db, &scope, id).await?;
    if !session.is_staff() {
        let own_job = model.assigned_driver_id == Some(session.profile_id);
        if !own_job || !matches!(next, JobStatus::InProgress | JobStatus::Completed) {
            return Err(ApiError::forbidden("Drivers can only start or complete their own jobs"));
        }
    }
    ensure_transition(model.status, next)?;

    let previous = model.status;
    let mut active: job::ActiveModel = model.into_active_model();
    active.status = Set(next);
    if next == JobStatus::Open && previous != JobStatus::Open {
        active.assigned_driver_id = Set(None);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    if next == JobStatus::Cancelled && previous != JobStatus::Cancelled {
        reject_pending_bids(db, &scope, id).await?;
    }
    tracing::info!(
        job_id = %id,
        from = %previous.to_value(),
        to = %next.to_value(),
        actor = %session.profile_id,
        "Job status changed"
    );
    Ok(updated.into())
}

#[utoipa::path(
    post,
    path = "/jobs/{id}/status",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = StatusChange,
    responses(
        (status = axum::http::StatusCode::OK, body = Job),
        (status = axum::http::StatusCode::FORBIDDEN, description = "Not permitted for this caller"),
        (status = axum::http::StatusCode::CONFLICT, description = "Illegal transition"),
    ),
    tag = "jobs",
    security(("bearer" = [])),
    summary = "Change a job's status",
)]
pub async fn change_status_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Job>, ApiError> {
    let txn = state.db.begin().await?;
    let job = change_status(&txn, &session, id, body.status).await?;
    txn.commit().await?;
    crud::invalidate::<JobOperations>(&state, session.organization_id).await;
    Ok(Json(job))
}

/// Bids on a job with the bidder's name, cheapest first. Drivers see only their own.
///
/// # Errors
///
/// `NotFound` when the job is outside the organization.
pub async fn job_bids<C>(db: &C, session: &Session, job_id: Uuid) -> Result<Vec<BidWithDriver>, ApiError>
where
    C: ConnectionTrait,
{
    let scope = session.scope();
    Job::find_scoped(db, &scope, job_id).await?;

    let mut query = bid::Entity::find()
        .filter(Bid::tenant_condition(&scope))
        .filter(bid::Column::JobId.eq(job_id));
    if !session.is_staff() {
        query = query.filter(bid::Column::DriverId.eq(session.profile_id));
    }
    let rows = query
        .find_also_related(profile::Entity)
        .order_by_asc(bid::Column::Amount)
        .order_by_asc(bid::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(bid, driver)| BidWithDriver {
            bid: bid.into(),
            driver_name: driver.map(|driver| driver.full_name),
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/jobs/{id}/bids",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = axum::http::StatusCode::OK, body = [BidWithDriver]),
        (status = axum::http::StatusCode::NOT_FOUND, description = "Job not found"),
    ),
    tag = "jobs",
    security(("bearer" = [])),
    summary = "Bids on a job",
)]
pub async fn job_bids_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BidWithDriver>>, ApiError> {
    Ok(Json(job_bids(&state.db, &session, id).await?))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router()
        .routes(routes!(change_status_handler))
        .routes(routes!(job_bids_handler))
}

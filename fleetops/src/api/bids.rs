//! Bids: drivers offer a price for an open job, staff accept or reject.
//!
//! Accepting a bid is the one multi-row mutation in the service and runs in a single
//! transaction: the bid is accepted, its pending siblings are rejected, the job is
//! assigned to the bidder and the bidder is notified.

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope, Validatable};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, TransactionTrait, sea_query::Expr,
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{self, ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::bid::{self, Bid, BidCreate, BidStatus, BidUpdate};
use crate::entities::job::{self, Job, JobStatus};
use crate::entities::notification::{Notification, NotificationCreate, NotificationKind};
use crate::entities::profile::{Profile, ProfileStatus};
use crate::state::AppState;

#[derive(Default)]
pub struct BidOperations;

#[async_trait]
impl CRUDOperations for BidOperations {
    type Resource = Bid;

    async fn before_update(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid, _data: &BidUpdate) -> Result<(), ApiError> {
        let current = Bid::find_scoped(db, scope, id).await?;
        ensure_pending(current.status)
    }
}

impl ResourcePolicy for BidOperations {
    const WRITE: &'static [Role] = Role::STAFF;
    const CREATE: &'static [Role] = Role::ALL;
}

crud_handlers!(
    tag = "bids",
    path = "/bids",
    item_path = "/bids/{id}",
    batch_path = "/bids/batch",
    ops = BidOperations,
    resource = Bid,
    update = BidUpdate,
);

fn ensure_pending(status: BidStatus) -> Result<(), ApiError> {
    if status == BidStatus::Pending {
        Ok(())
    } else {
        Err(ApiError::conflict("Only pending bids can be changed"))
    }
}

/// Place a bid. Drivers always bid as themselves; staff may bid on behalf of a driver.
///
/// # Errors
///
/// `ValidationFailed` before any query, `NotFound` for a job or driver outside the
/// organization, `Conflict` when the job is not open or the driver already has a
/// pending bid on it.
pub async fn place_bid<C>(db: &C, session: &Session, mut payload: BidCreate) -> Result<Bid, ApiError>
where
    C: ConnectionTrait,
{
    payload.validate()?;
    let scope = session.scope();

    let driver_id = if session.is_staff() {
        payload.driver_id.unwrap_or(session.profile_id)
    } else {
        session.profile_id
    };
    let driver = Profile::find_scoped(db, &scope, driver_id).await?;
    if driver.status != ProfileStatus::Active {
        return Err(ApiError::bad_request("Only active profiles can bid"));
    }

    let job = Job::find_scoped(db, &scope, payload.job_id).await?;
    if job.status != JobStatus::Open {
        return Err(ApiError::conflict("Bids can only be placed on open jobs"));
    }

    let existing = bid::Entity::find()
        .filter(Bid::tenant_condition(&scope))
        .filter(bid::Column::JobId.eq(job.id))
        .filter(bid::Column::DriverId.eq(driver_id))
        .filter(bid::Column::Status.eq(BidStatus::Pending))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("This driver already has a pending bid on the job"));
    }

    payload.driver_id = Some(driver_id);
    let created = Bid::create(db, &scope, payload).await?;
    tracing::info!(bid_id = %created.id, job_id = %created.job_id, driver_id = %driver_id, "Bid placed");
    Ok(created)
}

/// Accept a pending bid on an open job, in one transaction.
///
/// # Errors
///
/// `NotFound` for a bid outside the organization, `Conflict` when the bid is not
/// pending or the job is no longer open. Nothing is written on error.
pub async fn accept_bid(db: &DatabaseConnection, scope: &Scope, bid_id: Uuid) -> Result<Bid, ApiError> {
    let txn = db.begin().await?;

    let model = Bid::find_scoped(&txn, scope, bid_id).await?;
    ensure_pending(model.status)?;
    let job = Job::find_scoped(&txn, scope, model.job_id).await?;
    if job.status != JobStatus::Open {
        return Err(ApiError::conflict("The job is no longer open"));
    }

    let now = Utc::now();
    let mut accepted: bid::ActiveModel = model.into_active_model();
    accepted.status = Set(BidStatus::Accepted);
    accepted.updated_at = Set(now);
    let accepted = accepted.update(&txn).await?;

    let rejected = bid::Entity::update_many()
        .col_expr(bid::Column::Status, Expr::value(BidStatus::Rejected))
        .col_expr(bid::Column::UpdatedAt, Expr::value(now))
        .filter(Bid::tenant_condition(scope))
        .filter(bid::Column::JobId.eq(accepted.job_id))
        .filter(bid::Column::Status.eq(BidStatus::Pending))
        .filter(bid::Column::Id.ne(accepted.id))
        .exec(&txn)
        .await?
        .rows_affected;

    let job_title = job.title.clone();
    let mut assigned: job::ActiveModel = job.into_active_model();
    assigned.status = Set(JobStatus::Assigned);
    assigned.assigned_driver_id = Set(Some(accepted.driver_id));
    assigned.updated_at = Set(now);
    assigned.update(&txn).await?;

    let notice = NotificationCreate {
        recipient_id: accepted.driver_id,
        title: "Bid accepted".to_string(),
        message: format!("Your bid of {} on \"{job_title}\" was accepted.", accepted.amount),
        kind: NotificationKind::Job,
    };
    Notification::create(&txn, scope, notice).await?;

    txn.commit().await?;
    tracing::info!(
        bid_id = %accepted.id,
        job_id = %accepted.job_id,
        rejected,
        actor = %scope.actor_id,
        "Bid accepted"
    );
    Ok(accepted.into())
}

async fn set_status<C>(db: &C, model: bid::Model, status: BidStatus) -> Result<Bid, ApiError>
where
    C: ConnectionTrait,
{
    let mut active: bid::ActiveModel = model.into_active_model();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

/// # Errors
///
/// `NotFound`, or `Conflict` when the bid is not pending.
pub async fn reject_bid<C>(db: &C, scope: &Scope, bid_id: Uuid) -> Result<Bid, ApiError>
where
    C: ConnectionTrait,
{
    let model = Bid::find_scoped(db, scope, bid_id).await?;
    ensure_pending(model.status)?;
    set_status(db, model, BidStatus::Rejected).await
}

/// Only the bidding driver may withdraw, and only while the bid is pending.
///
/// # Errors
///
/// `NotFound`, `Forbidden` for anyone but the bidder, `Conflict` when not pending.
pub async fn withdraw_bid<C>(db: &C, session: &Session, bid_id: Uuid) -> Result<Bid, ApiError>
where
    C: ConnectionTrait,
{
    let model = Bid::find_scoped(db, &session.scope(), bid_id).await?;
    if model.driver_id != session.profile_id {
        return Err(ApiError::forbidden("Only the bidding driver can withdraw a bid"));
    }
    ensure_pending(model.status)?;
    set_status(db, model, BidStatus::Withdrawn).await
}

#[utoipa::path(
    post,
    path = "/bids",
    request_body = BidCreate,
    responses(
        (status = StatusCode::CREATED, body = Bid),
        (status = StatusCode::CONFLICT, description = "Job not open or a pending bid already exists"),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed"),
    ),
    tag = "bids",
    security(("bearer" = [])),
    summary = "Place a bid on an open job",
)]
pub async fn place_bid_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<BidCreate>,
) -> Result<(StatusCode, Json<Bid>), ApiError> {
    session.require_any(BidOperations::CREATE)?;
    let created = place_bid(&state.db, &session, payload).await?;
    crud::invalidate::<BidOperations>(&state, session.organization_id).await;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/bids/{id}/accept",
    params(("id" = Uuid, Path, description = "Bid id")),
    responses(
        (status = StatusCode::OK, body = Bid),
        (status = StatusCode::CONFLICT, description = "Bid not pending or job not open"),
    ),
    tag = "bids",
    security(("bearer" = [])),
    summary = "Accept a bid and assign its job",
)]
pub async fn accept_bid_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, ApiError> {
    session.require_any(Role::STAFF)?;
    let accepted = accept_bid(&state.db, &session.scope(), id).await?;
    state
        .invalidate(session.organization_id, &["bids", "jobs", "notifications"])
        .await;
    Ok(Json(accepted))
}

#[utoipa::path(
    post,
    path = "/bids/{id}/reject",
    params(("id" = Uuid, Path, description = "Bid id")),
    responses(
        (status = StatusCode::OK, body = Bid),
        (status = StatusCode::CONFLICT, description = "Bid not pending"),
    ),
    tag = "bids",
    security(("bearer" = [])),
    summary = "Reject a pending bid",
)]
pub async fn reject_bid_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, ApiError> {
    session.require_any(Role::STAFF)?;
    let rejected = reject_bid(&state.db, &session.scope(), id).await?;
    crud::invalidate::<BidOperations>(&state, session.organization_id).await;
    Ok(Json(rejected))
}

#[utoipa::path(
    post,
    path = "/bids/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Bid id")),
    responses(
        (status = StatusCode::OK, body = Bid),
        (status = StatusCode::FORBIDDEN, description = "Not the bidder"),
        (status = StatusCode::CONFLICT, description = "Bid not pending"),
    ),
    tag = "bids",
    security(("bearer" = [])),
    summary = "Withdraw your own pending bid",
)]
pub async fn withdraw_bid_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, ApiError> {
    let withdrawn = withdraw_bid(&state.db, &session, id).await?;
    crud::invalidate::<BidOperations>(&state, session.organization_id).await;
    Ok(Json(withdrawn))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router()
        .routes(routes!(place_bid_handler))
        .routes(routes!(accept_bid_handler))
        .routes(routes!(reject_bid_handler))
        .routes(routes!(withdraw_bid_handler))
}

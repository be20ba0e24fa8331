use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope, ValidationError};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::api::crud::{ResourcePolicy, crud_handlers};
use crate::auth::Role;
use crate::entities::job::Job;
use crate::entities::profile::Profile;
use crate::entities::schedule::{self, Schedule, ScheduleCreate, ScheduleStatus, ScheduleUpdate, overlaps};
use crate::entities::vehicle::Vehicle;
use crate::state::AppState;

/// Reject a window that overlaps another non-cancelled entry of the same driver.
async fn ensure_driver_free(
    db: &DatabaseConnection,
    scope: &Scope,
    driver_id: Uuid,
    window: (DateTime<Utc>, DateTime<Utc>),
    exclude: Option<Uuid>,
) -> Result<(), ApiError> {
    let mut query = schedule::Entity::find()
        .filter(Schedule::tenant_condition(scope))
        .filter(schedule::Column::DriverId.eq(driver_id))
        .filter(schedule::Column::Status.ne(ScheduleStatus::Cancelled))
        .filter(schedule::Column::EndsAt.gt(window.0));
    if let Some(id) = exclude {
        query = query.filter(schedule::Column::Id.ne(id));
    }
    let candidates = query.all(db).await?;
    if let Some(clash) = candidates
        .iter()
        .find(|entry| overlaps(window, (entry.starts_at, entry.ends_at)))
    {
        return Err(ApiError::conflict(format!(
            "The driver is already booked for \"{}\" during this time",
            clash.title
        )));
    }
    Ok(())
}

async fn ensure_references(
    db: &DatabaseConnection,
    scope: &Scope,
    driver_id: Option<Uuid>,
    vehicle_id: Option<Uuid>,
    job_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(id) = driver_id {
        Profile::find_scoped(db, scope, id).await?;
    }
    if let Some(id) = vehicle_id {
        Vehicle::find_scoped(db, scope, id).await?;
    }
    if let Some(id) = job_id {
        Job::find_scoped(db, scope, id).await?;
    }
    Ok(())
}

#[derive(Default)]
pub struct ScheduleOperations;

#[async_trait]
impl CRUDOperations for ScheduleOperations {
    type Resource = Schedule;

    async fn before_create(&self, db: &DatabaseConnection, scope: &Scope, data: &mut ScheduleCreate) -> Result<(), ApiError> {
        ensure_references(db, scope, data.driver_id, data.vehicle_id, data.job_id).await?;
        let cancelled = data.status == Some(ScheduleStatus::Cancelled);
        if let (Some(driver_id), false) = (data.driver_id, cancelled) {
            ensure_driver_free(db, scope, driver_id, (data.starts_at, data.ends_at), None).await?;
        }
        Ok(())
    }

    async fn before_update(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid, data: &ScheduleUpdate) -> Result<(), ApiError> {
        let current = Schedule::find_scoped(db, scope, id).await?;
        ensure_references(
            db,
            scope,
            data.driver_id.flatten(),
            data.vehicle_id.flatten(),
            data.job_id.flatten(),
        )
        .await?;

        let starts_at = data.starts_at.unwrap_or(current.starts_at);
        let ends_at = data.ends_at.unwrap_or(current.ends_at);
        if ends_at <= starts_at {
            return Err(ApiError::validation_failed(ValidationError::new(
                "ends_at",
                "Must be after starts_at",
            )));
        }

        let driver_id = data.driver_id.unwrap_or(current.driver_id);
        let status = data.status.unwrap_or(current.status);
        if let (Some(driver_id), false) = (driver_id, status == ScheduleStatus::Cancelled) {
            ensure_driver_free(db, scope, driver_id, (starts_at, ends_at), Some(id)).await?;
        }
        Ok(())
    }
}

impl ResourcePolicy for ScheduleOperations {
    const WRITE: &'static [Role] = Role::STAFF;
}

crud_handlers!(
    tag = "schedules",
    path = "/schedules",
    item_path = "/schedules/{id}",
    batch_path = "/schedules/batch",
    ops = ScheduleOperations,
    resource = Schedule,
    create = ScheduleCreate,
    update = ScheduleUpdate,
);

pub fn router() -> OpenApiRouter<AppState> {
    crud_router()
}

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, IntoActiveModel};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{self, ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::profile::{Profile, ProfileStatus};
use crate::entities::vehicle::{self, Vehicle, VehicleCreate, VehicleUpdate};
use crate::state::AppState;

#[derive(Default)]
pub struct VehicleOperations;

#[async_trait]
impl CRUDOperations for VehicleOperations {
    type Resource = Vehicle;
}

impl ResourcePolicy for VehicleOperations {
    const WRITE: &'static [Role] = Role::MANAGEMENT;
    const INVALIDATES: &'static [&'static str] = &["inspections", "schedules", "jobs"];
}

crud_handlers!(
    tag = "vehicles",
    path = "/vehicles",
    item_path = "/vehicles/{id}",
    batch_path = "/vehicles/batch",
    ops = VehicleOperations,
    resource = Vehicle,
    create = VehicleCreate,
    update = VehicleUpdate,
);

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDriver {
    /// `null` unassigns the current driver.
    pub driver_id: Option<Uuid>,
}

/// Set or clear the vehicle's driver. The driver must be an active profile of the
/// organization with role `driver`.
///
/// # Errors
///
/// `NotFound` for a vehicle or profile outside the organization, `BadRequest` when the
/// profile is not an active driver.
pub async fn assign_driver<C>(db: &C, scope: &Scope, vehicle_id: Uuid, driver_id: Option<Uuid>) -> Result<Vehicle, ApiError>
where
    C: ConnectionTrait,
{
    let model = Vehicle::find_scoped(db, scope, vehicle_id).await?;
    if let Some(driver_id) = driver_id {
        let driver = Profile::find_scoped(db, scope, driver_id).await?;
        if driver.role != Role::Driver || driver.status != ProfileStatus::Active {
            return Err(ApiError::bad_request("Only active drivers can be assigned to a vehicle"));
        }
    }
    let mut active: vehicle::ActiveModel = model.into_active_model();
    active.driver_id = Set(driver_id);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

#[utoipa::path(
    post,
    path = "/vehicles/{id}/assign-driver",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = AssignDriver,
    responses(
        (status = axum::http::StatusCode::OK, body = Vehicle),
        (status = axum::http::StatusCode::BAD_REQUEST, description = "Profile is not an active driver"),
        (status = axum::http::StatusCode::NOT_FOUND, description = "Vehicle or driver not found"),
    ),
    tag = "vehicles",
    security(("bearer" = [])),
    summary = "Assign or unassign a vehicle's driver",
)]
pub async fn assign_driver_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignDriver>,
) -> Result<Json<Vehicle>, ApiError> {
    session.require_any(VehicleOperations::WRITE)?;
    let scope = session.scope();
    let vehicle = assign_driver(&state.db, &scope, id, body.driver_id).await?;
    crud::invalidate::<VehicleOperations>(&state, scope.organization_id).await;
    tracing::info!(vehicle_id = %id, driver_id = ?body.driver_id, "Vehicle driver assigned");
    Ok(Json(vehicle))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router().routes(routes!(assign_driver_handler))
}

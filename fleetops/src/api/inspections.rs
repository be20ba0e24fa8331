use async_trait::async_trait;
use chrono::Utc;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, IntoActiveModel, TransactionTrait,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::api::crud::{ResourcePolicy, crud_handlers};
use crate::auth::Role;
use crate::entities::inspection::{Inspection, InspectionCreate, InspectionStatus, InspectionUpdate};
use crate::entities::profile::Profile;
use crate::entities::vehicle::{self, Vehicle, VehicleStatus};
use crate::state::AppState;

/// Take a vehicle off the road after a failed inspection. Retired vehicles stay retired.
///
/// # Errors
///
/// `NotFound` for a vehicle outside the organization.
pub async fn send_to_maintenance<C>(db: &C, scope: &Scope, vehicle_id: Uuid) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    let model = Vehicle::find_scoped(db, scope, vehicle_id).await?;
    if matches!(model.status, VehicleStatus::Maintenance | VehicleStatus::Retired) {
        return Ok(());
    }
    let mut active: vehicle::ActiveModel = model.into_active_model();
    active.status = Set(VehicleStatus::Maintenance);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    tracing::info!(vehicle_id = %vehicle_id, "Vehicle sent to maintenance after failed inspection");
    Ok(())
}

#[derive(Default)]
pub struct InspectionOperations;

#[async_trait]
impl CRUDOperations for InspectionOperations {
    type Resource = Inspection;

    async fn before_create(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        data: &mut InspectionCreate,
    ) -> Result<(), ApiError> {
        Vehicle::find_scoped(db, scope, data.vehicle_id).await?;
        let inspector_id = *data.inspector_id.get_or_insert(scope.actor_id);
        Profile::find_scoped(db, scope, inspector_id).await?;
        Ok(())
    }

    async fn perform_create(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        data: InspectionCreate,
    ) -> Result<Inspection, ApiError> {
        let txn = db.begin().await?;
        let inspection = Inspection::create(&txn, scope, data).await?;
        if inspection.status == InspectionStatus::Failed {
            send_to_maintenance(&txn, scope, inspection.vehicle_id).await?;
        }
        txn.commit().await?;
        Ok(inspection)
    }

    async fn perform_update(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        id: Uuid,
        data: InspectionUpdate,
    ) -> Result<Inspection, ApiError> {
        let txn = db.begin().await?;
        let inspection = Inspection::update(&txn, scope, id, data).await?;
        if inspection.status == InspectionStatus::Failed {
            send_to_maintenance(&txn, scope, inspection.vehicle_id).await?;
        }
        txn.commit().await?;
        Ok(inspection)
    }
}

impl ResourcePolicy for InspectionOperations {
    const WRITE: &'static [Role] = Role::STAFF;
    const CREATE: &'static [Role] = Role::ALL;
    const INVALIDATES: &'static [&'static str] = &["vehicles"];
}

crud_handlers!(
    tag = "inspections",
    path = "/inspections",
    item_path = "/inspections/{id}",
    batch_path = "/inspections/batch",
    ops = InspectionOperations,
    resource = Inspection,
    create = InspectionCreate,
    update = InspectionUpdate,
);

pub fn router() -> OpenApiRouter<AppState> {
    crud_router()
}

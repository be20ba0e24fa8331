use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_optional, validate_range};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum InspectionType {
    #[sea_orm(string_value = "pre_trip")]
    PreTrip,
    #[sea_orm(string_value = "post_trip")]
    PostTrip,
    #[sea_orm(string_value = "periodic")]
    Periodic,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "passed")]
    Passed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "needs_attention")]
    NeedsAttention,
}

impl InspectionStatus {
    /// Every status except `scheduled` records a finished inspection.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inspections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub vehicle_id: Uuid,
    pub inspector_id: Uuid,
    pub inspection_type: InspectionType,
    pub odometer_km: Option<i64>,
    pub defect_count: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub status: InspectionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id",
        on_delete = "Cascade"
    )]
    Vehicle,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::InspectorId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Inspector,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Inspection {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub vehicle_id: Uuid,
    pub inspector_id: Uuid,
    pub inspection_type: InspectionType,
    pub odometer_km: Option<i64>,
    pub defect_count: i32,
    pub notes: Option<String>,
    pub status: InspectionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Inspection {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            vehicle_id: model.vehicle_id,
            inspector_id: model.inspector_id,
            inspection_type: model.inspection_type,
            odometer_km: model.odometer_km,
            defect_count: model.defect_count,
            notes: model.notes,
            status: model.status,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// `inspector_id` defaults to the caller.
#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct InspectionCreate {
    pub vehicle_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub inspection_type: InspectionType,
    pub odometer_km: Option<i64>,
    #[serde(default)]
    pub defect_count: i32,
    pub notes: Option<String>,
    pub status: Option<InspectionStatus>,
}

impl From<InspectionCreate> for ActiveModel {
    fn from(create: InspectionCreate) -> Self {
        let now = Utc::now();
        let status = create.status.unwrap_or(InspectionStatus::Scheduled);
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            vehicle_id: Set(create.vehicle_id),
            inspector_id: Set(create.inspector_id.unwrap_or_default()),
            inspection_type: Set(create.inspection_type),
            odometer_km: Set(create.odometer_km),
            defect_count: Set(create.defect_count),
            notes: Set(create.notes),
            status: Set(status),
            completed_at: Set(status.is_completed().then_some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for InspectionCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_range("defect_count", self.defect_count, Some(0), None));
        errors.check(validate_optional(self.odometer_km, |km| {
            validate_range("odometer_km", km, Some(0), None)
        }));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct InspectionUpdate {
    pub inspection_type: Option<InspectionType>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    pub odometer_km: Option<Option<i64>>,
    pub defect_count: Option<i32>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    pub status: Option<InspectionStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for InspectionUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        let now = Utc::now();
        if let Some(inspection_type) = self.inspection_type {
            model.inspection_type = Set(inspection_type);
        }
        if let Some(odometer_km) = self.odometer_km {
            model.odometer_km = Set(odometer_km);
        }
        if let Some(defect_count) = self.defect_count {
            model.defect_count = Set(defect_count);
        }
        if let Some(notes) = self.notes {
            model.notes = Set(notes);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
            model.completed_at = Set(status.is_completed().then_some(now));
        }
        model.updated_at = Set(now);
        Ok(model)
    }
}

impl Validatable for InspectionUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.defect_count, |count| {
            validate_range("defect_count", count, Some(0), None)
        }));
        errors.check(validate_optional(self.odometer_km.flatten(), |km| {
            validate_range("odometer_km", km, Some(0), None)
        }));
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Inspection {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = InspectionCreate;
    type UpdateModel = InspectionUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Inspection";
    const RESOURCE_NAME_PLURAL: &'static str = "inspections";
    const TABLE_NAME: &'static str = "inspections";

    fn default_index_column() -> Column {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("inspection_type", Column::InspectionType),
            ("defect_count", Column::DefectCount),
            ("status", Column::Status),
            ("completed_at", Column::CompletedAt),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("vehicle_id", Column::VehicleId),
            ("inspector_id", Column::InspectorId),
            ("inspection_type", Column::InspectionType),
            ("defect_count", Column::DefectCount),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        matches!(field_name, "inspection_type" | "status")
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![("notes", Column::Notes)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_statuses() {
        assert!(!InspectionStatus::Scheduled.is_completed());
        assert!(InspectionStatus::Passed.is_completed());
        assert!(InspectionStatus::Failed.is_completed());
        assert!(InspectionStatus::NeedsAttention.is_completed());
    }

    #[test]
    fn test_finished_inspection_is_stamped_on_create() {
        let create = InspectionCreate {
            vehicle_id: Uuid::new_v4(),
            inspector_id: None,
            inspection_type: InspectionType::PreTrip,
            odometer_km: None,
            defect_count: 0,
            notes: None,
            status: Some(InspectionStatus::Passed),
        };
        let active: ActiveModel = create.into();
        assert!(matches!(active.completed_at, sea_orm::ActiveValue::Set(Some(_))));
    }

    #[test]
    fn test_status_update_stamps_completion() {
        let update = InspectionUpdate {
            status: Some(InspectionStatus::Failed),
            ..Default::default()
        };
        let merged = update.merge_into_activemodel(ActiveModel::new()).unwrap();
        assert!(matches!(merged.completed_at, sea_orm::ActiveValue::Set(Some(_))));

        let update = InspectionUpdate {
            status: Some(InspectionStatus::Scheduled),
            ..Default::default()
        };
        let merged = update.merge_into_activemodel(ActiveModel::new()).unwrap();
        assert_eq!(merged.completed_at, Set(None));
    }

    #[test]
    fn test_negative_defects_rejected() {
        let update = InspectionUpdate {
            defect_count: Some(-1),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap_err().fields(), vec!["defect_count"]);
    }
}

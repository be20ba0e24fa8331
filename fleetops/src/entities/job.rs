use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_length, validate_optional, validate_range, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl JobStatus {
    /// Legal next states. `completed` and `cancelled` are terminal.
    #[must_use]
    pub const fn next_states(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::InProgress, Self::Open, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_states().contains(&next)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub budget: Option<Decimal>,
    pub assigned_driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub status: JobStatus,
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
        belongs_to = "super::profile::Entity",
        from = "Column::AssignedDriverId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedDriver,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::CreatedBy",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id",
        on_delete = "SetNull"
    )]
    Vehicle,
    #[sea_orm(has_many = "super::bid::Entity")]
    Bids,
}

impl Related<super::bid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub budget: Option<Decimal>,
    pub assigned_driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Job {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            title: model.title,
            description: model.description,
            pickup_location: model.pickup_location,
            dropoff_location: model.dropoff_location,
            scheduled_for: model.scheduled_for,
            budget: model.budget,
            assigned_driver_id: model.assigned_driver_id,
            vehicle_id: model.vehicle_id,
            created_by: model.created_by,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// New jobs always start `open`; `created_by` is filled from the session.
#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct JobCreate {
    pub title: String,
    pub description: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub budget: Option<Decimal>,
    pub vehicle_id: Option<Uuid>,
    #[serde(skip)]
    pub created_by: Option<Uuid>,
}

impl From<JobCreate> for ActiveModel {
    fn from(create: JobCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            title: Set(create.title.trim().to_string()),
            description: Set(create.description),
            pickup_location: Set(create.pickup_location.trim().to_string()),
            dropoff_location: Set(create.dropoff_location.trim().to_string()),
            scheduled_for: Set(create.scheduled_for),
            budget: Set(create.budget),
            assigned_driver_id: Set(None),
            vehicle_id: Set(create.vehicle_id),
            created_by: Set(create.created_by),
            status: Set(JobStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for JobCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("title", &self.title));
        errors.check(validate_length("title", &self.title, None, Some(200)));
        errors.check(validate_required("pickup_location", &self.pickup_location));
        errors.check(validate_required("dropoff_location", &self.dropoff_location));
        errors.check(validate_optional(self.budget, |budget| {
            validate_range("budget", budget, Some(Decimal::ZERO), None)
        }));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct JobUpdate {
    pub title: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub scheduled_for: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Decimal>)]
    pub budget: Option<Option<Decimal>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_driver_id: Option<Option<Uuid>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub vehicle_id: Option<Option<Uuid>>,
    pub status: Option<JobStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for JobUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(title) = self.title {
            model.title = Set(title.trim().to_string());
        }
        if let Some(description) = self.description {
            model.description = Set(description);
        }
        if let Some(pickup_location) = self.pickup_location {
            model.pickup_location = Set(pickup_location.trim().to_string());
        }
        if let Some(dropoff_location) = self.dropoff_location {
            model.dropoff_location = Set(dropoff_location.trim().to_string());
        }
        if let Some(scheduled_for) = self.scheduled_for {
            model.scheduled_for = Set(scheduled_for);
        }
        if let Some(budget) = self.budget {
            model.budget = Set(budget);
        }
        if let Some(assigned_driver_id) = self.assigned_driver_id {
            model.assigned_driver_id = Set(assigned_driver_id);
        }
        if let Some(vehicle_id) = self.vehicle_id {
            model.vehicle_id = Set(vehicle_id);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for JobUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.title.as_deref(), |v| validate_required("title", v)));
        errors.check(validate_optional(self.pickup_location.as_deref(), |v| {
            validate_required("pickup_location", v)
        }));
        errors.check(validate_optional(self.dropoff_location.as_deref(), |v| {
            validate_required("dropoff_location", v)
        }));
        errors.check(validate_optional(self.budget.flatten(), |budget| {
            validate_range("budget", budget, Some(Decimal::ZERO), None)
        }));
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Job {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = JobCreate;
    type UpdateModel = JobUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Job";
    const RESOURCE_NAME_PLURAL: &'static str = "jobs";
    const TABLE_NAME: &'static str = "jobs";
    const RESOURCE_DESCRIPTION: &'static str = "Transport jobs open for bidding and assignment";

    fn default_index_column() -> Column {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("scheduled_for", Column::ScheduledFor),
            ("budget", Column::Budget),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
            ("updated_at", Column::UpdatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("pickup_location", Column::PickupLocation),
            ("dropoff_location", Column::DropoffLocation),
            ("assigned_driver_id", Column::AssignedDriverId),
            ("vehicle_id", Column::VehicleId),
            ("created_by", Column::CreatedBy),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "status"
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["title", "pickup_location", "dropoff_location"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("title", Column::Title),
            ("description", Column::Description),
            ("pickup_location", Column::PickupLocation),
            ("dropoff_location", Column::DropoffLocation),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(JobStatus::Open.can_transition_to(JobStatus::Assigned));
        assert!(JobStatus::Open.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Assigned.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::Assigned.can_transition_to(JobStatus::Open));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!JobStatus::Open.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Open.can_transition_to(JobStatus::InProgress));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Open));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Open));
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::Assigned));
    }

    #[test]
    fn test_negative_budget_rejected() {
        let create = JobCreate {
            title: "Pallet run".to_string(),
            description: None,
            pickup_location: "Depot".to_string(),
            dropoff_location: "Harbour".to_string(),
            scheduled_for: None,
            budget: Some(Decimal::new(-100, 0)),
            vehicle_id: None,
            created_by: None,
        };
        assert_eq!(create.validate().unwrap_err().fields(), vec!["budget"]);
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_length, validate_optional, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationError, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ScheduleStatus,
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
        from = "Column::DriverId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Driver,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id",
        on_delete = "SetNull"
    )]
    Vehicle,
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id",
        on_delete = "SetNull"
    )]
    Job,
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Schedule {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            title: model.title,
            driver_id: model.driver_id,
            vehicle_id: model.vehicle_id,
            job_id: model.job_id,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct ScheduleCreate {
    pub title: String,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: Option<ScheduleStatus>,
}

impl From<ScheduleCreate> for ActiveModel {
    fn from(create: ScheduleCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            title: Set(create.title.trim().to_string()),
            driver_id: Set(create.driver_id),
            vehicle_id: Set(create.vehicle_id),
            job_id: Set(create.job_id),
            starts_at: Set(create.starts_at),
            ends_at: Set(create.ends_at),
            status: Set(create.status.unwrap_or(ScheduleStatus::Planned)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ValidationError> {
    if ends_at <= starts_at {
        return Err(ValidationError::new("ends_at", "Must be after starts_at"));
    }
    Ok(())
}

/// Half-open intervals: an entry ending at 10:00 does not overlap one starting at 10:00.
#[must_use]
pub fn overlaps(
    a: (DateTime<Utc>, DateTime<Utc>),
    b: (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    a.0 < b.1 && b.0 < a.1
}

impl Validatable for ScheduleCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("title", &self.title));
        errors.check(validate_length("title", &self.title, None, Some(200)));
        errors.check(validate_window(self.starts_at, self.ends_at));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct ScheduleUpdate {
    pub title: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub driver_id: Option<Option<Uuid>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub vehicle_id: Option<Option<Uuid>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub job_id: Option<Option<Uuid>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<ScheduleStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for ScheduleUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(title) = self.title {
            model.title = Set(title.trim().to_string());
        }
        if let Some(driver_id) = self.driver_id {
            model.driver_id = Set(driver_id);
        }
        if let Some(vehicle_id) = self.vehicle_id {
            model.vehicle_id = Set(vehicle_id);
        }
        if let Some(job_id) = self.job_id {
            model.job_id = Set(job_id);
        }
        if let Some(starts_at) = self.starts_at {
            model.starts_at = Set(starts_at);
        }
        if let Some(ends_at) = self.ends_at {
            model.ends_at = Set(ends_at);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for ScheduleUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.title.as_deref(), |v| validate_required("title", v)));
        if let (Some(starts_at), Some(ends_at)) = (self.starts_at, self.ends_at) {
            errors.check(validate_window(starts_at, ends_at));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Schedule {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ScheduleCreate;
    type UpdateModel = ScheduleUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Schedule";
    const RESOURCE_NAME_PLURAL: &'static str = "schedules";
    const TABLE_NAME: &'static str = "schedules";

    fn default_index_column() -> Column {
        Column::StartsAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("starts_at", Column::StartsAt),
            ("ends_at", Column::EndsAt),
            ("status", Column::Status),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("driver_id", Column::DriverId),
            ("vehicle_id", Column::VehicleId),
            ("job_id", Column::JobId),
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
        vec!["title"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![("title", Column::Title)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_end_must_follow_start() {
        let create = ScheduleCreate {
            title: "Morning run".to_string(),
            driver_id: None,
            vehicle_id: None,
            job_id: None,
            starts_at: at(10),
            ends_at: at(10),
            status: None,
        };
        assert_eq!(create.validate().unwrap_err().fields(), vec!["ends_at"]);
    }

    #[test]
    fn test_overlap_is_half_open() {
        assert!(overlaps((at(8), at(10)), (at(9), at(11))));
        assert!(overlaps((at(8), at(12)), (at(9), at(10))));
        assert!(!overlaps((at(8), at(10)), (at(10), at(11))));
        assert!(!overlaps((at(12), at(13)), (at(8), at(10))));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use fleetcrud::validation::validators::{validate_length, validate_optional, validate_range, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "in_use")]
    InUse,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "out_of_service")]
    OutOfService,
    #[sea_orm(string_value = "retired")]
    Retired,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub registration: String,
    pub make: String,
    #[sea_orm(column_name = "model")]
    pub vehicle_model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub odometer_km: i64,
    pub driver_id: Option<Uuid>,
    pub status: VehicleStatus,
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
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub registration: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub odometer_km: i64,
    pub driver_id: Option<Uuid>,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Vehicle {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            registration: model.registration,
            make: model.make,
            model: model.vehicle_model,
            year: model.year,
            vin: model.vin,
            odometer_km: model.odometer_km,
            driver_id: model.driver_id,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct VehicleCreate {
    pub registration: String,
    pub make: String,
    pub model: String,
    #[serde(default = "current_year")]
    pub year: i32,
    pub vin: Option<String>,
    #[serde(default)]
    pub odometer_km: i64,
    pub status: Option<VehicleStatus>,
}

fn current_year() -> i32 {
    Utc::now().year()
}

impl From<VehicleCreate> for ActiveModel {
    fn from(create: VehicleCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            registration: Set(create.registration.trim().to_uppercase()),
            make: Set(create.make.trim().to_string()),
            vehicle_model: Set(create.model.trim().to_string()),
            year: Set(create.year),
            vin: Set(create.vin),
            odometer_km: Set(create.odometer_km),
            driver_id: Set(None),
            status: Set(create.status.unwrap_or(VehicleStatus::Active)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for VehicleCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("registration", &self.registration));
        errors.check(validate_length("registration", self.registration.trim(), None, Some(32)));
        errors.check(validate_required("make", &self.make));
        errors.check(validate_required("model", &self.model));
        errors.check(validate_range("year", self.year, Some(MIN_YEAR), Some(MAX_YEAR)));
        errors.check(validate_range("odometer_km", self.odometer_km, Some(0), None));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct VehicleUpdate {
    pub registration: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub vin: Option<Option<String>>,
    pub odometer_km: Option<i64>,
    pub status: Option<VehicleStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for VehicleUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(registration) = self.registration {
            model.registration = Set(registration.trim().to_uppercase());
        }
        if let Some(make) = self.make {
            model.make = Set(make.trim().to_string());
        }
        if let Some(vehicle_model) = self.model {
            model.vehicle_model = Set(vehicle_model.trim().to_string());
        }
        if let Some(year) = self.year {
            model.year = Set(year);
        }
        if let Some(vin) = self.vin {
            model.vin = Set(vin);
        }
        if let Some(odometer_km) = self.odometer_km {
            model.odometer_km = Set(odometer_km);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for VehicleUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.registration.as_deref(), |v| {
            validate_required("registration", v)
        }));
        errors.check(validate_optional(self.make.as_deref(), |v| validate_required("make", v)));
        errors.check(validate_optional(self.model.as_deref(), |v| validate_required("model", v)));
        errors.check(validate_optional(self.year, |year| {
            validate_range("year", year, Some(MIN_YEAR), Some(MAX_YEAR))
        }));
        errors.check(validate_optional(self.odometer_km, |km| {
            validate_range("odometer_km", km, Some(0), None)
        }));
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Vehicle {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = VehicleCreate;
    type UpdateModel = VehicleUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Vehicle";
    const RESOURCE_NAME_PLURAL: &'static str = "vehicles";
    const TABLE_NAME: &'static str = "vehicles";
    const RESOURCE_DESCRIPTION: &'static str = "Fleet vehicles and their assigned drivers";

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("registration", Column::Registration),
            ("make", Column::Make),
            ("model", Column::VehicleModel),
            ("year", Column::Year),
            ("odometer_km", Column::OdometerKm),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
            ("updated_at", Column::UpdatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("registration", Column::Registration),
            ("make", Column::Make),
            ("model", Column::VehicleModel),
            ("year", Column::Year),
            ("vin", Column::Vin),
            ("odometer_km", Column::OdometerKm),
            ("driver_id", Column::DriverId),
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
        vec!["registration", "make", "model"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("registration", Column::Registration),
            ("make", Column::Make),
            ("model", Column::VehicleModel),
            ("vin", Column::Vin),
        ]
    }
}

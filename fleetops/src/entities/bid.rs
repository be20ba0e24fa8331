use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::validate_length;
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationError, ValidationErrors};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub driver_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub status: BidStatus,
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
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id",
        on_delete = "Cascade"
    )]
    Job,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::DriverId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Driver,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bid {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub driver_id: Uuid,
    pub amount: Decimal,
    pub note: Option<String>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Bid {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            job_id: model.job_id,
            driver_id: model.driver_id,
            amount: model.amount,
            note: model.note,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A bid joined with the bidder's profile, as shown on a job's bid list.
#[derive(ToSchema, Serialize, Clone, Debug, PartialEq)]
pub struct BidWithDriver {
    #[serde(flatten)]
    pub bid: Bid,
    pub driver_name: Option<String>,
}

/// Drivers may omit `driver_id`; it is always forced to the caller for them.
#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct BidCreate {
    pub job_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub amount: Decimal,
    pub note: Option<String>,
}

impl From<BidCreate> for ActiveModel {
    fn from(create: BidCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            job_id: Set(create.job_id),
            driver_id: Set(create.driver_id.unwrap_or_default()),
            amount: Set(create.amount),
            note: Set(create.note),
            status: Set(BidStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount", "Must be greater than 0"));
    }
    Ok(())
}

impl Validatable for BidCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_amount(self.amount));
        if let Some(note) = &self.note {
            errors.check(validate_length("note", note, None, Some(2000)));
        }
        errors.result()
    }
}

/// Bids change state only through accept, reject and withdraw.
#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct BidUpdate {
    pub amount: Option<Decimal>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for BidUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(amount) = self.amount {
            model.amount = Set(amount);
        }
        if let Some(note) = self.note {
            model.note = Set(note);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for BidUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(amount) = self.amount {
            errors.check(validate_amount(amount));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Bid {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = BidCreate;
    type UpdateModel = BidUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Bid";
    const RESOURCE_NAME_PLURAL: &'static str = "bids";
    const TABLE_NAME: &'static str = "bids";

    fn default_index_column() -> Column {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("amount", Column::Amount),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("job_id", Column::JobId),
            ("driver_id", Column::DriverId),
            ("amount", Column::Amount),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "status"
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![("note", Column::Note)]
    }
}

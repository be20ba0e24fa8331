use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_email, validate_length, validate_optional, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "dispatcher")]
    Dispatcher,
    #[sea_orm(string_value = "driver")]
    Driver,
}

impl Role {
    pub const ALL: &'static [Self] = &[Self::Admin, Self::Manager, Self::Dispatcher, Self::Driver];
    /// Office roles: everyone but drivers.
    pub const STAFF: &'static [Self] = &[Self::Admin, Self::Manager, Self::Dispatcher];
    pub const MANAGEMENT: &'static [Self] = &[Self::Admin, Self::Manager];
    pub const ADMIN: &'static [Self] = &[Self::Admin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Dispatcher => "dispatcher",
            Self::Driver => "driver",
        }
    }

    #[must_use]
    pub fn is_staff(self) -> bool {
        Self::STAFF.contains(&self)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "on_leave")]
    OnLeave,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: ProfileStatus,
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
    #[sea_orm(has_many = "super::license::Entity")]
    Licenses,
    #[sea_orm(has_many = "super::bid::Entity")]
    Bids,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::license::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Licenses.def()
    }
}

impl Related<super::bid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A user of the organization. Drivers are profiles with role `driver`.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Profile {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            role: model.role,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct ProfileCreate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: Option<ProfileStatus>,
}

impl From<ProfileCreate> for ActiveModel {
    fn from(create: ProfileCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            full_name: Set(create.full_name.trim().to_string()),
            email: Set(create.email.trim().to_lowercase()),
            phone: Set(create.phone),
            role: Set(create.role),
            status: Set(create.status.unwrap_or(ProfileStatus::Active)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for ProfileCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("full_name", &self.full_name));
        errors.check(validate_length("full_name", &self.full_name, None, Some(200)));
        errors.check(validate_email("email", self.email.trim()));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
    pub status: Option<ProfileStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for ProfileUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(full_name) = self.full_name {
            model.full_name = Set(full_name.trim().to_string());
        }
        if let Some(email) = self.email {
            model.email = Set(email.trim().to_lowercase());
        }
        if let Some(phone) = self.phone {
            model.phone = Set(phone);
        }
        if let Some(role) = self.role {
            model.role = Set(role);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for ProfileUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.full_name.as_deref(), |name| {
            validate_required("full_name", name)
        }));
        errors.check(validate_optional(self.email.as_deref(), |email| {
            validate_email("email", email.trim())
        }));
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Profile {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ProfileCreate;
    type UpdateModel = ProfileUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Profile";
    const RESOURCE_NAME_PLURAL: &'static str = "profiles";
    const TABLE_NAME: &'static str = "profiles";

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("full_name", Column::FullName),
            ("email", Column::Email),
            ("role", Column::Role),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("full_name", Column::FullName),
            ("email", Column::Email),
            ("role", Column::Role),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        matches!(field_name, "role" | "status")
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["full_name"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("full_name", Column::FullName),
            ("email", Column::Email),
            ("phone", Column::Phone),
        ]
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_length, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    #[sea_orm(unique)]
    pub key_hash: String,
    pub status: ApiKeyStatus,
    pub last_used_at: Option<DateTime<Utc>>,
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
        from = "Column::ProfileId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Key metadata. The hash never leaves the database layer.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiKey {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub status: ApiKeyStatus,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for ApiKey {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            profile_id: model.profile_id,
            name: model.name,
            key_prefix: model.key_prefix,
            status: model.status,
            last_used_at: model.last_used_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request body for issuing a key. The token itself is generated server-side.
#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct ApiKeyCreate {
    pub profile_id: Uuid,
    pub name: String,
    #[serde(skip)]
    pub key_prefix: String,
    #[serde(skip)]
    pub key_hash: String,
}

impl From<ApiKeyCreate> for ActiveModel {
    fn from(create: ApiKeyCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            profile_id: Set(create.profile_id),
            name: Set(create.name.trim().to_string()),
            key_prefix: Set(create.key_prefix),
            key_hash: Set(create.key_hash),
            status: Set(ApiKeyStatus::Active),
            last_used_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for ApiKeyCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("name", &self.name));
        errors.check(validate_length("name", &self.name, None, Some(100)));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct ApiKeyUpdate {
    pub name: Option<String>,
    pub status: Option<ApiKeyStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for ApiKeyUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for ApiKeyUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validate_required("name", name));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for ApiKey {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ApiKeyCreate;
    type UpdateModel = ApiKeyUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "API key";
    const RESOURCE_NAME_PLURAL: &'static str = "api_keys";
    const TABLE_NAME: &'static str = "api_keys";

    fn default_index_column() -> Column {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("status", Column::Status),
            ("last_used_at", Column::LastUsedAt),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("profile_id", Column::ProfileId),
            ("name", Column::Name),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "status"
    }
}

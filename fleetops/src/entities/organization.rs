use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::validation::validators::{validate_email, validate_length, validate_optional, validate_required};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::profile::Entity")]
    Profiles,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Organization {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            contact_email: model.contact_email,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct OrganizationCreate {
    pub name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl From<OrganizationCreate> for ActiveModel {
    fn from(create: OrganizationCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            contact_email: Set(create.contact_email),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

impl Validatable for OrganizationCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("name", &self.name));
        errors.check(validate_length("name", &self.name, None, Some(200)));
        errors.check(validate_optional(self.contact_email.as_deref(), |email| {
            validate_email("contact_email", email)
        }));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct OrganizationUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub contact_email: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for OrganizationUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(contact_email) = self.contact_email {
            model.contact_email = Set(contact_email);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for OrganizationUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.name.as_deref(), |name| validate_required("name", name)));
        errors.check(validate_optional(self.contact_email.as_ref().and_then(Option::as_deref), |email| {
            validate_email("contact_email", email)
        }));
        errors.result()
    }
}

/// The organization is its own tenant: `TENANT_COLUMN` is the id.
#[async_trait]
impl CRUDResource for Organization {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = OrganizationCreate;
    type UpdateModel = OrganizationUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "Organization";
    const RESOURCE_NAME_PLURAL: &'static str = "organizations";
    const TABLE_NAME: &'static str = "organizations";
}

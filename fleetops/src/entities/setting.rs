use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetcrud::{CRUDResource, MergeIntoActiveModel, Validatable, ValidationError, ValidationErrors};
use sea_orm::{ActiveValue::Set, entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum SettingSection {
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "security")]
    Security,
    #[sea_orm(string_value = "notifications")]
    Notifications,
    #[sea_orm(string_value = "routes")]
    Routes,
    #[sea_orm(string_value = "vehicles")]
    Vehicles,
    #[sea_orm(string_value = "drivers")]
    Drivers,
    #[sea_orm(string_value = "system")]
    System,
    #[sea_orm(string_value = "integrations")]
    Integrations,
    #[sea_orm(string_value = "theme")]
    Theme,
}

impl SettingSection {
    /// Tab order on the settings page.
    pub const ALL: [Self; 9] = [
        Self::General,
        Self::Security,
        Self::Notifications,
        Self::Routes,
        Self::Vehicles,
        Self::Drivers,
        Self::System,
        Self::Integrations,
        Self::Theme,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Security => "security",
            Self::Notifications => "notifications",
            Self::Routes => "routes",
            Self::Vehicles => "vehicles",
            Self::Drivers => "drivers",
            Self::System => "system",
            Self::Integrations => "integrations",
            Self::Theme => "theme",
        }
    }

    #[must_use]
    pub const fn is_admin_only(self) -> bool {
        matches!(self, Self::Security | Self::System | Self::Integrations)
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.as_str() == name)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub section: SettingSection,
    /// JSON object text.
    #[sea_orm(column_type = "Text")]
    pub values: String,
    pub updated_by: Option<Uuid>,
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
        from = "Column::UpdatedBy",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Editor,
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Setting {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub section: SettingSection,
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored text that is not a JSON object reads as an empty object.
#[must_use]
pub fn parse_values(text: &str) -> Map<String, Value> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl From<Model> for Setting {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            section: model.section,
            values: parse_values(&model.values),
            updated_by: model.updated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct SettingCreate {
    pub section: SettingSection,
    #[schema(value_type = Object)]
    pub values: Value,
    #[serde(skip)]
    pub updated_by: Option<Uuid>,
}

impl From<SettingCreate> for ActiveModel {
    fn from(create: SettingCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            section: Set(create.section),
            values: Set(create.values.to_string()),
            updated_by: Set(create.updated_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_object(values: &Value) -> Result<(), ValidationError> {
    if values.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("values", "Must be a JSON object"))
    }
}

impl Validatable for SettingCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_object(&self.values));
        errors.result()
    }
}

/// Replaces the stored object. Merging over defaults happens before this is built.
#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct SettingUpdate {
    #[schema(value_type = Object)]
    pub values: Value,
    #[serde(skip)]
    pub updated_by: Option<Uuid>,
}

impl MergeIntoActiveModel<ActiveModel> for SettingUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        model.values = Set(self.values.to_string());
        model.updated_by = Set(self.updated_by);
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for SettingUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_object(&self.values));
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for Setting {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = SettingCreate;
    type UpdateModel = SettingUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Setting";
    const RESOURCE_NAME_PLURAL: &'static str = "settings";
    const TABLE_NAME: &'static str = "settings";

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![("id", Column::Id), ("section", Column::Section)]
    }

    fn is_enum_field(field_name: &str) -> bool {
        field_name == "section"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_names_round_trip() {
        for section in SettingSection::ALL {
            assert_eq!(SettingSection::parse(section.as_str()), Some(section));
        }
        assert_eq!(SettingSection::parse("billing"), None);
    }

    #[test]
    fn test_admin_only_sections() {
        let admin_only: Vec<_> = SettingSection::ALL
            .into_iter()
            .filter(|section| section.is_admin_only())
            .collect();
        assert_eq!(
            admin_only,
            vec![SettingSection::Security, SettingSection::System, SettingSection::Integrations]
        );
    }

    #[test]
    fn test_corrupt_values_read_as_empty() {
        assert!(parse_values("not json").is_empty());
        assert!(parse_values("[1, 2]").is_empty());
        assert_eq!(parse_values(r#"{"a": 1}"#).len(), 1);
    }

    #[test]
    fn test_values_must_be_object() {
        let create = SettingCreate {
            section: SettingSection::Theme,
            values: serde_json::json!([1]),
            updated_by: None,
        };
        assert_eq!(create.validate().unwrap_err().fields(), vec!["values"]);
    }
}

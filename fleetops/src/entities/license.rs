use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
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
pub enum LicenseStatus {
    #[sea_orm(string_value = "valid")]
    Valid,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub holder_id: Uuid,
    pub license_number: String,
    pub license_class: String,
    pub issuing_authority: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: NaiveDate,
    pub status: LicenseStatus,
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
        from = "Column::HolderId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Holder,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct License {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub holder_id: Uuid,
    pub license_number: String,
    pub license_class: String,
    pub issuing_authority: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: NaiveDate,
    pub status: LicenseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for License {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            holder_id: model.holder_id,
            license_number: model.license_number,
            license_class: model.license_class,
            issuing_authority: model.issuing_authority,
            issued_on: model.issued_on,
            expires_on: model.expires_on,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct LicenseCreate {
    pub holder_id: Uuid,
    pub license_number: String,
    pub license_class: String,
    pub issuing_authority: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: NaiveDate,
    pub status: Option<LicenseStatus>,
}

impl From<LicenseCreate> for ActiveModel {
    fn from(create: LicenseCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            holder_id: Set(create.holder_id),
            license_number: Set(create.license_number.trim().to_uppercase()),
            license_class: Set(create.license_class.trim().to_string()),
            issuing_authority: Set(create.issuing_authority),
            issued_on: Set(create.issued_on),
            expires_on: Set(create.expires_on),
            status: Set(create.status.unwrap_or(LicenseStatus::Valid)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_dates(issued_on: Option<NaiveDate>, expires_on: NaiveDate) -> Result<(), ValidationError> {
    match issued_on {
        Some(issued_on) if issued_on > expires_on => Err(ValidationError::new(
            "expires_on",
            "Must not be before the issue date",
        )),
        _ => Ok(()),
    }
}

impl Validatable for LicenseCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("license_number", &self.license_number));
        errors.check(validate_length("license_number", self.license_number.trim(), None, Some(64)));
        errors.check(validate_required("license_class", &self.license_class));
        errors.check(validate_dates(self.issued_on, self.expires_on));
        errors.result()
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct LicenseUpdate {
    pub license_number: Option<String>,
    pub license_class: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub issuing_authority: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub issued_on: Option<Option<NaiveDate>>,
    pub expires_on: Option<NaiveDate>,
    pub status: Option<LicenseStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for LicenseUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(license_number) = self.license_number {
            model.license_number = Set(license_number.trim().to_uppercase());
        }
        if let Some(license_class) = self.license_class {
            model.license_class = Set(license_class.trim().to_string());
        }
        if let Some(issuing_authority) = self.issuing_authority {
            model.issuing_authority = Set(issuing_authority);
        }
        if let Some(issued_on) = self.issued_on {
            model.issued_on = Set(issued_on);
        }
        if let Some(expires_on) = self.expires_on {
            model.expires_on = Set(expires_on);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());
        Ok(model)
    }
}

impl Validatable for LicenseUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_optional(self.license_number.as_deref(), |v| {
            validate_required("license_number", v)
        }));
        errors.check(validate_optional(self.license_class.as_deref(), |v| {
            validate_required("license_class", v)
        }));
        if let (Some(Some(issued_on)), Some(expires_on)) = (self.issued_on, self.expires_on) {
            errors.check(validate_dates(Some(issued_on), expires_on));
        }
        errors.result()
    }
}

#[async_trait]
impl CRUDResource for License {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = LicenseCreate;
    type UpdateModel = LicenseUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "License";
    const RESOURCE_NAME_PLURAL: &'static str = "licenses";
    const TABLE_NAME: &'static str = "licenses";
    const RESOURCE_DESCRIPTION: &'static str = "Driver licenses and their expiry";

    fn default_index_column() -> Column {
        Column::ExpiresOn
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("license_number", Column::LicenseNumber),
            ("license_class", Column::LicenseClass),
            ("expires_on", Column::ExpiresOn),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("holder_id", Column::HolderId),
            ("license_number", Column::LicenseNumber),
            ("license_class", Column::LicenseClass),
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
        vec!["license_number"]
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("license_number", Column::LicenseNumber),
            ("license_class", Column::LicenseClass),
            ("issuing_authority", Column::IssuingAuthority),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_before_issue_rejected() {
        let create = LicenseCreate {
            holder_id: Uuid::new_v4(),
            license_number: "d123".to_string(),
            license_class: "C".to_string(),
            issuing_authority: None,
            issued_on: Some(date(2024, 6, 1)),
            expires_on: date(2024, 1, 1),
            status: None,
        };
        assert_eq!(create.validate().unwrap_err().fields(), vec!["expires_on"]);
    }

    #[test]
    fn test_license_number_is_uppercased() {
        let create = LicenseCreate {
            holder_id: Uuid::new_v4(),
            license_number: " d123 ".to_string(),
            license_class: "C".to_string(),
            issuing_authority: None,
            issued_on: None,
            expires_on: date(2030, 1, 1),
            status: None,
        };
        let active: ActiveModel = create.into();
        assert_eq!(active.license_number, Set("D123".to_string()));
        assert_eq!(active.status, Set(LicenseStatus::Valid));
    }
}

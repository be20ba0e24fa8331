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
pub enum NotificationKind {
    #[sea_orm(string_value = "info")]
    Info,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "alert")]
    Alert,
    #[sea_orm(string_value = "job")]
    Job,
    #[sea_orm(string_value = "inspection")]
    Inspection,
    #[sea_orm(string_value = "license")]
    License,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[sea_orm(string_value = "unread")]
    Unread,
    #[sea_orm(string_value = "read")]
    Read,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub read_at: Option<DateTime<Utc>>,
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
        from = "Column::RecipientId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Notification {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            recipient_id: model.recipient_id,
            title: model.title,
            message: model.message,
            kind: model.kind,
            status: model.status,
            read_at: model.read_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct NotificationCreate {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default = "default_kind")]
    pub kind: NotificationKind,
}

const fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

impl From<NotificationCreate> for ActiveModel {
    fn from(create: NotificationCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            organization_id: Set(Uuid::nil()),
            recipient_id: Set(create.recipient_id),
            title: Set(create.title.trim().to_string()),
            message: Set(create.message),
            kind: Set(create.kind),
            status: Set(NotificationStatus::Unread),
            read_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

fn validate_content(errors: &mut ValidationErrors, title: &str, message: &str) {
    errors.check(validate_required("title", title));
    errors.check(validate_length("title", title, None, Some(200)));
    errors.check(validate_required("message", message));
}

impl Validatable for NotificationCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_content(&mut errors, &self.title, &self.message);
        errors.result()
    }
}

/// Sends the same notification to every active profile, optionally only those with `role`.
#[derive(ToSchema, Deserialize, Clone, Debug)]
pub struct NotificationBroadcast {
    pub role: Option<super::profile::Role>,
    pub title: String,
    pub message: String,
    #[serde(default = "default_kind")]
    pub kind: NotificationKind,
}

impl Validatable for NotificationBroadcast {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_content(&mut errors, &self.title, &self.message);
        errors.result()
    }
}

/// Recipients can only change the status of their notifications.
#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
pub struct NotificationUpdate {
    pub status: Option<NotificationStatus>,
}

impl MergeIntoActiveModel<ActiveModel> for NotificationUpdate {
    fn merge_into_activemodel(self, mut model: ActiveModel) -> Result<ActiveModel, DbErr> {
        let now = Utc::now();
        if let Some(status) = self.status {
            model.status = Set(status);
            model.read_at = Set(match status {
                NotificationStatus::Unread => None,
                NotificationStatus::Read | NotificationStatus::Archived => Some(now),
            });
        }
        model.updated_at = Set(now);
        Ok(model)
    }
}

impl Validatable for NotificationUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[async_trait]
impl CRUDResource for Notification {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = NotificationCreate;
    type UpdateModel = NotificationUpdate;
    type ListModel = Self;

    const ID_COLUMN: Column = Column::Id;
    const TENANT_COLUMN: Column = Column::OrganizationId;
    const RESOURCE_NAME_SINGULAR: &'static str = "Notification";
    const RESOURCE_NAME_PLURAL: &'static str = "notifications";
    const TABLE_NAME: &'static str = "notifications";

    fn default_index_column() -> Column {
        Column::CreatedAt
    }

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("kind", Column::Kind),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("kind", Column::Kind),
            ("status", Column::Status),
        ]
    }

    fn status_field() -> Option<&'static str> {
        Some("status")
    }

    fn is_enum_field(field_name: &str) -> bool {
        matches!(field_name, "kind" | "status")
    }

    fn fulltext_searchable_columns() -> Vec<(&'static str, Column)> {
        vec![("title", Column::Title), ("message", Column::Message)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults_to_info() {
        let create: NotificationCreate = serde_json::from_value(serde_json::json!({
            "recipient_id": Uuid::nil(),
            "title": "Heads up",
            "message": "Depot closes early",
        }))
        .unwrap();
        assert_eq!(create.kind, NotificationKind::Info);
    }

    #[test]
    fn test_empty_message_rejected() {
        let broadcast = NotificationBroadcast {
            role: None,
            title: "Heads up".to_string(),
            message: " ".to_string(),
            kind: NotificationKind::Alert,
        };
        assert_eq!(broadcast.validate().unwrap_err().fields(), vec!["message"]);
    }

    #[test]
    fn test_marking_read_sets_read_at() {
        let update = NotificationUpdate {
            status: Some(NotificationStatus::Read),
        };
        let merged = update.merge_into_activemodel(ActiveModel::new()).unwrap();
        assert!(matches!(merged.read_at, sea_orm::ActiveValue::Set(Some(_))));
    }
}

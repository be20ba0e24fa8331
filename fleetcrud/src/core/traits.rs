use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, FromQueryResult, IntoActiveModel, ModelTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Value,
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::Scope;
use crate::validation::Validatable;

pub trait MergeIntoActiveModel<ActiveModelType> {
    /// Merge this update model into an existing active model
    ///
    /// # Errors
    ///
    /// Returns a `DbErr` if the merge operation fails due to data conversion issues.
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// Binds an API struct to its sea-orm entity.
///
/// All default operations are organization-scoped: reads and deletes filter on
/// `TENANT_COLUMN`, and inserts overwrite it with the scope's organization, so a
/// row that belongs to another organization is indistinguishable from a missing one.
#[async_trait]
pub trait CRUDResource: Sized + Serialize + Send + Sync + 'static {
    type EntityType: EntityTrait<Model = Self::ModelType, Column = Self::ColumnType> + Send + Sync;
    type ModelType: ModelTrait<Entity = Self::EntityType>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModelType>
        + Into<Self>
        + Send
        + Sync;
    type ColumnType: ColumnTrait + Copy + std::fmt::Debug + Send + Sync;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType> + ActiveModelBehavior + Send + Sync;
    type CreateModel: Into<Self::ActiveModelType> + Validatable + DeserializeOwned + Send + Sync;
    type UpdateModel: MergeIntoActiveModel<Self::ActiveModelType> + Validatable + DeserializeOwned + Send + Sync;
    type ListModel: From<Self> + Serialize + Send + Sync;

    const ID_COLUMN: Self::ColumnType;
    const TENANT_COLUMN: Self::ColumnType;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;
    const TABLE_NAME: &'static str;
    const RESOURCE_DESCRIPTION: &'static str = "";

    /// Condition restricting a query to the scope's organization.
    #[must_use]
    fn tenant_condition(scope: &Scope) -> Condition {
        Condition::all().add(Self::TENANT_COLUMN.eq(scope.organization_id))
    }

    /// Fetch the raw model for `id` within the scope.
    ///
    /// # Errors
    ///
    /// Returns `DbErr::RecordNotFound` when no row with that id exists in the organization.
    async fn find_scoped<C>(db: &C, scope: &Scope, id: Uuid) -> Result<Self::ModelType, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::EntityType::find()
            .filter(Self::ID_COLUMN.eq(id))
            .filter(Self::tenant_condition(scope))
            .one(db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("{} not found", Self::RESOURCE_NAME_SINGULAR))
            })
    }

    async fn get_all<C>(
        db: &C,
        scope: &Scope,
        condition: &Condition,
        order_column: Self::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::ListModel>, DbErr>
    where
        C: ConnectionTrait,
    {
        let models = Self::EntityType::find()
            .filter(Self::tenant_condition(scope))
            .filter(condition.clone())
            .order_by(order_column, order_direction)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| {
                let resource: Self = model.into();
                Self::ListModel::from(resource)
            })
            .collect())
    }

    async fn get_one<C>(db: &C, scope: &Scope, id: Uuid) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let model = Self::find_scoped(db, scope, id).await?;
        Ok(model.into())
    }

    async fn create<C>(db: &C, scope: &Scope, create_model: Self::CreateModel) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model: Self::ActiveModelType = create_model.into();
        active_model.set(Self::TENANT_COLUMN, Value::from(scope.organization_id));
        let model = active_model.insert(db).await?;
        Ok(model.into())
    }

    async fn update<C>(
        db: &C,
        scope: &Scope,
        id: Uuid,
        update_model: Self::UpdateModel,
    ) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let model = Self::find_scoped(db, scope, id).await?;
        let existing: Self::ActiveModelType = model.into_active_model();
        let updated_model = update_model.merge_into_activemodel(existing)?;
        let updated = updated_model.update(db).await?;
        Ok(updated.into())
    }

    async fn delete<C>(db: &C, scope: &Scope, id: Uuid) -> Result<Uuid, DbErr>
    where
        C: ConnectionTrait,
    {
        let res = Self::EntityType::delete_many()
            .filter(Self::ID_COLUMN.eq(id))
            .filter(Self::tenant_condition(scope))
            .exec(db)
            .await?;
        match res.rows_affected {
            0 => Err(DbErr::RecordNotFound(format!(
                "{} not found",
                Self::RESOURCE_NAME_SINGULAR
            ))),
            _ => Ok(id),
        }
    }

    /// Delete every listed id that belongs to the organization and return the ids
    /// that were actually present.
    async fn delete_many<C>(db: &C, scope: &Scope, ids: Vec<Uuid>) -> Result<Vec<Uuid>, DbErr>
    where
        C: ConnectionTrait,
    {
        let existing: Vec<Uuid> = Self::EntityType::find()
            .select_only()
            .column(Self::ID_COLUMN)
            .filter(Self::ID_COLUMN.is_in(ids))
            .filter(Self::tenant_condition(scope))
            .into_tuple()
            .all(db)
            .await?;
        if existing.is_empty() {
            return Ok(existing);
        }
        Self::EntityType::delete_many()
            .filter(Self::ID_COLUMN.is_in(existing.clone()))
            .filter(Self::tenant_condition(scope))
            .exec(db)
            .await?;
        Ok(existing)
    }

    async fn total_count<C>(db: &C, scope: &Scope, condition: &Condition) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let query = Self::EntityType::find()
            .filter(Self::tenant_condition(scope))
            .filter(condition.clone());
        PaginatorTrait::count(query, db).await
    }

    #[must_use]
    fn default_index_column() -> Self::ColumnType {
        Self::ID_COLUMN
    }

    #[must_use]
    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    #[must_use]
    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    /// Name of the status column, if the resource has one. Used by the `status`
    /// query shortcut.
    #[must_use]
    fn status_field() -> Option<&'static str> {
        None
    }

    /// Check if a specific field is an enum type at runtime.
    #[must_use]
    fn is_enum_field(field_name: &str) -> bool {
        let _ = field_name;
        false
    }

    /// Field names that use LIKE (substring) matching instead of equality.
    #[must_use]
    fn like_filterable_columns() -> Vec<&'static str> {
        vec![]
    }

    /// Columns concatenated and searched when the `q` parameter is used.
    #[must_use]
    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![]
    }
}

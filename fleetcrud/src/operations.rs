//! # CRUD Operations Trait
//!
//! `CRUDResource` carries the low-level, organization-scoped queries. `CRUDOperations`
//! wraps each of them in a lifecycle so a resource can customise behaviour by
//! overriding only the steps it cares about:
//!
//! 1. **Lifecycle hooks**: `before_*` / `after_*` for authorization, invariants, side effects
//! 2. **Core logic**: `fetch_*` / `perform_*` for custom queries or field defaults
//! 3. **Full override**: replace `create`, `delete`, ... entirely
//!
//! Create and update payloads are validated with [`Validatable`] before any hook runs,
//! so a payload with a missing required field never reaches the database.
//!
//! ```rust,ignore
//! #[derive(Default)]
//! pub struct JobOperations;
//!
//! #[async_trait]
//! impl CRUDOperations for JobOperations {
//!     type Resource = Job;
//!
//!     async fn before_update(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid, data: &JobUpdate) -> Result<(), ApiError> {
//!         let current = Job::get_one(db, scope, id).await?;
//!         check_transition(current.status, data.status)
//!     }
//! }
//! ```

use async_trait::async_trait;
use sea_orm::{Condition, DatabaseConnection, Order};
use uuid::Uuid;

use crate::ApiError;
use crate::core::{CRUDResource, Scope};
use crate::validation::Validatable;

/// Upper bound on ids accepted by a single batch delete.
pub const MAX_BATCH_DELETE_SIZE: usize = 100;

#[async_trait]
pub trait CRUDOperations: Send + Sync {
    /// The CRUD resource type this operations implementation works with
    type Resource: CRUDResource;

    /// Extra condition applied to every list query and count, on top of the
    /// organization scope. Used for per-viewer resources such as notifications.
    fn base_condition(&self, _scope: &Scope) -> Condition {
        Condition::all()
    }

    // ==========================================
    // GET ONE
    // ==========================================

    async fn before_get_one(&self, _db: &DatabaseConnection, _scope: &Scope, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_get_one(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _entity: &mut Self::Resource,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    /// Core fetch logic for a single entity
    ///
    /// # Errors
    /// Returns `ApiError::NotFound` if the entity doesn't exist in the scope's organization
    async fn fetch_one(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Self::Resource, ApiError> {
        <Self::Resource as CRUDResource>::get_one(db, scope, id)
            .await
            .map_err(|err| not_found_or_database::<Self::Resource>(err, id))
    }

    // ==========================================
    // GET ALL
    // ==========================================

    #[allow(clippy::too_many_arguments)]
    async fn before_get_all(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _condition: &Condition,
        _offset: u64,
        _limit: u64,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_get_all(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _entities: &mut Vec<<Self::Resource as CRUDResource>::ListModel>,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_all(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        condition: &Condition,
        order_column: <Self::Resource as CRUDResource>::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<<Self::Resource as CRUDResource>::ListModel>, ApiError> {
        let condition = condition.clone().add(self.base_condition(scope));
        <Self::Resource as CRUDResource>::get_all(
            db,
            scope,
            &condition,
            order_column,
            order_direction,
            offset,
            limit,
        )
        .await
        .map_err(ApiError::database)
    }

    async fn count_all(&self, db: &DatabaseConnection, scope: &Scope, condition: &Condition) -> Result<u64, ApiError> {
        let condition = condition.clone().add(self.base_condition(scope));
        <Self::Resource as CRUDResource>::total_count(db, scope, &condition)
            .await
            .map_err(ApiError::database)
    }

    // ==========================================
    // CREATE
    // ==========================================

    /// Hook called after validation and before inserting an entity
    ///
    /// Use for: authorization, cross-row invariants, defaults that depend on the scope
    async fn before_create(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _data: &mut <Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_create(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _entity: &mut Self::Resource,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_create(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        data: <Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<Self::Resource, ApiError> {
        <Self::Resource as CRUDResource>::create(db, scope, data)
            .await
            .map_err(ApiError::from)
    }

    // ==========================================
    // UPDATE
    // ==========================================

    async fn before_update(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _id: Uuid,
        _data: &<Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_update(
        &self,
        _db: &DatabaseConnection,
        _scope: &Scope,
        _entity: &mut Self::Resource,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_update(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        id: Uuid,
        data: <Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<Self::Resource, ApiError> {
        <Self::Resource as CRUDResource>::update(db, scope, id, data)
            .await
            .map_err(|err| not_found_or_database::<Self::Resource>(err, id))
    }

    // ==========================================
    // DELETE
    // ==========================================

    async fn before_delete(&self, _db: &DatabaseConnection, _scope: &Scope, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_delete(&self, _db: &DatabaseConnection, _scope: &Scope, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_delete(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Uuid, ApiError> {
        <Self::Resource as CRUDResource>::delete(db, scope, id)
            .await
            .map_err(|err| not_found_or_database::<Self::Resource>(err, id))
    }

    async fn before_delete_many(&self, _db: &DatabaseConnection, _scope: &Scope, _ids: &[Uuid]) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_delete_many(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, ApiError> {
        if ids.len() > MAX_BATCH_DELETE_SIZE {
            return Err(ApiError::bad_request(format!(
                "Batch delete limited to {} items. Received {} items.",
                MAX_BATCH_DELETE_SIZE,
                ids.len()
            )));
        }
        <Self::Resource as CRUDResource>::delete_many(db, scope, ids)
            .await
            .map_err(ApiError::from)
    }

    // ==========================================
    // MAIN OPERATIONS (orchestrate hooks + core logic)
    // ==========================================

    async fn get_one(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Self::Resource, ApiError> {
        self.before_get_one(db, scope, id).await?;
        let mut entity = self.fetch_one(db, scope, id).await?;
        self.after_get_one(db, scope, &mut entity).await?;
        Ok(entity)
    }

    #[allow(clippy::too_many_arguments)]
    async fn get_all(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        condition: &Condition,
        order_column: <Self::Resource as CRUDResource>::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<<Self::Resource as CRUDResource>::ListModel>, ApiError> {
        self.before_get_all(db, scope, condition, offset, limit).await?;
        let mut entities = self
            .fetch_all(db, scope, condition, order_column, order_direction, offset, limit)
            .await?;
        self.after_get_all(db, scope, &mut entities).await?;
        Ok(entities)
    }

    /// Validate, then run the create lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ValidationFailed` without touching the database when the
    /// payload fails validation.
    async fn create(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        mut data: <Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<Self::Resource, ApiError> {
        data.validate()?;
        self.before_create(db, scope, &mut data).await?;
        let mut entity = self.perform_create(db, scope, data).await?;
        self.after_create(db, scope, &mut entity).await?;
        Ok(entity)
    }

    async fn update(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        id: Uuid,
        data: <Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<Self::Resource, ApiError> {
        data.validate()?;
        self.before_update(db, scope, id, &data).await?;
        let mut entity = self.perform_update(db, scope, id, data).await?;
        self.after_update(db, scope, &mut entity).await?;
        Ok(entity)
    }

    async fn delete(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Uuid, ApiError> {
        self.before_delete(db, scope, id).await?;
        let deleted_id = self.perform_delete(db, scope, id).await?;
        self.after_delete(db, scope, deleted_id).await?;
        Ok(deleted_id)
    }

    async fn delete_many(&self, db: &DatabaseConnection, scope: &Scope, ids: Vec<Uuid>) -> Result<Vec<Uuid>, ApiError> {
        self.before_delete_many(db, scope, &ids).await?;
        self.perform_delete_many(db, scope, ids).await
    }
}

fn not_found_or_database<R: CRUDResource>(err: sea_orm::DbErr, id: Uuid) -> ApiError {
    match err {
        sea_orm::DbErr::RecordNotFound(_) => ApiError::not_found(R::RESOURCE_NAME_SINGULAR, Some(id.to_string())),
        other => ApiError::from(other),
    }
}

/// Operations with no overrides; every step delegates to the resource.
pub struct DefaultCRUDOperations<T: CRUDResource> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T: CRUDResource> DefaultCRUDOperations<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: CRUDResource> Default for DefaultCRUDOperations<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: CRUDResource> CRUDOperations for DefaultCRUDOperations<T> {
    type Resource = T;
}

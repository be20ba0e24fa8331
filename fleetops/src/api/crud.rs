//! Generic list/show/create/update/delete handlers shared by every resource.
//!
//! A resource module implements [`ResourcePolicy`] on its `CRUDOperations` type and
//! invokes [`crud_handlers!`], which expands to `#[utoipa::path]` handlers and a
//! `crud_router()` registering them.

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use fleetcrud::{
    ApiError, CRUDOperations, CRUDResource, CacheKey, CachedQuery, FilterOptions, apply_filters,
    calculate_content_range, parse_pagination, parse_sorting,
};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{Role, Session};
use crate::state::AppState;

pub type ResourceOf<O> = <O as CRUDOperations>::Resource;
type CreateOf<O> = <ResourceOf<O> as CRUDResource>::CreateModel;
type UpdateOf<O> = <ResourceOf<O> as CRUDResource>::UpdateModel;

/// Who may do what with a resource, and which cached lists its mutations make stale.
pub trait ResourcePolicy: CRUDOperations + Default + 'static {
    const READ: &'static [Role] = Role::ALL;
    const WRITE: &'static [Role];
    const CREATE: &'static [Role] = Self::WRITE;
    const DELETE: &'static [Role] = Self::WRITE;
    /// Other resources whose lists change when this one does.
    const INVALIDATES: &'static [&'static str] = &[];
    /// Lists differ per caller, so cache entries are keyed by viewer too.
    const PER_VIEWER: bool = false;
}

/// Drop cached lists of the resource and of everything it invalidates.
pub async fn invalidate<O: ResourcePolicy>(state: &AppState, organization_id: Uuid) {
    state
        .invalidate(organization_id, &[ResourceOf::<O>::RESOURCE_NAME_PLURAL])
        .await;
    state.invalidate(organization_id, O::INVALIDATES).await;
}

/// # Errors
///
/// `Forbidden` outside `READ`, otherwise database errors.
pub async fn list<O: ResourcePolicy>(
    state: &AppState,
    session: &Session,
    params: FilterOptions,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    session.require_any(O::READ)?;
    let scope = session.scope();
    let resource = ResourceOf::<O>::RESOURCE_NAME_PLURAL;
    let (offset, limit) = parse_pagination(&params);

    let mut key = CacheKey::new(scope.organization_id, resource, params.fingerprint());
    if O::PER_VIEWER {
        key = key.for_viewer(scope.actor_id);
    }

    let page = if let Some(hit) = state.cache.get(&key).await {
        tracing::debug!(resource, "List served from cache");
        hit
    } else {
        let seen = state.cache.generation(&key).await;
        let ops = O::default();
        let condition = apply_filters::<ResourceOf<O>>(&params);
        let (order_column, order_direction) = parse_sorting(
            &params,
            &ResourceOf::<O>::sortable_columns(),
            ResourceOf::<O>::default_index_column(),
        );
        let items = ops
            .get_all(&state.db, &scope, &condition, order_column, order_direction, offset, limit)
            .await?;
        let total = ops.count_all(&state.db, &scope, &condition).await?;
        let items = serde_json::to_value(items)
            .map_err(|err| ApiError::internal("Failed to encode list", Some(err.to_string())))?;
        state.cache.insert(key, seen, CachedQuery { items, total }).await
    };

    let headers = calculate_content_range(offset, limit, page.total, resource);
    Ok((headers, Json(page.items.clone())))
}

/// # Errors
///
/// `Forbidden` outside `READ`, `NotFound` for ids outside the organization.
pub async fn show<O: ResourcePolicy>(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> Result<Json<ResourceOf<O>>, ApiError> {
    session.require_any(O::READ)?;
    let item = O::default().get_one(&state.db, &session.scope(), id).await?;
    Ok(Json(item))
}

/// # Errors
///
/// `Forbidden` outside `CREATE`, `ValidationFailed` for an invalid payload, or any
/// error raised by the resource's hooks.
pub async fn create<O: ResourcePolicy>(
    state: &AppState,
    session: &Session,
    payload: CreateOf<O>,
) -> Result<(StatusCode, Json<ResourceOf<O>>), ApiError> {
    session.require_any(O::CREATE)?;
    let scope = session.scope();
    let item = O::default().create(&state.db, &scope, payload).await?;
    invalidate::<O>(state, scope.organization_id).await;
    tracing::info!(
        resource = ResourceOf::<O>::RESOURCE_NAME_PLURAL,
        actor = %scope.actor_id,
        "Created"
    );
    Ok((StatusCode::CREATED, Json(item)))
}

/// # Errors
///
/// `Forbidden` outside `WRITE`, `NotFound`, `ValidationFailed`, or hook errors.
pub async fn update<O: ResourcePolicy>(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: UpdateOf<O>,
) -> Result<Json<ResourceOf<O>>, ApiError> {
    session.require_any(O::WRITE)?;
    let scope = session.scope();
    let item = O::default().update(&state.db, &scope, id, payload).await?;
    invalidate::<O>(state, scope.organization_id).await;
    Ok(Json(item))
}

/// # Errors
///
/// `Forbidden` outside `DELETE`, `NotFound` for ids outside the organization.
pub async fn delete<O: ResourcePolicy>(state: &AppState, session: &Session, id: Uuid) -> Result<StatusCode, ApiError> {
    session.require_any(O::DELETE)?;
    let scope = session.scope();
    O::default().delete(&state.db, &scope, id).await?;
    invalidate::<O>(state, scope.organization_id).await;
    tracing::info!(
        resource = ResourceOf::<O>::RESOURCE_NAME_PLURAL,
        %id,
        actor = %scope.actor_id,
        "Deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every listed id that belongs to the organization and return those deleted.
///
/// # Errors
///
/// `Forbidden` outside `DELETE`, `BadRequest` above the batch limit.
pub async fn delete_many<O: ResourcePolicy>(
    state: &AppState,
    session: &Session,
    ids: Vec<Uuid>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    session.require_any(O::DELETE)?;
    let scope = session.scope();
    let deleted = O::default().delete_many(&state.db, &scope, ids).await?;
    invalidate::<O>(state, scope.organization_id).await;
    Ok(Json(deleted))
}

/// Expand to documented CRUD handlers for one resource plus `crud_router()`.
///
/// Paths are given in full (`"/vehicles"`, `"/vehicles/{id}"`, `"/vehicles/batch"`).
/// Leave out `create = ...` when the resource has its own create handler.
macro_rules! crud_handlers {
    (@common $tag:literal, $path:literal, $item_path:literal, $batch_path:literal, $ops:ty, $resource:ty, $update:ty) => {
        #[utoipa::path(
            get,
            path = $path,
            params(fleetcrud::FilterOptions),
            responses(
                (status = axum::http::StatusCode::OK, description = "One page of results; the Content-Range header carries the total", body = [$resource]),
                (status = axum::http::StatusCode::FORBIDDEN, description = "Role not permitted"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("get_all_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("List {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            description = format!("List {} with filtering, sorting and pagination.\n\n{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL, <$resource as fleetcrud::CRUDResource>::RESOURCE_DESCRIPTION),
        )]
        pub async fn get_all_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::extract::Query(params): axum::extract::Query<fleetcrud::FilterOptions>,
        ) -> Result<(axum::http::HeaderMap, axum::Json<serde_json::Value>), fleetcrud::ApiError> {
            $crate::api::crud::list::<$ops>(&state, &session, params).await
        }

        #[utoipa::path(
            get,
            path = $item_path,
            params(("id" = uuid::Uuid, Path, description = "Resource id")),
            responses(
                (status = axum::http::StatusCode::OK, body = $resource),
                (status = axum::http::StatusCode::NOT_FOUND, description = "Not found in this organization"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("get_one_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("Get one {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_SINGULAR),
        )]
        pub async fn get_one_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::extract::Path(id): axum::extract::Path<uuid::Uuid>,
        ) -> Result<axum::Json<$resource>, fleetcrud::ApiError> {
            $crate::api::crud::show::<$ops>(&state, &session, id).await
        }

        #[utoipa::path(
            put,
            path = $item_path,
            params(("id" = uuid::Uuid, Path, description = "Resource id")),
            request_body = $update,
            responses(
                (status = axum::http::StatusCode::OK, body = $resource),
                (status = axum::http::StatusCode::NOT_FOUND, description = "Not found in this organization"),
                (status = axum::http::StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("update_one_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("Update one {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_SINGULAR),
        )]
        pub async fn update_one_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::extract::Path(id): axum::extract::Path<uuid::Uuid>,
            axum::Json(payload): axum::Json<$update>,
        ) -> Result<axum::Json<$resource>, fleetcrud::ApiError> {
            $crate::api::crud::update::<$ops>(&state, &session, id, payload).await
        }

        #[utoipa::path(
            delete,
            path = $item_path,
            params(("id" = uuid::Uuid, Path, description = "Resource id")),
            responses(
                (status = axum::http::StatusCode::NO_CONTENT, description = "Deleted"),
                (status = axum::http::StatusCode::NOT_FOUND, description = "Not found in this organization"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("delete_one_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("Delete one {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_SINGULAR),
        )]
        pub async fn delete_one_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::extract::Path(id): axum::extract::Path<uuid::Uuid>,
        ) -> Result<axum::http::StatusCode, fleetcrud::ApiError> {
            $crate::api::crud::delete::<$ops>(&state, &session, id).await
        }

        #[utoipa::path(
            delete,
            path = $batch_path,
            request_body = Vec<uuid::Uuid>,
            responses(
                (status = axum::http::StatusCode::OK, description = "Ids that were deleted", body = [uuid::Uuid]),
                (status = axum::http::StatusCode::BAD_REQUEST, description = "Too many ids"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("delete_many_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("Delete many {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
        )]
        pub async fn delete_many_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::Json(ids): axum::Json<Vec<uuid::Uuid>>,
        ) -> Result<axum::Json<Vec<uuid::Uuid>>, fleetcrud::ApiError> {
            $crate::api::crud::delete_many::<$ops>(&state, &session, ids).await
        }

        fn common_router() -> utoipa_axum::router::OpenApiRouter<$crate::state::AppState> {
            utoipa_axum::router::OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_all_handler))
                .routes(utoipa_axum::routes!(delete_many_handler))
                .routes(utoipa_axum::routes!(get_one_handler))
                .routes(utoipa_axum::routes!(update_one_handler))
                .routes(utoipa_axum::routes!(delete_one_handler))
        }
    };
    (tag = $tag:literal, path = $path:literal, item_path = $item_path:literal, batch_path = $batch_path:literal, ops = $ops:ty, resource = $resource:ty, create = $create:ty, update = $update:ty $(,)?) => {
        $crate::api::crud::crud_handlers!(@common $tag, $path, $item_path, $batch_path, $ops, $resource, $update);

        #[utoipa::path(
            post,
            path = $path,
            request_body = $create,
            responses(
                (status = axum::http::StatusCode::CREATED, body = $resource),
                (status = axum::http::StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed"),
                (status = axum::http::StatusCode::CONFLICT, description = "Conflicts with an existing record"),
            ),
            tag = $tag,
            security(("bearer" = [])),
            operation_id = format!("create_one_{}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_PLURAL),
            summary = format!("Create one {}", <$resource as fleetcrud::CRUDResource>::RESOURCE_NAME_SINGULAR),
        )]
        pub async fn create_one_handler(
            axum::extract::State(state): axum::extract::State<$crate::state::AppState>,
            session: $crate::auth::Session,
            axum::Json(payload): axum::Json<$create>,
        ) -> Result<(axum::http::StatusCode, axum::Json<$resource>), fleetcrud::ApiError> {
            $crate::api::crud::create::<$ops>(&state, &session, payload).await
        }

        pub fn crud_router() -> utoipa_axum::router::OpenApiRouter<$crate::state::AppState> {
            common_router().routes(utoipa_axum::routes!(create_one_handler))
        }
    };
    (tag = $tag:literal, path = $path:literal, item_path = $item_path:literal, batch_path = $batch_path:literal, ops = $ops:ty, resource = $resource:ty, update = $update:ty $(,)?) => {
        $crate::api::crud::crud_handlers!(@common $tag, $path, $item_path, $batch_path, $ops, $resource, $update);

        pub fn crud_router() -> utoipa_axum::router::OpenApiRouter<$crate::state::AppState> {
            common_router()
        }
    };
}

pub(crate) use crud_handlers;

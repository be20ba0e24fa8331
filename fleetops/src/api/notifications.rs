//! Notifications. Every read and write is limited to the caller's own inbox; staff
//! may send to any profile of the organization.

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope, Validatable};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, TransactionTrait, sea_query::Expr,
};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{self, ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::notification::{
    self, Notification, NotificationBroadcast, NotificationCreate, NotificationStatus, NotificationUpdate,
};
use crate::entities::profile::{self, Profile, ProfileStatus};
use crate::state::AppState;

fn inbox(scope: &Scope) -> Condition {
    Notification::tenant_condition(scope).add(notification::Column::RecipientId.eq(scope.actor_id))
}

/// The notification, if it is in the caller's inbox. Anyone else's is a 404.
async fn find_own(db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<notification::Model, ApiError> {
    let model = Notification::find_scoped(db, scope, id).await?;
    if model.recipient_id != scope.actor_id {
        return Err(ApiError::not_found(Notification::RESOURCE_NAME_SINGULAR, Some(id.to_string())));
    }
    Ok(model)
}

#[derive(Default)]
pub struct NotificationOperations;

#[async_trait]
impl CRUDOperations for NotificationOperations {
    type Resource = Notification;

    fn base_condition(&self, scope: &Scope) -> Condition {
        Condition::all().add(notification::Column::RecipientId.eq(scope.actor_id))
    }

    async fn fetch_one(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Notification, ApiError> {
        Ok(find_own(db, scope, id).await?.into())
    }

    async fn before_create(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        data: &mut NotificationCreate,
    ) -> Result<(), ApiError> {
        Profile::find_scoped(db, scope, data.recipient_id).await?;
        Ok(())
    }

    async fn before_update(
        &self,
        db: &DatabaseConnection,
        scope: &Scope,
        id: Uuid,
        _data: &NotificationUpdate,
    ) -> Result<(), ApiError> {
        find_own(db, scope, id).await.map(|_| ())
    }

    async fn before_delete(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<(), ApiError> {
        find_own(db, scope, id).await.map(|_| ())
    }

    async fn before_delete_many(&self, db: &DatabaseConnection, scope: &Scope, ids: &[Uuid]) -> Result<(), ApiError> {
        let foreign = notification::Entity::find()
            .filter(Notification::tenant_condition(scope))
            .filter(notification::Column::Id.is_in(ids.iter().copied()))
            .filter(notification::Column::RecipientId.ne(scope.actor_id))
            .count(db)
            .await?;
        if foreign > 0 {
            return Err(ApiError::forbidden("Notifications can only be deleted by their recipient"));
        }
        Ok(())
    }
}

impl ResourcePolicy for NotificationOperations {
    const WRITE: &'static [Role] = Role::ALL;
    const CREATE: &'static [Role] = Role::STAFF;
    const PER_VIEWER: bool = true;
}

crud_handlers!(
    tag = "notifications",
    path = "/notifications",
    item_path = "/notifications/{id}",
    batch_path = "/notifications/batch",
    ops = NotificationOperations,
    resource = Notification,
    create = NotificationCreate,
    update = NotificationUpdate,
);

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResult {
    pub recipients: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub unread: u64,
}

/// Send one notification to every active profile, or every active profile with `role`.
///
/// # Errors
///
/// `ValidationFailed` before any query; database errors roll the whole broadcast back.
pub async fn broadcast(db: &DatabaseConnection, scope: &Scope, payload: NotificationBroadcast) -> Result<u64, ApiError> {
    payload.validate()?;
    let mut recipients = profile::Entity::find()
        .filter(Profile::tenant_condition(scope))
        .filter(profile::Column::Status.eq(ProfileStatus::Active));
    if let Some(role) = payload.role {
        recipients = recipients.filter(profile::Column::Role.eq(role));
    }

    let txn = db.begin().await?;
    let recipients = recipients.all(&txn).await?;
    for recipient in &recipients {
        let create = NotificationCreate {
            recipient_id: recipient.id,
            title: payload.title.clone(),
            message: payload.message.clone(),
            kind: payload.kind,
        };
        Notification::create(&txn, scope, create).await?;
    }
    txn.commit().await?;

    let sent = recipients.len() as u64;
    tracing::info!(recipients = sent, role = ?payload.role, actor = %scope.actor_id, "Notification broadcast");
    Ok(sent)
}

/// # Errors
///
/// `NotFound` unless the notification is in the caller's inbox.
pub async fn mark_read(db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<Notification, ApiError> {
    let model = find_own(db, scope, id).await?;
    if model.status == NotificationStatus::Read {
        return Ok(model.into());
    }
    let now = Utc::now();
    let mut active: notification::ActiveModel = model.into_active_model();
    active.status = Set(NotificationStatus::Read);
    active.read_at = Set(Some(now));
    active.updated_at = Set(now);
    Ok(active.update(db).await?.into())
}

/// Mark every unread notification in the caller's inbox read; returns how many changed.
///
/// # Errors
///
/// Propagates database errors.
pub async fn mark_all_read(db: &DatabaseConnection, scope: &Scope) -> Result<u64, ApiError> {
    let now = Utc::now();
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::Status, Expr::value(NotificationStatus::Read))
        .col_expr(notification::Column::ReadAt, Expr::value(Some(now)))
        .col_expr(notification::Column::UpdatedAt, Expr::value(now))
        .filter(inbox(scope))
        .filter(notification::Column::Status.eq(NotificationStatus::Unread))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// # Errors
///
/// Propagates database errors.
pub async fn unread_count(db: &DatabaseConnection, scope: &Scope) -> Result<u64, ApiError> {
    Ok(notification::Entity::find()
        .filter(inbox(scope))
        .filter(notification::Column::Status.eq(NotificationStatus::Unread))
        .count(db)
        .await?)
}

#[utoipa::path(
    post,
    path = "/notifications/broadcast",
    request_body = NotificationBroadcast,
    responses(
        (status = StatusCode::CREATED, body = BroadcastResult),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed"),
    ),
    tag = "notifications",
    security(("bearer" = [])),
    summary = "Notify every active profile, optionally of one role",
)]
pub async fn broadcast_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<NotificationBroadcast>,
) -> Result<(StatusCode, Json<BroadcastResult>), ApiError> {
    session.require_any(NotificationOperations::CREATE)?;
    let recipients = broadcast(&state.db, &session.scope(), payload).await?;
    crud::invalidate::<NotificationOperations>(&state, session.organization_id).await;
    Ok((StatusCode::CREATED, Json(BroadcastResult { recipients })))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = StatusCode::OK, body = Notification),
        (status = StatusCode::NOT_FOUND, description = "Not in your inbox"),
    ),
    tag = "notifications",
    security(("bearer" = [])),
    summary = "Mark one notification read",
)]
pub async fn mark_read_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = mark_read(&state.db, &session.scope(), id).await?;
    crud::invalidate::<NotificationOperations>(&state, session.organization_id).await;
    Ok(Json(notification))
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses((status = StatusCode::OK, body = MarkedRead)),
    tag = "notifications",
    security(("bearer" = [])),
    summary = "Mark the whole inbox read",
)]
pub async fn mark_all_read_handler(State(state): State<AppState>, session: Session) -> Result<Json<MarkedRead>, ApiError> {
    let updated = mark_all_read(&state.db, &session.scope()).await?;
    crud::invalidate::<NotificationOperations>(&state, session.organization_id).await;
    Ok(Json(MarkedRead { updated }))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    responses((status = StatusCode::OK, body = UnreadCount)),
    tag = "notifications",
    security(("bearer" = [])),
    summary = "Number of unread notifications in the inbox",
)]
pub async fn unread_count_handler(State(state): State<AppState>, session: Session) -> Result<Json<UnreadCount>, ApiError> {
    let unread = unread_count(&state.db, &session.scope()).await?;
    Ok(Json(UnreadCount { unread }))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router()
        .routes(routes!(broadcast_handler))
        .routes(routes!(mark_read_handler))
        .routes(routes!(mark_all_read_handler))
        .routes(routes!(unread_count_handler))
}

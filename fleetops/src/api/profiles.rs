//! Profiles: the organization's users. The Drivers screen lists profiles with
//! `role = driver`.

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use fleetcrud::{ApiError, CRUDOperations, CRUDResource, Scope};
use sea_orm::DatabaseConnection;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::api::crud::{ResourcePolicy, crud_handlers};
use crate::auth::{Role, Session};
use crate::entities::profile::{Profile, ProfileCreate, ProfileUpdate};
use crate::state::AppState;

#[derive(Default)]
pub struct ProfileOperations;

/// Only admins grant or take away the admin role.
async fn ensure_may_assign(db: &DatabaseConnection, scope: &Scope, from: Option<Role>, to: Role) -> Result<(), ApiError> {
    if to != Role::Admin && from != Some(Role::Admin) {
        return Ok(());
    }
    let actor = Profile::find_scoped(db, scope, scope.actor_id).await?;
    if actor.role != Role::Admin {
        return Err(ApiError::forbidden("Only administrators can grant or revoke the admin role"));
    }
    Ok(())
}

#[async_trait]
impl CRUDOperations for ProfileOperations {
    type Resource = Profile;

    async fn before_create(&self, db: &DatabaseConnection, scope: &Scope, data: &mut ProfileCreate) -> Result<(), ApiError> {
        ensure_may_assign(db, scope, None, data.role).await
    }

    async fn before_update(&self, db: &DatabaseConnection, scope: &Scope, id: Uuid, data: &ProfileUpdate) -> Result<(), ApiError> {
        let current = Profile::find_scoped(db, scope, id).await?;
        match data.role {
            Some(role) if role != current.role => {
                if id == scope.actor_id {
                    return Err(ApiError::forbidden("You cannot change your own role"));
                }
                ensure_may_assign(db, scope, Some(current.role), role).await
            }
            _ => Ok(()),
        }
    }

    async fn before_delete(&self, _db: &DatabaseConnection, scope: &Scope, id: Uuid) -> Result<(), ApiError> {
        if id == scope.actor_id {
            return Err(ApiError::bad_request("You cannot delete your own profile"));
        }
        Ok(())
    }

    async fn before_delete_many(&self, _db: &DatabaseConnection, scope: &Scope, ids: &[Uuid]) -> Result<(), ApiError> {
        if ids.contains(&scope.actor_id) {
            return Err(ApiError::bad_request("You cannot delete your own profile"));
        }
        Ok(())
    }
}

impl ResourcePolicy for ProfileOperations {
    const READ: &'static [Role] = Role::STAFF;
    const WRITE: &'static [Role] = Role::MANAGEMENT;
    // Deleting a profile cascades to or clears every row that references it.
    const INVALIDATES: &'static [&'static str] = &[
        "vehicles",
        "jobs",
        "bids",
        "inspections",
        "notifications",
        "licenses",
        "schedules",
        "api_keys",
    ];
}

crud_handlers!(
    tag = "profiles",
    path = "/profiles",
    item_path = "/profiles/{id}",
    batch_path = "/profiles/batch",
    ops = ProfileOperations,
    resource = Profile,
    create = ProfileCreate,
    update = ProfileUpdate,
);

#[utoipa::path(
    get,
    path = "/profiles/me",
    responses((status = axum::http::StatusCode::OK, body = Profile)),
    tag = "profiles",
    security(("bearer" = [])),
    summary = "The caller's own profile",
)]
pub async fn me_handler(State(state): State<AppState>, session: Session) -> Result<Json<Profile>, ApiError> {
    let profile = Profile::get_one(&state.db, &session.scope(), session.profile_id).await?;
    Ok(Json(profile))
}

pub fn router() -> OpenApiRouter<AppState> {
    crud_router().routes(routes!(me_handler))
}

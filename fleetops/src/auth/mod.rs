//! Session resolution. Every request carries its own [`Session`], extracted from the
//! `Authorization: Bearer <api key>` header; nothing about the caller is global.

pub mod api_keys;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};
use chrono::Utc;
use fleetcrud::{ApiError, Scope};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entities::profile::Role;
use crate::entities::{api_key, profile};
use crate::state::AppState;

pub use api_keys::{generate_token, hash_token, issue_api_key, revoke_api_key};

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Session {
    pub profile_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub full_name: String,
}

impl Session {
    #[must_use]
    pub const fn scope(&self) -> Scope {
        Scope::new(self.organization_id, self.profile_id)
    }

    #[must_use]
    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// # Errors
    ///
    /// Returns `Forbidden` when the caller's role is not in `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.has_any(roles) {
            Ok(())
        } else {
            tracing::debug!(role = self.role.as_str(), profile_id = %self.profile_id, "Role not permitted");
            Err(ApiError::forbidden("Your role does not permit this action"))
        }
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve a plaintext token to a session. `Ok(None)` means the key is unknown or
/// revoked, or its profile is missing or not active.
///
/// # Errors
///
/// Propagates database errors.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<Option<Session>, ApiError> {
    let Some(key) = api_key::Entity::find()
        .filter(api_key::Column::KeyHash.eq(hash_token(token)))
        .filter(api_key::Column::Status.eq(api_key::ApiKeyStatus::Active))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let Some(owner) = profile::Entity::find_by_id(key.profile_id)
        .filter(profile::Column::OrganizationId.eq(key.organization_id))
        .filter(profile::Column::Status.eq(profile::ProfileStatus::Active))
        .one(db)
        .await?
    else {
        tracing::debug!(key_id = %key.id, "API key owner is missing or inactive");
        return Ok(None);
    };

    let key_id = key.id;
    let mut touched: api_key::ActiveModel = key.into_active_model();
    touched.last_used_at = Set(Some(Utc::now()));
    if let Err(err) = touched.update(db).await {
        tracing::warn!(key_id = %key_id, error = %err, "Failed to record API key use");
    }

    Ok(Some(Session {
        profile_id: owner.id,
        organization_id: owner.organization_id,
        role: owner.role,
        full_name: owner.full_name,
    }))
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        authenticate(&state.db, token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or revoked API key"))
    }
}

/// Session for endpoints where signing in is optional. A missing or invalid key yields
/// `None` rather than a 401.
pub type MaybeSession = Option<Session>;

impl OptionalFromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => authenticate(&state.db, token).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn session(role: Role) -> Session {
        Session {
            profile_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            role,
            full_name: "Test User".to_string(),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer fo_abc"));
        assert_eq!(bearer_token(&headers), Some("fo_abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  fo_abc "));
        assert_eq!(bearer_token(&headers), Some("fo_abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm86YmFy"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_require_any() {
        let driver = session(Role::Driver);
        assert!(driver.require_any(Role::ALL).is_ok());
        let err = driver.require_any(Role::STAFF).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let manager = session(Role::Manager);
        assert!(manager.require_any(Role::MANAGEMENT).is_ok());
        assert!(manager.require_any(Role::ADMIN).is_err());
    }

    #[test]
    fn test_scope_carries_actor() {
        let admin = session(Role::Admin);
        let scope = admin.scope();
        assert_eq!(scope.organization_id, admin.organization_id);
        assert_eq!(scope.actor_id, admin.profile_id);
    }
}

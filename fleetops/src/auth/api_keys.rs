//! API key issuance and hashing. Only the blake3 digest and a short display prefix
//! are stored; the plaintext token is returned once, at issue time.

use chrono::Utc;
use fleetcrud::{ApiError, CRUDResource, Scope, Validatable};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, IntoActiveModel};
use rand::RngCore;
use uuid::Uuid;

use crate::entities::api_key::{self, ApiKey, ApiKeyCreate, ApiKeyStatus};
use crate::entities::profile::{Profile, ProfileStatus};

pub const TOKEN_PREFIX: &str = "fo_";
pub const DISPLAY_PREFIX_LEN: usize = 8;
const TOKEN_BYTES: usize = 32;

/// `fo_` followed by 32 random bytes as 64 lowercase hex characters.
#[must_use]
pub fn generate_token() -> String {
    let mut secret = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut secret);
    format!("{TOKEN_PREFIX}{}", hex::encode(secret))
}

#[must_use]
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

#[must_use]
pub fn display_prefix(token: &str) -> String {
    token.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Issue a key for an active profile of the organization and return it with its
/// plaintext token.
///
/// # Errors
///
/// Returns `NotFound` when the profile is not in the organization, `BadRequest` when
/// it is inactive, and `ValidationFailed` for an empty name.
pub async fn issue_api_key<C>(
    db: &C,
    scope: &Scope,
    profile_id: Uuid,
    name: &str,
) -> Result<(ApiKey, String), ApiError>
where
    C: ConnectionTrait,
{
    let profile = Profile::find_scoped(db, scope, profile_id).await?;
    if profile.status != ProfileStatus::Active {
        return Err(ApiError::bad_request("API keys can only be issued to active profiles"));
    }

    let token = generate_token();
    let create = ApiKeyCreate {
        profile_id,
        name: name.to_string(),
        key_prefix: display_prefix(&token),
        key_hash: hash_token(&token),
    };
    create.validate()?;
    let key = ApiKey::create(db, scope, create).await?;
    tracing::info!(key_id = %key.id, profile_id = %profile_id, "API key issued");
    Ok((key, token))
}

/// Mark a key revoked. Revoking an already revoked key is a no-op.
///
/// # Errors
///
/// Returns `NotFound` when the key is not in the organization.
pub async fn revoke_api_key<C>(db: &C, scope: &Scope, key_id: Uuid) -> Result<ApiKey, ApiError>
where
    C: ConnectionTrait,
{
    let model = ApiKey::find_scoped(db, scope, key_id).await?;
    if model.status == ApiKeyStatus::Revoked {
        return Ok(model.into());
    }
    let mut active: api_key::ActiveModel = model.into_active_model();
    active.status = Set(ApiKeyStatus::Revoked);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    tracing::info!(key_id = %key_id, "API key revoked");
    Ok(updated.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert!(token.starts_with("fo_"));
        assert_eq!(token.len(), 3 + 64);
        assert!(token[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_secret_is_fully_random() {
        let secret = hex::decode(&generate_token()[3..]).expect("hex secret");
        assert_eq!(secret.len(), 32);

        // No fixed version or variant nibbles.
        let tokens: Vec<String> = (0..50).map(|_| generate_token()).collect();
        assert!(tokens.iter().any(|t| t.as_bytes()[3 + 12] != b'4'));
        assert!(tokens.iter().any(|t| !matches!(t.as_bytes()[3 + 16], b'8' | b'9' | b'a' | b'b')));
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let hash = hash_token("fo_abc");
        assert_eq!(hash, hash_token("fo_abc"));
        assert_ne!(hash, hash_token("fo_abd"));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(display_prefix("fo_1234567890"), "fo_12345");
        assert_eq!(display_prefix("fo_"), "fo_");
    }
}

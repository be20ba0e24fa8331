//! First-run setup: an organization, its first admin, default settings and an API key.

use fleetcrud::{ApiError, CRUDResource, Scope, Validatable};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

use crate::auth::issue_api_key;
use crate::config::BootstrapConfig;
use crate::entities::organization::{self, Organization, OrganizationCreate};
use crate::entities::profile::{Profile, ProfileCreate, Role};
use crate::settings;

const DEFAULT_ADMIN_NAME: &str = "Administrator";
const BOOTSTRAP_KEY_NAME: &str = "bootstrap";

/// What bootstrap created. The token is the only copy of the key.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub organization: Organization,
    pub admin: Profile,
    pub token: String,
}

/// Create the first organization when configured to and none exists yet.
///
/// Returns `None` when bootstrap is not configured or an organization already exists.
///
/// # Errors
///
/// Returns a validation error for a bad name or email, and propagates database errors.
/// Nothing is written when an error is returned.
pub async fn bootstrap(db: &DatabaseConnection, config: &BootstrapConfig) -> Result<Option<Bootstrapped>, ApiError> {
    let Some((organization_name, admin_email)) = config.requested() else {
        return Ok(None);
    };
    if organization::Entity::find().one(db).await?.is_some() {
        tracing::debug!("An organization exists, skipping bootstrap");
        return Ok(None);
    }

    let organization_create = OrganizationCreate {
        name: organization_name.to_string(),
        contact_email: Some(admin_email.to_string()),
    };
    let admin_create = ProfileCreate {
        full_name: config
            .admin_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ADMIN_NAME)
            .to_string(),
        email: admin_email.to_string(),
        phone: None,
        role: Role::Admin,
        status: None,
    };
    organization_create.validate()?;
    admin_create.validate()?;

    let txn = db.begin().await?;
    let tenant = Scope::new(Uuid::new_v4(), Uuid::nil());
    let organization = Organization::create(&txn, &tenant, organization_create).await?;
    let admin = Profile::create(&txn, &tenant, admin_create).await?;
    let scope = Scope::new(organization.id, admin.id);
    settings::seed_defaults(&txn, &scope).await?;
    let (key, token) = issue_api_key(&txn, &scope, admin.id, BOOTSTRAP_KEY_NAME).await?;
    txn.commit().await?;

    tracing::info!(
        organization_id = %organization.id,
        admin_id = %admin.id,
        "Bootstrapped organization '{}'",
        organization.name
    );
    tracing::warn!(
        key_id = %key.id,
        token = %token,
        "Bootstrap API key issued. It is shown only once; store it now"
    );
    Ok(Some(Bootstrapped {
        organization,
        admin,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use crate::migration::Migrator;
    use sea_orm::{Database, PaginatorTrait};
    use sea_orm_migration::MigratorTrait;

    async fn database() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn configured() -> BootstrapConfig {
        BootstrapConfig {
            organization_name: Some("Northwind Haulage".to_string()),
            admin_name: Some("Ada Admin".to_string()),
            admin_email: Some("ada@northwind.test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_does_nothing() {
        let db = database().await;
        let created = bootstrap(&db, &BootstrapConfig::default()).await.unwrap();
        assert!(created.is_none());
        assert_eq!(organization::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let db = database().await;
        let created = bootstrap(&db, &configured()).await.unwrap().unwrap();
        assert_eq!(created.organization.name, "Northwind Haulage");
        assert_eq!(created.admin.role, Role::Admin);

        let session = authenticate(&db, &created.token).await.unwrap().unwrap();
        assert_eq!(session.organization_id, created.organization.id);
        assert_eq!(session.role, Role::Admin);

        assert!(bootstrap(&db, &configured()).await.unwrap().is_none());
        assert_eq!(organization::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_email_writes_nothing() {
        let db = database().await;
        let config = BootstrapConfig {
            admin_email: Some("not-an-email".to_string()),
            ..configured()
        };
        assert!(bootstrap(&db, &config).await.is_err());
        assert_eq!(organization::Entity::find().count(&db).await.unwrap(), 0);
    }
}

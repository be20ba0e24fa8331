use std::sync::Arc;

use fleetcrud::QueryCache;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::config::Config;

/// Shared handler state. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: QueryCache,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            db,
            cache: QueryCache::new(config.cache.ttl()),
            config: Arc::new(config),
        }
    }

    /// Drop cached lists of every named resource in the organization.
    pub async fn invalidate(&self, organization_id: Uuid, resources: &[&str]) {
        for resource in resources {
            self.cache.invalidate(organization_id, resource).await;
        }
    }
}

//! Resource-keyed cache for list queries.
//!
//! Every list request for the same organization, resource, query and (for per-viewer
//! resources) viewer shares one entry. Mutating a resource invalidates all of that
//! organization's entries for it, so the next list request refetches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub organization_id: Uuid,
    pub resource: &'static str,
    pub query: String,
    pub viewer: Option<Uuid>,
}

impl CacheKey {
    #[must_use]
    pub fn new(organization_id: Uuid, resource: &'static str, query: impl Into<String>) -> Self {
        Self {
            organization_id,
            resource,
            query: query.into(),
            viewer: None,
        }
    }

    #[must_use]
    pub const fn for_viewer(mut self, viewer: Uuid) -> Self {
        self.viewer = Some(viewer);
        self
    }
}

/// One page of list results plus the unpaginated total.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedQuery {
    pub items: serde_json::Value,
    pub total: u64,
}

struct Entry {
    value: Arc<CachedQuery>,
    stored_at: Instant,
}

/// Invalidation counters observed before a list query ran. An insert made with a stale
/// generation is dropped, so a page read before a mutation never outlives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation {
    organization: u64,
    resource: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    organization_generations: HashMap<Uuid, u64>,
    resource_generations: HashMap<(Uuid, String), u64>,
}

impl Inner {
    fn generation(&self, organization_id: Uuid, resource: &str) -> Generation {
        Generation {
            organization: self
                .organization_generations
                .get(&organization_id)
                .copied()
                .unwrap_or_default(),
            resource: self
                .resource_generations
                .get(&(organization_id, resource.to_string()))
                .copied()
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<RwLock<Inner>>,
    ttl: Duration,
}

impl QueryCache {
    /// A `ttl` of zero disables the cache: nothing is stored and every lookup misses.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            ttl,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CachedQuery>> {
        if !self.is_enabled() {
            return None;
        }
        let inner = self.inner.read().await;
        let entry = inner.entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            trace!(resource = key.resource, "Cache entry expired");
            return None;
        }
        trace!(resource = key.resource, "Cache hit");
        Some(Arc::clone(&entry.value))
    }

    /// Take this before querying the database and hand it back to [`Self::insert`].
    pub async fn generation(&self, key: &CacheKey) -> Generation {
        self.inner
            .read()
            .await
            .generation(key.organization_id, key.resource)
    }

    /// Store `value` unless `key`'s resource was invalidated since `seen` was taken.
    pub async fn insert(&self, key: CacheKey, seen: Generation, value: CachedQuery) -> Arc<CachedQuery> {
        let value = Arc::new(value);
        if self.is_enabled() {
            let mut inner = self.inner.write().await;
            if inner.generation(key.organization_id, key.resource) != seen {
                trace!(resource = key.resource, "Skipping insert of a page read before invalidation");
                return value;
            }
            inner.entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
            inner.entries.insert(
                key,
                Entry {
                    value: Arc::clone(&value),
                    stored_at: Instant::now(),
                },
            );
        }
        value
    }

    /// Drop every entry of `resource` within the organization.
    pub async fn invalidate(&self, organization_id: Uuid, resource: &str) {
        let mut inner = self.inner.write().await;
        *inner
            .resource_generations
            .entry((organization_id, resource.to_string()))
            .or_default() += 1;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|key, _| !(key.organization_id == organization_id && key.resource == resource));
        trace!(
            resource,
            dropped = before - inner.entries.len(),
            "Cache invalidated"
        );
    }

    /// Drop every entry belonging to the organization.
    pub async fn invalidate_organization(&self, organization_id: Uuid) {
        let mut inner = self.inner.write().await;
        *inner.organization_generations.entry(organization_id).or_default() += 1;
        inner.entries.retain(|key, _| key.organization_id != organization_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(total: u64) -> CachedQuery {
        CachedQuery {
            items: json!([{ "id": 1 }]),
            total,
        }
    }

    async fn insert_fresh(cache: &QueryCache, key: CacheKey, value: CachedQuery) -> Arc<CachedQuery> {
        let seen = cache.generation(&key).await;
        cache.insert(key, seen, value).await
    }

    #[tokio::test]
    async fn test_same_key_shares_entry() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let org = Uuid::new_v4();
        let key = CacheKey::new(org, "vehicles", "page=1");

        let stored = cache.insert(key.clone(), cache.generation(&key).await, page(3)).await;
        let hit = cache.get(&key).await.expect("cache hit");
        assert!(Arc::ptr_eq(&stored, &hit));
        assert_eq!(hit.total, 3);
    }

    #[tokio::test]
    async fn test_invalidate_is_scoped_to_resource_and_organization() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let org = Uuid::new_v4();
        let other_org = Uuid::new_v4();

        insert_fresh(&cache, CacheKey::new(org, "vehicles", "a"), page(1)).await;
        insert_fresh(&cache, CacheKey::new(org, "vehicles", "b"), page(1)).await;
        insert_fresh(&cache, CacheKey::new(org, "jobs", "a"), page(1)).await;
        insert_fresh(&cache, CacheKey::new(other_org, "vehicles", "a"), page(1)).await;

        cache.invalidate(org, "vehicles").await;

        assert!(cache.get(&CacheKey::new(org, "vehicles", "a")).await.is_none());
        assert!(cache.get(&CacheKey::new(org, "vehicles", "b")).await.is_none());
        assert!(cache.get(&CacheKey::new(org, "jobs", "a")).await.is_some());
        assert!(cache.get(&CacheKey::new(other_org, "vehicles", "a")).await.is_some());
    }

    #[tokio::test]
    async fn test_viewer_is_part_of_key() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let org = Uuid::new_v4();
        let key = CacheKey::new(org, "notifications", "").for_viewer(Uuid::new_v4());
        insert_fresh(&cache, key, page(2)).await;

        let other_viewer = CacheKey::new(org, "notifications", "").for_viewer(Uuid::new_v4());
        assert!(cache.get(&other_viewer).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = QueryCache::new(Duration::ZERO);
        let key = CacheKey::new(Uuid::new_v4(), "jobs", "");
        let value = cache.insert(key.clone(), cache.generation(&key).await, page(5)).await;

        assert_eq!(value.total, 5);
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_miss() {
        let cache = QueryCache::new(Duration::from_millis(20));
        let key = CacheKey::new(Uuid::new_v4(), "jobs", "");
        cache.insert(key.clone(), cache.generation(&key).await, page(1)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_page_read_before_invalidation_is_not_stored() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let org = Uuid::new_v4();
        let key = CacheKey::new(org, "vehicles", "page=1");

        assert!(cache.get(&key).await.is_none());
        let seen = cache.generation(&key).await;
        // A write commits and invalidates while the list query is still running.
        cache.invalidate(org, "vehicles").await;
        let returned = cache.insert(key.clone(), seen, page(3)).await;

        assert_eq!(returned.total, 3);
        assert!(cache.get(&key).await.is_none());

        insert_fresh(&cache, key.clone(), page(4)).await;
        assert_eq!(cache.get(&key).await.expect("fresh page cached").total, 4);
    }

    #[tokio::test]
    async fn test_organization_wipe_also_drops_in_flight_pages() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let org = Uuid::new_v4();
        let key = CacheKey::new(org, "jobs", "");

        let seen = cache.generation(&key).await;
        cache.invalidate_organization(org).await;
        cache.insert(key.clone(), seen, page(1)).await;
        assert!(cache.get(&key).await.is_none());

        let other = CacheKey::new(org, "vehicles", "");
        let seen = cache.generation(&other).await;
        cache.invalidate(org, "jobs").await;
        cache.insert(other.clone(), seen, page(2)).await;
        assert!(cache.get(&other).await.is_some());
    }
}

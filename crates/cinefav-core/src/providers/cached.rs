// Catalog with a SQLite detail cache in front of lookups
use async_trait::async_trait;
use cinefav_cache::CacheManager;
use std::sync::Arc;
use tracing::debug;

use crate::{
    models::{CatalogDetails, CatalogPage},
    services::CatalogService,
    Result,
};

/// Checks the detail cache before hitting the catalog for `get_by_id`.
///
/// `discover` is never cached.
pub struct CachedCatalog<C> {
    inner: C,
    cache: Arc<CacheManager>,
    ttl: chrono::Duration,
}

impl<C: CatalogService> CachedCatalog<C> {
    pub fn new(inner: C, cache: Arc<CacheManager>, ttl_hours: u64) -> Self {
        Self {
            inner,
            cache,
            ttl: ttl_from_hours(ttl_hours),
        }
    }
}

/// Hours to a TTL, saturating at the largest duration chrono can hold
pub fn ttl_from_hours(hours: u64) -> chrono::Duration {
    i64::try_from(hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .unwrap_or(chrono::Duration::MAX)
}

#[async_trait]
impl<C: CatalogService> CatalogService for CachedCatalog<C> {
    async fn discover(&self, page: u32) -> Result<CatalogPage> {
        self.inner.discover(page).await
    }

    async fn get_by_id(&self, id: u64) -> Result<CatalogDetails> {
        match self.cache.get_details::<CatalogDetails>(id, self.ttl) {
            Ok(Some(details)) => {
                debug!("Cache hit for movie {}", id);
                return Ok(details);
            }
            Ok(None) => debug!("Cache miss for movie {}", id),
            Err(e) => debug!("Cache error for movie {}: {}", id, e),
        }

        let details = self.inner.get_by_id(id).await?;

        if let Err(e) = self.cache.put_details(id, &details) {
            debug!("Failed to cache movie {}: {}", id, e);
        }

        Ok(details)
    }
}

use crate::{
    models::{CatalogDetails, CatalogPage, FavoriteRecord, Profile, ToggleOutcome},
    Error, Result,
};

/// Read-only movie catalog.
///
/// The real implementation talks to TMDB; tests use the mockall double. The
/// pager and the enricher only ever see this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// One page of the discover feed, unfiltered
    async fn discover(&self, page: u32) -> Result<CatalogPage>;

    /// Metadata for a single movie
    async fn get_by_id(&self, id: u64) -> Result<CatalogDetails>;
}

/// What the backend answers to a successful sign-up/sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub access_token: String,
    pub message: Option<String>,
}

/// The account backend that owns favorites and profiles.
///
/// Every authenticated method takes the bearer token explicitly so that the
/// caller has to read it fresh from the credential store for each request.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AccountBackend: Send + Sync {
    async fn check_favorite(&self, token: &str, item_id: u64) -> Result<bool>;

    async fn toggle_favorite(&self, token: &str, item_id: u64, title: &str) -> Result<ToggleOutcome>;

    async fn list_favorites(&self, token: &str) -> Result<Vec<FavoriteRecord>>;

    async fn authenticate(&self, profile: &Profile) -> Result<AuthGrant>;

    async fn update_profile(&self, token: &str, profile: &Profile) -> Result<Option<String>>;
}

// Pager, enricher and session each own their service; sharing one client
// between them goes through an Arc.
#[async_trait::async_trait]
impl<T: CatalogService + ?Sized> CatalogService for std::sync::Arc<T> {
    async fn discover(&self, page: u32) -> Result<CatalogPage> {
        (**self).discover(page).await
    }

    async fn get_by_id(&self, id: u64) -> Result<CatalogDetails> {
        (**self).get_by_id(id).await
    }
}

// No catalog configured: every lookup fails, so membership operations still
// work and enrichment degrades to partial entries.
#[async_trait::async_trait]
impl<T: CatalogService> CatalogService for Option<T> {
    async fn discover(&self, page: u32) -> Result<CatalogPage> {
        match self {
            Some(catalog) => catalog.discover(page).await,
            None => Err(no_catalog()),
        }
    }

    async fn get_by_id(&self, id: u64) -> Result<CatalogDetails> {
        match self {
            Some(catalog) => catalog.get_by_id(id).await,
            None => Err(no_catalog()),
        }
    }
}

fn no_catalog() -> Error {
    Error::ConfigError("No catalog configured".into())
}

#[async_trait::async_trait]
impl<T: AccountBackend + ?Sized> AccountBackend for std::sync::Arc<T> {
    async fn check_favorite(&self, token: &str, item_id: u64) -> Result<bool> {
        (**self).check_favorite(token, item_id).await
    }

    async fn toggle_favorite(&self, token: &str, item_id: u64, title: &str) -> Result<ToggleOutcome> {
        (**self).toggle_favorite(token, item_id, title).await
    }

    async fn list_favorites(&self, token: &str) -> Result<Vec<FavoriteRecord>> {
        (**self).list_favorites(token).await
    }

    async fn authenticate(&self, profile: &Profile) -> Result<AuthGrant> {
        (**self).authenticate(profile).await
    }

    async fn update_profile(&self, token: &str, profile: &Profile) -> Result<Option<String>> {
        (**self).update_profile(token, profile).await
    }
}

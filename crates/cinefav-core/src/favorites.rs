use tracing::{debug, info};

use crate::{
    credentials::CredentialStore,
    enrich::DetailEnricher,
    models::{EnrichedFavorite, FavoriteFlag, ToggleOutcome},
    services::{AccountBackend, CatalogService},
    Error, Result,
};

const DEFAULT_ENRICH_CONCURRENCY: usize = 8;

/// Favorites sync against the account backend.
///
/// The backend is the only source of truth for membership. Nothing here
/// remembers whether an item is a favorite between calls, and the token is
/// read from the credential store at the start of every operation.
pub struct FavoritesEngine<B, C> {
    backend: B,
    enricher: DetailEnricher<C>,
    credentials: CredentialStore,
    enrich_concurrency: usize,
}

impl<B: AccountBackend, C: CatalogService> FavoritesEngine<B, C> {
    pub fn new(backend: B, catalog: C, credentials: CredentialStore) -> Self {
        Self {
            backend,
            enricher: DetailEnricher::new(catalog),
            credentials,
            enrich_concurrency: DEFAULT_ENRICH_CONCURRENCY,
        }
    }

    pub fn with_enrich_concurrency(mut self, concurrency: usize) -> Self {
        self.enrich_concurrency = concurrency.max(1);
        self
    }

    fn token(&self) -> Option<String> {
        self.credentials.load().map(|credential| credential.token)
    }

    /// Ask the backend whether `item_id` is a favorite.
    ///
    /// Signed-out users have no favorites, so this answers `false` without
    /// making a request.
    pub async fn is_favorite(&self, item_id: u64) -> Result<bool> {
        let Some(token) = self.token() else {
            debug!("No credential, item {} reported as not favorite", item_id);
            return Ok(false);
        };

        self.backend.check_favorite(&token, item_id).await
    }

    /// Ask the backend to flip membership and report what it did
    pub async fn toggle_favorite(&self, item_id: u64, title: &str) -> Result<ToggleOutcome> {
        let token = self.token().ok_or(Error::Unauthenticated)?;

        let outcome = self.backend.toggle_favorite(&token, item_id, title).await?;
        info!("Toggled favorite {} ({}): {:?}", item_id, title, outcome);
        Ok(outcome)
    }

    /// Toggle and fold the confirmed result into a screen's flag.
    ///
    /// The flag is left alone on error or when the backend does not say
    /// which way it went.
    pub async fn sync_flag(&self, flag: &mut FavoriteFlag) -> Result<ToggleOutcome> {
        let outcome = self.toggle_favorite(flag.item_id, &flag.title).await?;
        flag.apply(outcome);
        Ok(outcome)
    }

    /// Set a flag from the backend's current answer
    pub async fn refresh_flag(&self, flag: &mut FavoriteFlag) -> Result<()> {
        flag.is_favorite = self.is_favorite(flag.item_id).await?;
        Ok(())
    }

    /// All favorites in backend order, each joined with catalog metadata.
    ///
    /// A failed catalog lookup costs that one entry its poster and overview;
    /// it never fails the listing.
    pub async fn list_favorites(&self) -> Result<Vec<EnrichedFavorite>> {
        let token = self.token().ok_or(Error::Unauthenticated)?;

        let records = self.backend.list_favorites(&token).await?;
        debug!("Backend returned {} favorites", records.len());

        Ok(self
            .enricher
            .enrich_all(&records, self.enrich_concurrency)
            .await)
    }
}

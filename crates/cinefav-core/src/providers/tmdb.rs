// TMDB provider - bridges TmdbClient with CatalogService
use async_trait::async_trait;
use cinefav_api::{RetryConfig, TmdbClient, TmdbMovie, TmdbMovieDetails};

use crate::{
    config::CatalogConfig,
    models::{CatalogDetails, CatalogItem, CatalogPage},
    services::CatalogService,
    Result,
};

/// Wrapper around TmdbClient that implements CatalogService
pub struct TmdbCatalog {
    client: TmdbClient,
}

impl TmdbCatalog {
    pub fn new(client: TmdbClient) -> Self {
        Self { client }
    }

    /// Build a client from config; fails when no API key is set
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = TmdbClient::with_base_url(api_key, config.api_url.clone())
            .with_genre(config.genre.clone())
            .with_retry_config(RetryConfig::default());
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CatalogService for TmdbCatalog {
    async fn discover(&self, page: u32) -> Result<CatalogPage> {
        let response = self.client.discover(page).await?;

        Ok(CatalogPage {
            items: response.results.into_iter().map(tmdb_to_item).collect(),
            total_pages: response.total_pages.max(1),
        })
    }

    async fn get_by_id(&self, id: u64) -> Result<CatalogDetails> {
        let details = self.client.movie(id).await?;
        Ok(tmdb_to_details(details))
    }
}

/// Convert a TMDB listing entry to our CatalogItem
fn tmdb_to_item(movie: TmdbMovie) -> CatalogItem {
    CatalogItem {
        id: movie.id,
        title: movie.title,
        poster_path: non_empty(movie.poster_path),
        overview: non_empty(movie.overview),
    }
}

fn tmdb_to_details(movie: TmdbMovieDetails) -> CatalogDetails {
    CatalogDetails {
        id: movie.id,
        poster_path: non_empty(movie.poster_path),
        overview: non_empty(movie.overview),
    }
}

// TMDB sends "" for a missing overview about as often as it sends null
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_become_none() {
        let item = tmdb_to_item(TmdbMovie {
            id: 5,
            title: "Up".into(),
            poster_path: Some("/up.jpg".into()),
            overview: Some("".into()),
        });
        assert_eq!(item.poster_path.as_deref(), Some("/up.jpg"));
        assert!(item.overview.is_none());
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = CatalogConfig::default();
        assert!(TmdbCatalog::from_config(&config).is_err());

        let config = CatalogConfig {
            api_key: Some("k".into()),
            ..CatalogConfig::default()
        };
        assert!(TmdbCatalog::from_config(&config).is_ok());
    }
}

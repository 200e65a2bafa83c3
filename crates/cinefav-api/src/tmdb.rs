use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig, Transient};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("API request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Movie not found: {0}")]
    NotFound(u64),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl Transient for TmdbError {
    fn is_transient(&self) -> bool {
        match self {
            TmdbError::RateLimitExceeded => true,
            TmdbError::RequestFailed { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            TmdbError::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TmdbError::NotFound(_) | TmdbError::InvalidApiKey | TmdbError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TmdbError>;

/// Client for the TMDB v3 movie catalog.
///
/// Read-only and unauthenticated apart from the API key, which TMDB takes as
/// a query parameter on every call.
pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    genre: Option<String>,
    retry_config: RetryConfig,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, TMDB_API_BASE.to_string())
    }

    /// For a proxy or a local stand-in of the TMDB API
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("cinefav/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            genre: None,
            retry_config: RetryConfig::default(),
        }
    }

    /// Restrict `discover` to a TMDB genre id (16 is Animation)
    pub fn with_genre(mut self, genre: Option<String>) -> Self {
        self.genre = genre;
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Fetch one page of the discover feed
    pub async fn discover(&self, page: u32) -> Result<DiscoverResponse> {
        let url = format!("{}/discover/movie", self.base_url);
        let page = page.to_string();

        with_retry(&self.retry_config, || async {
            let mut query = vec![("api_key", self.api_key.as_str()), ("page", page.as_str())];
            if let Some(ref genre) = self.genre {
                query.push(("with_genres", genre.as_str()));
            }

            debug!("GET {} page={}", url, page);
            let response = self.client.get(&url).query(&query).send().await?;
            let body = Self::check_response(response, None).await?;
            Ok(serde_json::from_str::<DiscoverResponse>(&body)?)
        })
        .await
    }

    /// Get full details for a single movie
    pub async fn movie(&self, id: u64) -> Result<TmdbMovieDetails> {
        let url = format!("{}/movie/{}", self.base_url, id);

        with_retry(&self.retry_config, || async {
            debug!("GET {}", url);
            let response = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .send()
                .await?;
            let body = Self::check_response(response, Some(id)).await?;
            Ok(serde_json::from_str::<TmdbMovieDetails>(&body)?)
        })
        .await
    }

    /// Map error statuses and hand back the raw body on success.
    ///
    /// The body is decoded separately so a truncated or malformed payload
    /// shows up as `ParseError` rather than as a transport failure.
    async fn check_response(response: reqwest::Response, id: Option<u64>) -> Result<String> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TmdbError::InvalidApiKey);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(TmdbError::NotFound(id));
            }
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TmdbError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TmdbError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

/// One page of `/discover/movie`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
}

fn default_total_pages() -> u32 {
    1
}

/// Movie as listed in the discover feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// Subset of `/movie/{id}` that the client cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = TmdbClient::new("key".to_string());
        assert_eq!(client.base_url, TMDB_API_BASE);
        assert!(client.genre.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = TmdbClient::with_base_url("key".to_string(), "http://localhost:9000/3/".into());
        assert_eq!(client.base_url, "http://localhost:9000/3");
    }

    #[test]
    fn test_discover_response_decodes_nullable_fields() {
        let json = r#"{
            "page": 1,
            "results": [
                {"id": 1, "title": "A", "poster_path": null, "overview": "x"},
                {"id": 2, "title": "B"}
            ],
            "total_pages": 3
        }"#;

        let decoded: DiscoverResponse = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.results.len(), 2);
        assert_eq!(decoded.total_pages, 3);
        assert!(decoded.results[0].poster_path.is_none());
        assert!(decoded.results[1].overview.is_none());
    }

    #[test]
    fn test_missing_total_pages_defaults_to_one() {
        let decoded: DiscoverResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(decoded.total_pages, 1);
    }

    #[test]
    fn test_transient_classification() {
        assert!(TmdbError::RateLimitExceeded.is_transient());
        assert!(TmdbError::RequestFailed { status: 502, body: String::new() }.is_transient());
        assert!(!TmdbError::RequestFailed { status: 400, body: String::new() }.is_transient());
        assert!(!TmdbError::NotFound(3).is_transient());
        assert!(!TmdbError::InvalidApiKey.is_transient());
    }
}

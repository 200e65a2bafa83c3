use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig, Transient};

const ACCOUNT_API_BASE: &str = "https://app-backend-2l6q.onrender.com";

#[derive(Error, Debug)]
pub enum AccountError {
    /// Non-success status. `message` is whatever the backend put in the
    /// `message` or `error` field of its JSON body, if anything.
    #[error("Backend returned status {status}{}", message_suffix(.message))]
    Status { status: u16, message: Option<String> },

    #[error("Authentication required")]
    AuthRequired { message: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl AccountError {
    /// Message supplied by the backend, if it sent one
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            AccountError::Status { message, .. } | AccountError::AuthRequired { message } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

impl Transient for AccountError {
    fn is_transient(&self) -> bool {
        match self {
            AccountError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            AccountError::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AccountError::AuthRequired { .. } | AccountError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// Client for the favorites/account backend.
///
/// Every authenticated call takes the bearer token as an argument instead of
/// holding one: the token can be revoked by a logout between two calls, so
/// callers re-read it for each request.
pub struct AccountClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl AccountClient {
    pub fn new() -> Self {
        Self::with_base_url(ACCOUNT_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
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
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Ask whether a movie is in the user's favorites
    pub async fn check_favorite(&self, token: &str, movie_id: u64) -> Result<CheckFavoriteResponse> {
        let url = format!("{}/api/check_favorite", self.base_url);
        let movie_id = movie_id.to_string();

        with_retry(&self.retry_config, || async {
            debug!("GET {} movie_id={}", url, movie_id);
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[("movie_id", movie_id.as_str())])
                .send()
                .await?;
            Self::decode(response).await
        })
        .await
    }

    /// Flip favorite membership for a movie.
    ///
    /// Not retried: the backend toggles, so replaying a request whose
    /// response got lost would flip it straight back.
    pub async fn toggle_favorite(
        &self,
        token: &str,
        movie_id: u64,
        title: &str,
    ) -> Result<ToggleFavoriteResponse> {
        // The backend route really is spelled this way
        let url = format!("{}/api/toogle_favorites", self.base_url);
        let body = ToggleFavoriteRequest { movie_id, title };

        debug!("POST {} movie_id={}", url, movie_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch the user's favorites in backend order
    pub async fn list_favorites(&self, token: &str) -> Result<FavoritesResponse> {
        let url = format!("{}/api/favorites", self.base_url);

        with_retry(&self.retry_config, || async {
            debug!("GET {}", url);
            let response = self.client.get(&url).bearer_auth(token).send().await?;
            Self::decode(response).await
        })
        .await
    }

    /// Sign up or sign in - the backend treats both the same way
    pub async fn authenticate(&self, request: &ProfilePayload) -> Result<AuthResponse> {
        let url = format!("{}/api/auth", self.base_url);

        debug!("POST {} username={}", url, request.username);
        let response = self.client.post(&url).json(request).send().await?;
        Self::decode(response).await
    }

    /// Replace the stored profile details
    pub async fn update_profile(&self, token: &str, request: &ProfilePayload) -> Result<MessageResponse> {
        let url = format!("{}/api/update", self.base_url);

        debug!("PUT {}", url);
        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(AccountError::AuthRequired { message });
            }
            return Err(AccountError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for AccountClient {
    fn default() -> Self {
        Self::new()
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Pull a human readable message out of an error body.
///
/// Auth routes answer with `message`, favorites routes with `error`.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToggleFavoriteRequest<'a> {
    movie_id: u64,
    title: &'a str,
}

/// Body for both `/api/auth` and `/api/update`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePayload {
    pub username: String,
    pub email: String,
    /// Sent as an empty string when the user has none
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFavoriteResponse {
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Added,
    Removed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoriteResponse {
    #[serde(default)]
    pub action: Option<FavoriteAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    #[serde(default)]
    pub favorites: Vec<FavoriteEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

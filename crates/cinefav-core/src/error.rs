use thiserror::Error;

/// All the ways a user action can go wrong in cinefav.
///
/// None of these are fatal to the process. Each one is scoped to the action
/// that triggered it, and `is_retryable` tells the caller whether offering a
/// "try again" makes sense.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Backend error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    BackendError { status: u16, message: Option<String> },

    #[error("Malformed response: {0}")]
    DecodeFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether repeating the same action could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NetworkFailure(_) | Error::DecodeFailure(_) => true,
            Error::BackendError { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }

    /// Text to show the user: the backend's own message when it sent one,
    /// the validation text for bad input, `fallback` for everything else.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::BackendError {
                message: Some(message),
                ..
            } => message.clone(),
            Error::Validation(message) => message.clone(),
            Error::Unauthenticated => "Please sign in and try again".to_string(),
            _ => fallback.to_string(),
        }
    }
}

impl From<cinefav_cache::CacheError> for Error {
    fn from(err: cinefav_cache::CacheError) -> Self {
        Error::StorageError(err.to_string())
    }
}

impl From<cinefav_api::TmdbError> for Error {
    fn from(err: cinefav_api::TmdbError) -> Self {
        use cinefav_api::TmdbError;

        match err {
            TmdbError::NotFound(id) => Error::NotFound(format!("movie {}", id)),
            TmdbError::ParseError(e) => Error::DecodeFailure(e.to_string()),
            TmdbError::NetworkError(e) if e.is_decode() => Error::DecodeFailure(e.to_string()),
            TmdbError::NetworkError(e) => Error::NetworkFailure(e.to_string()),
            TmdbError::RateLimitExceeded => Error::BackendError {
                status: 429,
                message: Some("Catalog rate limit exceeded".to_string()),
            },
            TmdbError::InvalidApiKey => {
                Error::ConfigError("catalog rejected the API key".to_string())
            }
            TmdbError::RequestFailed { status, .. } => Error::BackendError {
                status,
                message: None,
            },
        }
    }
}

impl From<cinefav_api::AccountError> for Error {
    fn from(err: cinefav_api::AccountError) -> Self {
        use cinefav_api::AccountError;

        match err {
            AccountError::AuthRequired { message } => Error::BackendError {
                status: 401,
                message,
            },
            AccountError::Status {
                status: 404,
                message,
            } => Error::NotFound(message.unwrap_or_else(|| "backend resource".to_string())),
            AccountError::Status { status, message } => Error::BackendError { status, message },
            AccountError::ParseError(e) => Error::DecodeFailure(e.to_string()),
            AccountError::NetworkError(e) if e.is_decode() => Error::DecodeFailure(e.to_string()),
            AccountError::NetworkError(e) => Error::NetworkFailure(e.to_string()),
        }
    }
}

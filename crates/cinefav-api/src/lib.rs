// HTTP clients for the movie catalog and the account backend
pub mod account;
pub mod retry;
pub mod tmdb;

// Re-export common types
pub use account::{
    AccountClient, AccountError, AuthResponse, FavoriteAction, FavoriteEntry, ProfilePayload,
};
pub use retry::{RetryConfig, Transient};
pub use tmdb::{DiscoverResponse, TmdbClient, TmdbError, TmdbMovie, TmdbMovieDetails};

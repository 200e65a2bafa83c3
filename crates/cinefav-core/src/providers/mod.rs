// Providers bridge the raw API clients with the service traits
pub mod account;
pub mod cached;
pub mod tmdb;

pub use account::HttpAccountBackend;
pub use cached::CachedCatalog;
pub use tmdb::TmdbCatalog;

// SQLite-backed persistence
// Credentials survive restarts here, and catalog lookups get a short-lived cache

pub mod cache;

pub use cache::{CacheError, CacheManager};

// Catalog paging, favorites sync and the credential lifecycle behind them
pub mod config;
pub mod credentials;
pub mod enrich;
pub mod error;
pub mod favorites;
pub mod models;
pub mod pager;
pub mod providers;
pub mod services;
pub mod session;

pub use config::Config;
pub use credentials::{CredentialStore, KeyValueStore, MemoryStore};
pub use enrich::DetailEnricher;
pub use error::Error;
pub use favorites::FavoritesEngine;
pub use pager::{CatalogPager, FetchOutcome, LoadPhase, PaginationState, SkipReason};
pub use services::{AccountBackend, CatalogService};
pub use session::AccountSession;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when the catalog has no overview for a movie
pub const OVERVIEW_PLACEHOLDER: &str = "No description available.";

/// Shown when a profile has no phone number
pub const PHONE_PLACEHOLDER: &str = "No phone number";

/// Poster used when a movie has none
pub const POSTER_PLACEHOLDER_URL: &str = "https://via.placeholder.com/500x750?text=No+Image";

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// A movie as listed by the catalog feed. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

impl CatalogItem {
    pub fn overview_or_placeholder(&self) -> &str {
        self.overview.as_deref().unwrap_or(OVERVIEW_PLACEHOLDER)
    }
}

/// One decoded page of the catalog feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    /// Always at least 1, even when the feed reports 0
    pub total_pages: u32,
}

/// Result of looking a single movie up by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDetails {
    pub id: u64,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

/// What the account backend stores per favorite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: u64,
    pub title: String,
}

/// Whether enrichment found catalog metadata for a favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enrichment {
    Complete,
    /// Catalog lookup failed; poster and overview are missing
    Partial,
}

/// A favorite joined with catalog metadata. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedFavorite {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub enrichment: Enrichment,
}

impl EnrichedFavorite {
    /// The bare record with no catalog data attached
    pub fn partial(record: &FavoriteRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            poster_path: None,
            overview: None,
            enrichment: Enrichment::Partial,
        }
    }

    pub fn joined(record: &FavoriteRecord, details: CatalogDetails) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            poster_path: details.poster_path,
            overview: details.overview,
            enrichment: Enrichment::Complete,
        }
    }

    pub fn overview_or_placeholder(&self) -> &str {
        self.overview.as_deref().unwrap_or(OVERVIEW_PLACEHOLDER)
    }
}

/// Who the user says they are
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Profile {
    pub fn phone_or_placeholder(&self) -> &str {
        self.phone.as_deref().unwrap_or(PHONE_PLACEHOLDER)
    }
}

/// Bearer token plus the profile it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub profile: Profile,
    pub saved_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: String, profile: Profile) -> Self {
        Self {
            token,
            profile,
            saved_at: Utc::now(),
        }
    }
}

/// What the backend says a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// The response named neither branch; treat membership as unknown
    Unconfirmed,
}

/// Screen-local favorite flag for one catalog item.
///
/// Only moves when the backend confirms which way a toggle went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteFlag {
    pub item_id: u64,
    pub title: String,
    pub is_favorite: bool,
}

impl FavoriteFlag {
    pub fn new(item_id: u64, title: impl Into<String>) -> Self {
        Self {
            item_id,
            title: title.into(),
            is_favorite: false,
        }
    }

    pub fn apply(&mut self, outcome: ToggleOutcome) {
        match outcome {
            ToggleOutcome::Added => self.is_favorite = true,
            ToggleOutcome::Removed => self.is_favorite = false,
            ToggleOutcome::Unconfirmed => {}
        }
    }
}

/// Full image URL for a poster path, or the placeholder image
pub fn poster_url(image_base_url: &str, poster_path: Option<&str>) -> String {
    match poster_path {
        Some(path) if !path.is_empty() => {
            format!("{}{}", image_base_url.trim_end_matches('/'), path)
        }
        _ => POSTER_PLACEHOLDER_URL.to_string(),
    }
}

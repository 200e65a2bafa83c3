use std::sync::Arc;

use anyhow::Context;
use cinefav_api::AccountClient;
use cinefav_cache::CacheManager;
use cinefav_core::{
    models::{poster_url, FavoriteFlag, ToggleOutcome},
    providers::{CachedCatalog, HttpAccountBackend, TmdbCatalog},
    session::{SIGN_IN_FALLBACK, UPDATE_FALLBACK},
    AccountSession, CatalogPager, Config, CredentialStore, FavoritesEngine, FetchOutcome,
    PaginationState,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cinefav")]
#[command(version, about = "Browse animated movies and keep your favorites in sync", long_about = None)]
struct Cli {
    /// TMDB API key (overrides config and environment)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Account backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List movies from the catalog
    Browse {
        /// How many pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show your favorites
    Favorites,
    /// Check whether a movie is a favorite
    Check {
        /// Catalog movie id
        id: u64,
    },
    /// Add or remove a favorite
    Toggle {
        /// Catalog movie id
        id: u64,
        /// Movie title
        title: String,
    },
    /// Sign up or sign in
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Update your profile details
    Update {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show the signed-in profile
    Whoami,
    /// Sign out on this device
    Logout,
}

type Catalog = Arc<CachedCatalog<TmdbCatalog>>;
type Backend = Arc<HttpAccountBackend>;

/// Everything the commands need, built once from config
struct App {
    config: Config,
    cache: Arc<CacheManager>,
    credentials: CredentialStore,
    backend: Backend,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let db_path = config.database_path()?;
        let cache = Arc::new(
            CacheManager::new(&db_path)
                .with_context(|| format!("opening database at {}", db_path.display()))?,
        );
        if let Err(e) = cache.purge_expired(config.cache.ttl()) {
            tracing::warn!("Could not purge expired catalog entries: {}", e);
        }

        let credentials = CredentialStore::new(cache.clone());
        let backend = Arc::new(HttpAccountBackend::new(AccountClient::with_base_url(
            config.backend.url.clone(),
        )));

        Ok(Self {
            config,
            cache,
            credentials,
            backend,
        })
    }

    fn catalog(&self) -> anyhow::Result<Catalog> {
        let tmdb = TmdbCatalog::from_config(&self.config.catalog)?;
        Ok(Arc::new(CachedCatalog::new(
            tmdb,
            self.cache.clone(),
            self.config.cache.ttl_hours,
        )))
    }

    fn favorites(&self) -> anyhow::Result<FavoritesEngine<Backend, Catalog>> {
        Ok(FavoritesEngine::new(
            self.backend.clone(),
            self.catalog()?,
            self.credentials.clone(),
        )
        .with_enrich_concurrency(self.config.favorites.enrich_concurrency))
    }

    /// Favorites engine for checks and toggles, which only talk to the
    /// backend and so work without a TMDB key
    fn membership(&self) -> FavoritesEngine<Backend, Option<Catalog>> {
        FavoritesEngine::new(self.backend.clone(), None, self.credentials.clone())
    }

    fn session(&self) -> AccountSession<Backend> {
        AccountSession::new(self.backend.clone(), self.credentials.clone())
            .keep_token_on_logout(self.config.auth.keep_token_on_logout)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinefav=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(key) = cli.api_key {
        config.catalog.api_key = Some(key);
    }
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    let app = App::new(config)?;

    match command {
        Commands::Browse { pages } => browse(&app, pages, cli.json).await,
        Commands::Favorites => list_favorites(&app, cli.json).await,
        Commands::Check { id } => {
            let is_favorite = app.membership().is_favorite(id).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "is_favorite": is_favorite }));
            } else if is_favorite {
                println!("♥ {} is in your favorites", id);
            } else {
                println!("♡ {} is not in your favorites", id);
            }
            Ok(())
        }
        Commands::Toggle { id, title } => toggle(&app, id, title).await,
        Commands::Login {
            username,
            email,
            phone,
        } => {
            let message = app
                .session()
                .sign_in(&username, &email, phone.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(SIGN_IN_FALLBACK)))?;
            println!("{}", message);
            Ok(())
        }
        Commands::Update {
            username,
            email,
            phone,
        } => {
            let message = app
                .session()
                .update_profile(&username, &email, phone.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message(UPDATE_FALLBACK)))?;
            println!("{}", message);
            Ok(())
        }
        Commands::Whoami => {
            match app.session().current_profile() {
                Some(profile) => {
                    println!("{}", profile.username);
                    println!("{}", profile.email);
                    println!("{}", profile.phone_or_placeholder());
                }
                None => println!("Not signed in. Try `cinefav login`"),
            }
            Ok(())
        }
        Commands::Logout => {
            app.session().logout()?;
            println!("Logged out");
            Ok(())
        }
    }
}

async fn browse(app: &App, pages: u32, json: bool) -> anyhow::Result<()> {
    let pager = CatalogPager::with_excluded_titles(
        app.catalog()?,
        app.config.catalog.excluded_titles.clone(),
    );
    let mut state = PaginationState::new();

    pager
        .refresh(&mut state)
        .await
        .context("Failed to load movies")?;

    for _ in 1..pages.max(1) {
        match pager.load_more(&mut state).await {
            Ok(FetchOutcome::Loaded { .. }) => {}
            Ok(_) => break,
            Err(e) => {
                // Keep what we already have; the user can ask again
                tracing::warn!("Stopped loading more: {}", e);
                break;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(state.items())?);
        return Ok(());
    }

    for item in state.items() {
        println!("{:>8}  {}", item.id, item.title);
        println!(
            "          {}",
            poster_url(&app.config.catalog.image_base_url, item.poster_path.as_deref())
        );
    }
    println!(
        "\npage {}/{}{}",
        state.current_page(),
        state.total_pages(),
        if state.has_more() { " - more available" } else { "" }
    );
    Ok(())
}

async fn list_favorites(app: &App, json: bool) -> anyhow::Result<()> {
    let favorites = app
        .favorites()?
        .list_favorites()
        .await
        .map_err(|e| {
            anyhow::anyhow!(e.user_message("Failed to load favorites. Try again later."))
        })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&favorites)?);
        return Ok(());
    }

    if favorites.is_empty() {
        println!("No favorites added yet.");
        return Ok(());
    }

    for favorite in &favorites {
        println!("{:>8}  {}", favorite.id, favorite.title);
        println!("          {}", favorite.overview_or_placeholder());
    }
    Ok(())
}

async fn toggle(app: &App, id: u64, title: String) -> anyhow::Result<()> {
    let engine = app.membership();
    let mut flag = FavoriteFlag::new(id, title);

    let outcome = engine.sync_flag(&mut flag).await.map_err(|e| {
        anyhow::anyhow!(e.user_message("Failed to update favorite status. Try again later"))
    })?;

    match outcome {
        ToggleOutcome::Added => println!("♥ Added {} to favorites", flag.title),
        ToggleOutcome::Removed => println!("♡ Removed {} from favorites", flag.title),
        ToggleOutcome::Unconfirmed => {
            println!("Backend did not confirm the change; favorite status unknown")
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinefav_core::Error;
    use tempfile::TempDir;

    fn app_without_api_key(dir: &TempDir) -> App {
        let mut config = Config::default();
        config.cache.db_path = Some(dir.path().join("cinefav.db"));
        App::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_check_and_toggle_work_without_api_key() {
        let dir = TempDir::new().unwrap();
        let app = app_without_api_key(&dir);

        assert!(app.catalog().is_err());

        // Signed out: answered locally, no request made
        assert!(!app.membership().is_favorite(42).await.unwrap());

        let mut flag = FavoriteFlag::new(42, "Coco");
        let err = app.membership().sync_flag(&mut flag).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[test]
    fn test_listing_favorites_still_needs_api_key() {
        let dir = TempDir::new().unwrap();
        let app = app_without_api_key(&dir);

        let err = app.favorites().err().unwrap();
        assert!(err.to_string().contains("TMDB API key"));
    }

    #[test]
    fn test_startup_survives_huge_ttl() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.db_path = Some(dir.path().join("cinefav.db"));
        config.cache.ttl_hours = u64::MAX;

        assert!(App::new(config).is_ok());
    }
}

//! Ingestion configuration
//!
//! Everything comes from `TRENDS_*` environment variables (a `.env` file is
//! honoured by the binary). Each section has defaults and `with_*` builders so
//! tests can point adapters at mock servers.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use trends_common::{Result, TrendsError};

use crate::family::DestinationTables;

/// Maximum number of ids the catalogue accepts in one artists call
pub const PROVIDER_ARTIST_BATCH_LIMIT: usize = 50;

/// Default playlists followed by a run (`name=id` pairs)
pub const DEFAULT_PLAYLISTS: &str = "global=37i9dQZEVXbMDoHDwVN2tF,usa=37i9dQZEVXbLRQDuF5jeBp";

/// Chart page configuration
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Billboard site root, ending in '/'
    pub billboard_url: String,
    /// DJ Mag site root, ending in '/'
    pub djmag_url: String,
    /// Per request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            billboard_url: "https://www.billboard.com/".to_string(),
            djmag_url: "https://djmag.com/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ChartConfig {
    pub fn with_billboard_url(mut self, url: impl Into<String>) -> Self {
        self.billboard_url = with_trailing_slash(url.into());
        self
    }

    pub fn with_djmag_url(mut self, url: impl Into<String>) -> Self {
        self.djmag_url = with_trailing_slash(url.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A followed catalogue playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    /// Dataset detail used in staged file names
    pub name: String,
    pub id: String,
}

/// Catalogue API configuration
#[derive(Debug, Clone)]
pub struct CatalogueConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Accounts service root (token endpoint lives at `/api/token`)
    pub accounts_url: String,
    /// Web API root (e.g. `https://api.spotify.com/v1`)
    pub api_url: String,
    pub playlists: Vec<PlaylistRef>,
    /// Ids per artists call, capped at the provider limit
    pub artist_batch_size: usize,
    /// Artist chunks in flight at once (1 = strictly sequential)
    pub artist_fetch_concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
            playlists: parse_playlists(DEFAULT_PLAYLISTS).unwrap_or_default(),
            artist_batch_size: PROVIDER_ARTIST_BATCH_LIMIT,
            artist_fetch_concurrency: 1,
            timeout_secs: 30,
        }
    }
}

impl CatalogueConfig {
    pub fn with_credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = without_trailing_slash(url.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = without_trailing_slash(url.into());
        self
    }

    pub fn with_playlist(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.playlists.push(PlaylistRef {
            name: name.into(),
            id: id.into(),
        });
        self
    }

    pub fn with_playlists(mut self, playlists: Vec<PlaylistRef>) -> Self {
        self.playlists = playlists;
        self
    }

    pub fn with_artist_batch_size(mut self, size: usize) -> Self {
        self.artist_batch_size = size;
        self
    }

    pub fn with_artist_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.artist_fetch_concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(TrendsError::config(
                "TRENDS_SPOTIFY_CLIENT_ID and TRENDS_SPOTIFY_CLIENT_SECRET must be set",
            ));
        }

        if self.artist_batch_size == 0 || self.artist_batch_size > PROVIDER_ARTIST_BATCH_LIMIT {
            return Err(TrendsError::config(format!(
                "TRENDS_ARTIST_BATCH_SIZE must be between 1 and {}",
                PROVIDER_ARTIST_BATCH_LIMIT
            )));
        }

        if self.artist_fetch_concurrency == 0 {
            return Err(TrendsError::config("TRENDS_ARTIST_FETCH_CONCURRENCY must be greater than 0"));
        }

        if self.timeout_secs == 0 {
            return Err(TrendsError::config("TRENDS_HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        ensure_unique_playlist_names(&self.playlists)
    }
}

/// Staging directory configuration
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub dir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./storage_music_trends"),
        }
    }
}

/// Relational store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `sqlite:` or `postgres://` connection URL
    pub database_url: String,
    pub max_connections: u32,
    pub destinations: DestinationTables,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://music_trends.db?mode=rwc".to_string(),
            max_connections: 5,
            destinations: DestinationTables::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_destinations(mut self, destinations: DestinationTables) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(TrendsError::config("TRENDS_DATABASE_URL cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(TrendsError::config("TRENDS_DB_MAX_CONNECTIONS must be greater than 0"));
        }
        self.destinations.validate()
    }
}

/// Main ingestion configuration
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub charts: ChartConfig,
    pub catalogue: CatalogueConfig,
    pub staging: StagingConfig,
    pub store: StoreConfig,
}

impl IngestConfig {
    /// Load configuration from `TRENDS_*` environment variables
    ///
    /// Catalogue credentials are not required here; `validate_for_run`
    /// checks them before a full pipeline run.
    pub fn from_env() -> Result<Self> {
        let timeout_secs = env_parse("TRENDS_HTTP_TIMEOUT_SECS", 30u64)?;

        let charts = ChartConfig::default()
            .with_billboard_url(env_or("TRENDS_BILLBOARD_URL", "https://www.billboard.com/"))
            .with_djmag_url(env_or("TRENDS_DJMAG_URL", "https://djmag.com/"))
            .with_timeout(timeout_secs);

        let catalogue = CatalogueConfig::default()
            .with_credentials(
                env_or("TRENDS_SPOTIFY_CLIENT_ID", ""),
                env_or("TRENDS_SPOTIFY_CLIENT_SECRET", ""),
            )
            .with_accounts_url(env_or("TRENDS_SPOTIFY_ACCOUNTS_URL", "https://accounts.spotify.com"))
            .with_api_url(env_or("TRENDS_SPOTIFY_API_URL", "https://api.spotify.com/v1"))
            .with_playlists(parse_playlists(&env_or("TRENDS_PLAYLISTS", DEFAULT_PLAYLISTS))?)
            .with_artist_batch_size(env_parse("TRENDS_ARTIST_BATCH_SIZE", PROVIDER_ARTIST_BATCH_LIMIT)?)
            .with_artist_fetch_concurrency(env_parse("TRENDS_ARTIST_FETCH_CONCURRENCY", 1usize)?)
            .with_timeout(timeout_secs);

        let staging = StagingConfig {
            dir: PathBuf::from(env_or("TRENDS_STAGING_DIR", "./storage_music_trends")),
        };

        let store = StoreConfig::default()
            .with_database_url(env_or("TRENDS_DATABASE_URL", "sqlite://music_trends.db?mode=rwc"))
            .with_max_connections(env_parse("TRENDS_DB_MAX_CONNECTIONS", 5u32)?);

        let config = Self {
            charts,
            catalogue,
            staging,
            store,
        };
        config.store.validate()?;

        Ok(config)
    }

    /// Everything a full acquisition run needs, credentials included
    pub fn validate_for_run(&self) -> Result<()> {
        if self.charts.timeout_secs == 0 {
            return Err(TrendsError::config("TRENDS_HTTP_TIMEOUT_SECS must be greater than 0"));
        }
        self.catalogue.validate()?;
        self.store.validate()
    }
}

/// Parse `name=id,name=id` playlist lists
pub fn parse_playlists(raw: &str) -> Result<Vec<PlaylistRef>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, id) = pair.split_once('=').ok_or_else(|| {
                TrendsError::config(format!("Invalid playlist entry '{}', expected name=id", pair))
            })?;
            let (name, id) = (name.trim(), id.trim());

            if name.is_empty() || id.is_empty() {
                return Err(TrendsError::config(format!("Invalid playlist entry '{}'", pair)));
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(TrendsError::config(format!(
                    "Playlist name '{}' may only contain letters, digits, '-' and '_'",
                    name
                )));
            }

            Ok(PlaylistRef {
                name: name.to_string(),
                id: id.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|playlists| {
            ensure_unique_playlist_names(&playlists)?;
            Ok(playlists)
        })
}

/// Playlist names become staged file names, so two entries may not share one
fn ensure_unique_playlist_names(playlists: &[PlaylistRef]) -> Result<()> {
    let mut seen = HashSet::new();
    for playlist in playlists {
        if !seen.insert(playlist.name.as_str()) {
            return Err(TrendsError::config(format!(
                "Playlist name '{}' is listed more than once",
                playlist.name
            )));
        }
    }
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TrendsError::config(format!("{} has an invalid value: '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{}/", url)
    }
}

fn without_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

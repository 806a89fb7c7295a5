//! Spotify Web API client
//!
//! Client-credentials flow: `authenticate` trades the app credentials for a
//! bearer token and returns a `SpotifySession` that performs every catalogue
//! call with it.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use trends_common::{Result, TrendsError};

use super::dto;
use super::CatalogueApi;
use crate::config::CatalogueConfig;
use crate::models::{ranked, PlaylistTrack, RawArtist};

const SOURCE_NAME: &str = "spotify";

const USER_AGENT: &str = concat!("trends-ingest/", env!("CARGO_PKG_VERSION"));

/// Non-empty bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TrendsError::authentication_failed("token endpoint returned an empty access token"));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Unauthenticated client holding the app credentials
pub struct SpotifyClient {
    http: Client,
    config: CatalogueConfig,
}

impl SpotifyClient {
    pub fn new(config: CatalogueConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrendsError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Exchange client credentials for a bearer token
    pub async fn authenticate(&self) -> Result<SpotifySession> {
        let url = format!("{}/api/token", self.config.accounts_url);
        info!("Requesting catalogue access token");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| TrendsError::source_unavailable(SOURCE_NAME, format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendsError::authentication_failed(format!(
                "token endpoint returned HTTP {}",
                status
            )));
        }

        let body: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| TrendsError::authentication_failed(format!("Undecodable token response: {}", e)))?;

        let token = BearerToken::new(body.access_token.unwrap_or_default())?;
        debug!(token_type = ?body.token_type, expires_in = ?body.expires_in, "Access token granted");

        Ok(SpotifySession {
            http: self.http.clone(),
            api_url: self.config.api_url.clone(),
            token,
        })
    }
}

/// Authenticated catalogue access
pub struct SpotifySession {
    http: Client,
    api_url: String,
    token: BearerToken,
}

impl SpotifySession {
    /// Session with an externally obtained token
    pub fn new(http: Client, api_url: impl Into<String>, token: BearerToken) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| TrendsError::source_unavailable(SOURCE_NAME, format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TrendsError::source_unavailable(
                SOURCE_NAME,
                format!("{} rejected the access token", url),
            ));
        }
        if !status.is_success() {
            return Err(TrendsError::source_unavailable(
                SOURCE_NAME,
                format!("{} returned HTTP {}", url, status),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TrendsError::source_unavailable(SOURCE_NAME, format!("Unexpected response from {}: {}", url, e)))
    }
}

#[async_trait]
impl CatalogueApi for SpotifySession {
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistTrack>> {
        let url = format!("{}/playlists/{}", self.api_url, playlist_id);
        let playlist: dto::PlaylistResponse = self.get_json(&url, &[]).await?;

        let mut items = playlist.tracks.items;
        let mut next = playlist.tracks.next;
        while let Some(page_url) = next {
            let page: dto::TracksPage = self.get_json(&page_url, &[]).await?;
            items.extend(page.items);
            next = page.next;
        }

        let total = items.len();
        let present: Vec<dto::Track> = items.into_iter().filter_map(|item| item.track).collect();
        if present.len() < total {
            warn!(
                playlist_id,
                dropped = total - present.len(),
                "Playlist contains unavailable tracks"
            );
        }

        let tracks: Vec<PlaylistTrack> = ranked(present)
            .map(|(position, track)| to_playlist_track(position, track, playlist_id))
            .collect();

        info!(
            "Fetched playlist {} ({}): {} tracks",
            playlist.name.as_deref().unwrap_or("unnamed"),
            playlist_id,
            tracks.len()
        );

        Ok(tracks)
    }

    async fn fetch_artist_batch(&self, ids: &[String]) -> Result<Vec<RawArtist>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/artists", self.api_url);
        let response: dto::ArtistsResponse = self.get_json(&url, &[("ids", ids.join(","))]).await?;

        let requested = ids.len();
        let artists: Vec<RawArtist> = response.artists.into_iter().flatten().collect();
        if artists.len() < requested {
            warn!(
                requested,
                returned = artists.len(),
                "Catalogue did not know every requested artist id"
            );
        }

        Ok(artists)
    }
}

fn to_playlist_track(position: u32, track: dto::Track, playlist_id: &str) -> PlaylistTrack {
    let (all_artists, all_artist_ids): (Vec<String>, Vec<String>) = track
        .artists
        .into_iter()
        .map(|artist| (artist.name, artist.id.unwrap_or_default()))
        .unzip();

    PlaylistTrack {
        position,
        song_name: track.name,
        main_artist: all_artists.first().cloned().unwrap_or_default(),
        main_artist_id: all_artist_ids.first().cloned().unwrap_or_default(),
        all_artists,
        all_artist_ids,
        release_date: track.album.and_then(|a| a.release_date).unwrap_or_default(),
        duration_ms: track.duration_ms,
        popularity: track.popularity,
        playlist_id: playlist_id.to_string(),
    }
}

//! Data transfer objects for the Spotify Web API
//!
//! These mirror the JSON shapes and are only used for deserialization. Fields
//! the pipeline does not read are left out.

use serde::Deserialize;

use crate::models::RawArtist;

/// Client-credentials token response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `GET /playlists/{id}`
#[derive(Debug, Deserialize)]
pub struct PlaylistResponse {
    #[serde(default)]
    pub name: Option<String>,
    pub tracks: TracksPage,
}

/// One page of playlist items
#[derive(Debug, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    /// Absolute URL of the next page
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    /// Null for removed or local-only tracks
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: u32,
}

/// Simplified artist object embedded in tracks
#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub release_date: Option<String>,
}

/// `GET /artists?ids=...`; unknown ids come back as `null`
#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<RawArtist>>,
}

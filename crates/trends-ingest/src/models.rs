// Domain records produced by the source adapters and the artist resolver

use serde::{Deserialize, Serialize};

/// Number of genre slots every artist record carries
pub const GENRE_SLOTS: usize = 3;

/// One ranked item from a chart or ranking provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEntry {
    /// 1-indexed rank, unique within one provider result
    pub position: u32,
    /// Song title (absent for performer rankings)
    pub title: Option<String>,
    pub artist_name: String,
}

/// One track inside a catalogue playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    /// 1-indexed position within the playlist
    pub position: u32,
    pub song_name: String,
    pub main_artist: String,
    pub main_artist_id: String,
    pub all_artists: Vec<String>,
    /// Ordered artist ids, the first one is the main artist
    pub all_artist_ids: Vec<String>,
    pub release_date: String,
    pub duration_ms: u64,
    /// Provider popularity score (0..=100)
    pub popularity: u32,
    pub playlist_id: String,
}

/// Artist as returned by the catalogue, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Normalized catalogue artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub genres: [String; GENRE_SLOTS],
}

impl From<RawArtist> for Artist {
    fn from(raw: RawArtist) -> Self {
        let mut slots = raw.genres.into_iter().chain(std::iter::repeat(String::new()));
        let genres = std::array::from_fn(|_| slots.next().unwrap_or_default());

        Artist {
            artist_id: raw.id,
            name: raw.name,
            genres,
        }
    }
}

/// Pair items with contiguous 1-indexed positions, preserving input order
pub fn ranked<T>(items: impl IntoIterator<Item = T>) -> impl Iterator<Item = (u32, T)> {
    (1u32..).zip(items)
}

// In-memory tabular datasets flowing from acquisition to staging

use crate::family::Family;
use crate::models::{Artist, ChartEntry, PlaylistTrack};

/// Separator used when a list of names or ids is flattened into one cell
pub const LIST_SEPARATOR: &str = "*";

/// Row of the playlist index dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPlaylist {
    pub name: String,
    pub playlist_id: String,
    pub track_count: usize,
}

/// A named table of string cells
///
/// `(family, detail)` identifies the dataset within one run and becomes the
/// staged file name together with the run timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub family: Family,
    pub detail: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Empty dataset with the family's record columns
    pub fn new(family: Family, detail: impl Into<String>) -> Self {
        Self {
            family,
            detail: detail.into(),
            columns: family.spec().columns.iter().map(|c| c.name.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// Values of one column, top to bottom
    pub fn column_values(&self, column: &str) -> Vec<&str> {
        match self.column_index(column) {
            Some(index) => self.rows.iter().filter_map(|r| r.get(index)).map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Build a chart dataset (`billboard` carries titles, `dj_mag` does not)
    pub fn from_chart(family: Family, detail: impl Into<String>, entries: &[ChartEntry]) -> Self {
        let mut dataset = Self::new(family, detail);
        let with_title = dataset.column_index("title").is_some();

        dataset.rows = entries
            .iter()
            .map(|entry| {
                let mut row = vec![entry.position.to_string()];
                if with_title {
                    row.push(entry.title.clone().unwrap_or_default());
                }
                row.push(entry.artist_name.clone());
                row
            })
            .collect();

        dataset
    }

    /// Build one playlist's track dataset
    pub fn from_tracks(detail: impl Into<String>, tracks: &[PlaylistTrack]) -> Self {
        let mut dataset = Self::new(Family::Spotify, detail);

        dataset.rows = tracks
            .iter()
            .map(|track| {
                vec![
                    track.position.to_string(),
                    track.song_name.clone(),
                    track.main_artist.clone(),
                    track.main_artist_id.clone(),
                    track.all_artists.join(LIST_SEPARATOR),
                    track.all_artist_ids.join(LIST_SEPARATOR),
                    track.release_date.clone(),
                    track.duration_ms.to_string(),
                    track.popularity.to_string(),
                    track.playlist_id.clone(),
                ]
            })
            .collect();

        dataset
    }

    /// Build the artist catalogue dataset
    pub fn from_artists(artists: &[Artist]) -> Self {
        let mut dataset = Self::new(Family::Artists, "catalogue");

        dataset.rows = artists
            .iter()
            .map(|artist| {
                let mut row = vec![artist.artist_id.clone(), artist.name.clone()];
                row.extend(artist.genres.iter().cloned());
                row
            })
            .collect();

        dataset
    }

    /// Build the index of playlists fetched in this run
    pub fn from_playlists(playlists: &[TrackedPlaylist]) -> Self {
        let mut dataset = Self::new(Family::Playlists, "tracked");

        dataset.rows = playlists
            .iter()
            .map(|p| vec![p.name.clone(), p.playlist_id.clone(), p.track_count.to_string()])
            .collect();

        dataset
    }
}

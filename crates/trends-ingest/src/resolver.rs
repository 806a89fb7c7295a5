// Incremental artist resolution
//
// Only artists never seen before are fetched from the catalogue: the run's
// candidate ids are diffed against the ids already persisted, and the rest
// are requested in provider-sized batches.

use std::collections::HashSet;
use tracing::info;
use trends_common::Result;

use crate::models::{Artist, PlaylistTrack};
use crate::sources::spotify::{fetch_artists_by_ids, CatalogueApi};
use crate::store::KnownArtists;

/// Distinct artist ids of the tracks, in first-seen order
pub fn candidate_artist_ids(tracks: &[PlaylistTrack]) -> Vec<String> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .flat_map(|track| track.all_artist_ids.iter())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Candidates missing from `known`, keeping candidate order
pub fn new_artist_ids(candidates: Vec<String>, known: &HashSet<String>) -> Vec<String> {
    candidates.into_iter().filter(|id| !known.contains(id)).collect()
}

/// Resolves the artists a run has not persisted yet
pub struct ArtistResolver<'a> {
    known: &'a dyn KnownArtists,
    catalogue: &'a dyn CatalogueApi,
    batch_size: usize,
    concurrency: usize,
}

impl<'a> ArtistResolver<'a> {
    pub fn new(known: &'a dyn KnownArtists, catalogue: &'a dyn CatalogueApi) -> Self {
        Self {
            known,
            catalogue,
            batch_size: crate::config::PROVIDER_ARTIST_BATCH_LIMIT,
            concurrency: 1,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Fetch and normalize every artist of `tracks` the store does not know
    ///
    /// A failed store lookup aborts with `StoreUnavailable`; it is never
    /// read as "no artists known".
    pub async fn resolve(&self, tracks: &[PlaylistTrack]) -> Result<Vec<Artist>> {
        let candidates = candidate_artist_ids(tracks);
        let known: HashSet<String> = self.known.known_artist_ids().await?.into_iter().collect();

        let total = candidates.len();
        let new_ids = new_artist_ids(candidates, &known);
        info!(
            candidates = total,
            known = total - new_ids.len(),
            new = new_ids.len(),
            "Resolved artist candidates"
        );

        if new_ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw = fetch_artists_by_ids(self.catalogue, &new_ids, self.batch_size, self.concurrency).await?;

        Ok(raw.into_iter().map(Artist::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArtist;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use trends_common::TrendsError;

    struct FixedStore(std::result::Result<Vec<String>, String>);

    #[async_trait]
    impl KnownArtists for FixedStore {
        async fn known_artist_ids(&self) -> Result<Vec<String>> {
            self.0.clone().map_err(TrendsError::store_unavailable)
        }
    }

    #[derive(Default)]
    struct MockCatalogue {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CatalogueApi for MockCatalogue {
        async fn fetch_playlist(&self, _playlist_id: &str) -> Result<Vec<PlaylistTrack>> {
            Ok(Vec::new())
        }

        async fn fetch_artist_batch(&self, ids: &[String]) -> Result<Vec<RawArtist>> {
            self.batches.lock().unwrap().push(ids.to_vec());
            Ok(ids
                .iter()
                .map(|id| RawArtist {
                    id: id.clone(),
                    name: format!("Artist {}", id),
                    genres: vec!["Pop".to_string()],
                })
                .collect())
        }
    }

    fn track(ids: &[&str]) -> PlaylistTrack {
        PlaylistTrack {
            position: 1,
            song_name: "Song".to_string(),
            main_artist: "Main".to_string(),
            main_artist_id: ids.first().map(|s| s.to_string()).unwrap_or_default(),
            all_artists: ids.iter().map(|_| "x".to_string()).collect(),
            all_artist_ids: ids.iter().map(|s| s.to_string()).collect(),
            release_date: String::new(),
            duration_ms: 0,
            popularity: 0,
            playlist_id: "pl".to_string(),
        }
    }

    #[test]
    fn test_candidates_first_seen_order() {
        let tracks = vec![track(&["B", "A"]), track(&["A", "C", ""]), track(&["B"])];
        assert_eq!(candidate_artist_ids(&tracks), vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_only_unknown_artists_are_fetched() {
        let store = FixedStore(Ok(vec!["A1".to_string()]));
        let catalogue = MockCatalogue::default();
        let resolver = ArtistResolver::new(&store, &catalogue);

        let artists = resolver
            .resolve(&[track(&["A1"]), track(&["A2", "A1"])])
            .await
            .unwrap();

        assert_eq!(*catalogue.batches.lock().unwrap(), vec![vec!["A2".to_string()]]);
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].artist_id, "A2");
        assert_eq!(artists[0].genres, ["Pop".to_string(), String::new(), String::new()]);
    }

    #[tokio::test]
    async fn test_everything_known_makes_no_call() {
        let store = FixedStore(Ok(vec!["A1".to_string(), "A2".to_string()]));
        let catalogue = MockCatalogue::default();

        let artists = ArtistResolver::new(&store, &catalogue)
            .resolve(&[track(&["A1", "A2"])])
            .await
            .unwrap();

        assert!(artists.is_empty());
        assert!(catalogue.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts() {
        let store = FixedStore(Err("connection refused".to_string()));
        let catalogue = MockCatalogue::default();

        let err = ArtistResolver::new(&store, &catalogue)
            .resolve(&[track(&["A1"])])
            .await
            .unwrap_err();

        assert!(matches!(err, TrendsError::StoreUnavailable(_)));
        assert!(catalogue.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_known_ids_never_in_outgoing_batches() {
        let known: Vec<String> = (0..30).map(|i| format!("K{}", i)).collect();
        let store = FixedStore(Ok(known.clone()));
        let catalogue = MockCatalogue::default();

        let mut ids: Vec<String> = (0..70).map(|i| format!("N{}", i)).collect();
        ids.extend(known.iter().cloned());
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let artists = ArtistResolver::new(&store, &catalogue)
            .resolve(&[track(&refs)])
            .await
            .unwrap();

        let batches = catalogue.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().flatten().all(|id| id.starts_with('N')));
        assert_eq!(artists.len(), 70);
    }
}

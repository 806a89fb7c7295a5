//! Spotify catalogue source
//!
//! - `client`: token exchange and authenticated calls
//! - `dto`: JSON response shapes
//!
//! `CatalogueApi` is the seam the resolver and the pipeline depend on, so
//! they can run against a mock catalogue in tests.

pub mod client;
pub mod dto;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;
use trends_common::Result;

use crate::config::PROVIDER_ARTIST_BATCH_LIMIT;
use crate::models::{PlaylistTrack, RawArtist};

pub use client::{BearerToken, SpotifyClient, SpotifySession};

/// Authenticated catalogue operations
#[async_trait]
pub trait CatalogueApi: Send + Sync {
    /// Tracks of one playlist, positions 1..N in playlist order
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistTrack>>;

    /// One artists call for at most the provider limit of ids
    async fn fetch_artist_batch(&self, ids: &[String]) -> Result<Vec<RawArtist>>;
}

/// Produces an authenticated catalogue session
#[async_trait]
pub trait CatalogueConnector: Send + Sync {
    /// Fails with `AuthenticationFailed` before any catalogue call is made
    async fn connect(&self) -> Result<Box<dyn CatalogueApi>>;
}

#[async_trait]
impl CatalogueConnector for SpotifyClient {
    async fn connect(&self) -> Result<Box<dyn CatalogueApi>> {
        let session = self.authenticate().await?;
        Ok(Box::new(session))
    }
}

/// Fetch artists in consecutive chunks of at most `batch_size` ids
///
/// Up to `concurrency` chunks are in flight at once, but results are always
/// concatenated in chunk order. The first failing chunk fails the whole
/// fetch.
pub async fn fetch_artists_by_ids<A>(
    api: &A,
    ids: &[String],
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<RawArtist>>
where
    A: CatalogueApi + ?Sized,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.clamp(1, PROVIDER_ARTIST_BATCH_LIMIT);
    let total_chunks = ids.len().div_ceil(batch_size);

    let batches: Vec<Vec<RawArtist>> = stream::iter(ids.chunks(batch_size).enumerate())
        .map(|(chunk_idx, chunk)| async move {
            info!(
                "Fetching artists chunk {} / {} ({} ids)",
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );
            api.fetch_artist_batch(chunk).await
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

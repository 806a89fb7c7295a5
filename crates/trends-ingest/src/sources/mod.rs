//! External data sources
//!
//! - `billboard` and `djmag`: ranked lists scraped from chart pages
//! - `spotify`: catalogue API (playlists and artists)
//!
//! Chart adapters share `HtmlFetcher` and implement `ChartSource`, so the
//! pipeline can treat them uniformly and tests can swap in fixed lists.

pub mod billboard;
pub mod djmag;
pub mod html;
pub mod spotify;

use async_trait::async_trait;
use trends_common::Result;

use crate::family::Family;
use crate::models::ChartEntry;

pub use billboard::BillboardChart;
pub use djmag::DjMagRanking;
pub use html::HtmlFetcher;

/// A provider of one ranked list
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Family of the dataset this source produces
    fn family(&self) -> Family;

    /// Dataset detail (`hot_100`, `top100djs`)
    fn detail(&self) -> &str;

    /// Fetch the list in document order, positions 1..N
    async fn fetch_ranked_list(&self) -> Result<Vec<ChartEntry>>;
}

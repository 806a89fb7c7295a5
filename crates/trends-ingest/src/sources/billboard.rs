// Billboard Hot 100 chart page

use async_trait::async_trait;
use scraper::Html;
use tracing::info;
use trends_common::{Result, TrendsError};

use super::html::{select_texts, HtmlFetcher};
use super::ChartSource;
use crate::config::ChartConfig;
use crate::family::Family;
use crate::models::{ranked, ChartEntry};

const SOURCE_NAME: &str = "billboard";
const CHART_PATH: &str = "charts/hot-100";
const TITLE_SELECTOR: &str = "span.chart-element__information__song";
const ARTIST_SELECTOR: &str = "span.chart-element__information__artist";

/// Billboard Hot 100
pub struct BillboardChart {
    fetcher: HtmlFetcher,
    url: String,
}

impl BillboardChart {
    pub fn new(config: &ChartConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HtmlFetcher::new(config)?,
            url: format!("{}{}", config.billboard_url, CHART_PATH),
        })
    }

    /// Extract `(title, artist)` pairs by index
    pub fn parse(html: &str) -> Result<Vec<ChartEntry>> {
        let document = Html::parse_document(html);
        let titles = select_texts(SOURCE_NAME, &document, TITLE_SELECTOR)?;
        let artists = select_texts(SOURCE_NAME, &document, ARTIST_SELECTOR)?;

        if titles.is_empty() {
            return Err(TrendsError::source_unavailable(
                SOURCE_NAME,
                "chart markup not found (no song nodes)",
            ));
        }
        if titles.len() != artists.len() {
            return Err(TrendsError::source_unavailable(
                SOURCE_NAME,
                format!("{} titles but {} artists on the chart page", titles.len(), artists.len()),
            ));
        }

        Ok(ranked(titles.into_iter().zip(artists))
            .map(|(position, (title, artist_name))| ChartEntry {
                position,
                title: Some(title),
                artist_name,
            })
            .collect())
    }
}

#[async_trait]
impl ChartSource for BillboardChart {
    fn family(&self) -> Family {
        Family::Billboard
    }

    fn detail(&self) -> &str {
        "hot_100"
    }

    async fn fetch_ranked_list(&self) -> Result<Vec<ChartEntry>> {
        let body = self.fetcher.fetch(SOURCE_NAME, &self.url).await?;
        let entries = Self::parse(&body)?;
        info!("Parsed {} Billboard entries", entries.len());
        Ok(entries)
    }
}

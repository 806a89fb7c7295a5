// DJ Mag Top 100 DJs ranking page

use async_trait::async_trait;
use scraper::Html;
use tracing::info;
use trends_common::{Result, TrendsError};

use super::html::{element_text, selector, HtmlFetcher};
use super::ChartSource;
use crate::config::ChartConfig;
use crate::family::Family;
use crate::models::{ranked, ChartEntry};

const SOURCE_NAME: &str = "dj_mag";
const RANKING_PATH: &str = "top100djs";

/// DJ Mag Top 100 DJs
pub struct DjMagRanking {
    fetcher: HtmlFetcher,
    url: String,
}

impl DjMagRanking {
    pub fn new(config: &ChartConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HtmlFetcher::new(config)?,
            url: format!("{}{}", config.djmag_url, RANKING_PATH),
        })
    }

    /// First link text inside every `div.top100dj-name`
    pub fn parse(html: &str) -> Result<Vec<ChartEntry>> {
        let document = Html::parse_document(html);
        let name_block = selector(SOURCE_NAME, "div.top100dj-name")?;
        let link = selector(SOURCE_NAME, "a")?;

        // a block without a link would shift every later rank
        let names = document
            .select(&name_block)
            .enumerate()
            .map(|(idx, block)| {
                block.select(&link).next().map(element_text).ok_or_else(|| {
                    TrendsError::source_unavailable(
                        SOURCE_NAME,
                        format!("DJ name node {} has no link", idx + 1),
                    )
                })
            })
            .collect::<Result<Vec<String>>>()?;

        if names.is_empty() {
            return Err(TrendsError::source_unavailable(
                SOURCE_NAME,
                "ranking markup not found (no DJ name nodes)",
            ));
        }

        Ok(ranked(names)
            .map(|(position, artist_name)| ChartEntry {
                position,
                title: None,
                artist_name,
            })
            .collect())
    }
}

#[async_trait]
impl ChartSource for DjMagRanking {
    fn family(&self) -> Family {
        Family::DjMag
    }

    fn detail(&self) -> &str {
        "top100djs"
    }

    async fn fetch_ranked_list(&self) -> Result<Vec<ChartEntry>> {
        let body = self.fetcher.fetch(SOURCE_NAME, &self.url).await?;
        let entries = Self::parse(&body)?;
        info!("Parsed {} DJ Mag entries", entries.len());
        Ok(entries)
    }
}

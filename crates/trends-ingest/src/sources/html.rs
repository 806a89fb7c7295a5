// HTTP fetching and text extraction for chart pages

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use trends_common::{Result, TrendsError};

use crate::config::ChartConfig;

/// Chart sites serve stripped pages to unknown clients
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_5) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.102 Safari/537.36";

/// Shared HTTP client for chart pages
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: Client,
}

impl HtmlFetcher {
    pub fn new(config: &ChartConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| TrendsError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET a page and return its body
    ///
    /// Transport errors, timeouts and non-success statuses are all
    /// `SourceUnavailable` for `source_name`.
    pub async fn fetch(&self, source_name: &str, url: &str) -> Result<String> {
        info!("Fetching {} page: {}", source_name, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrendsError::source_unavailable(source_name, format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendsError::source_unavailable(
                source_name,
                format!("{} returned HTTP {}", url, status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrendsError::source_unavailable(source_name, format!("Failed to read body: {}", e)))?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Parse a CSS selector that is known at compile time
pub(crate) fn selector(source_name: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| TrendsError::source_unavailable(source_name, format!("Invalid selector '{}': {}", css, e)))
}

/// Whitespace-trimmed text of an element and its descendants
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed texts of every node matching `css`, in document order
pub(crate) fn select_texts(source_name: &str, document: &Html, css: &str) -> Result<Vec<String>> {
    let selector = selector(source_name, css)?;
    Ok(document.select(&selector).map(element_text).collect())
}

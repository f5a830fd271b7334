// src/marketwatch.rs
use crate::models::PerformanceRecord;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html};
use std::time::Duration;
use thiserror::Error;

const SECTION_KEYWORDS: [&str; 2] = ["PERFORMANCE", "KEY DATA"];
const PERIOD_MARKERS: [&str; 5] = ["Day", "Week", "Month", "Year", "YTD"];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Source of percentage-performance figures for a symbol.
///
/// Implementations never fail: anything that goes wrong is reported as
/// [`PerformanceRecord::fallback`].
#[async_trait]
pub trait PerformanceSource: Send + Sync {
    async fn fetch_performance(&self, symbol: &str) -> PerformanceRecord;
}

#[derive(Debug, Error)]
enum ScrapeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("no performance rows found")]
    NoData,
}

/// Scrapes the performance table from a MarketWatch quote page.
pub struct MarketWatchScraper {
    client: Client,
    base_url: String,
}

impl MarketWatchScraper {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!(
            "{}/investing/stock/{}",
            self.base_url,
            symbol.trim().to_lowercase()
        )
    }

    async fn scrape(&self, symbol: &str) -> Result<PerformanceRecord, ScrapeError> {
        let url = self.quote_url(symbol);
        debug!("Scraping performance for {} from {}", symbol, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status));
        }

        let body = response.text().await?;
        let record = extract_performance(&body);
        if record.is_empty() {
            return Err(ScrapeError::NoData);
        }
        Ok(record)
    }
}

#[async_trait]
impl PerformanceSource for MarketWatchScraper {
    async fn fetch_performance(&self, symbol: &str) -> PerformanceRecord {
        match self.scrape(symbol).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Performance data unavailable for {}: {}", symbol, e);
                PerformanceRecord::fallback()
            }
        }
    }
}

/// Pulls period -> percentage pairs out of a quote page.
///
/// Every text node mentioning a section keyword anchors a search for the next
/// table in document order (or, failing that, the table enclosing it). Rows of
/// those tables whose first cell names a period contribute `label -> value`;
/// a label seen again later overwrites the earlier value. An empty record means
/// nothing matched.
pub fn extract_performance(html: &str) -> PerformanceRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let elements: Vec<ElementRef> = root.descendants().filter_map(ElementRef::wrap).collect();

    let mut record = PerformanceRecord::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !is_section_heading(text) {
            continue;
        }
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if let Some(table) = following_table(&elements, parent).or_else(|| enclosing_table(parent))
        {
            collect_rows(table, &mut record);
        }
    }
    record
}

fn is_section_heading(text: &str) -> bool {
    let upper = text.to_uppercase();
    SECTION_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}

fn is_named(element: &ElementRef, name: &str) -> bool {
    element.value().name().eq_ignore_ascii_case(name)
}

fn following_table<'a>(elements: &[ElementRef<'a>], anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let position = elements
        .iter()
        .position(|el| std::ptr::eq(el.value(), anchor.value()))?;
    elements[position + 1..]
        .iter()
        .find(|el| is_named(el, "table"))
        .copied()
}

fn enclosing_table(anchor: ElementRef<'_>) -> Option<ElementRef<'_>> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| is_named(el, "table"))
}

fn collect_rows(table: ElementRef<'_>, record: &mut PerformanceRecord) {
    let rows = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| is_named(el, "tr"));
    for row in rows {
        let cells: Vec<ElementRef> = row
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| is_named(el, "td") || is_named(el, "th"))
            .collect();
        if cells.len() < 2 {
            continue;
        }
        let label = cell_text(cells[0]);
        let value = cell_text(cells[1]);
        if label.is_empty() || value.is_empty() {
            continue;
        }
        if PERIOD_MARKERS.iter().any(|marker| label.contains(marker)) {
            record.insert(label, value);
        }
    }
}

// Each text fragment is trimmed, then the fragments are joined without a separator.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

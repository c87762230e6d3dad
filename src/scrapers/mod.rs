//! News listing extraction.
//!
//! Scraping follows a render-then-parse pattern:
//!
//! 1. **Rendering**: [`browser`] loads the listing in headless Chromium and
//!    returns the DOM once client-side rendering has settled
//! 2. **Parsing**: the HTML is mined for articles, first from visible cards
//!    ([`dom`]), then from the embedded page data ([`next_data`]) if the
//!    cards yielded nothing
//!
//! # Failure model
//!
//! Only rendering can fail the run. A card that cannot be parsed is logged
//! and skipped, and unparseable page data simply yields no articles, so the
//! worst non-fatal outcome is an empty list.

pub mod browser;
pub mod dom;
pub mod next_data;

use crate::config::ExtractorConfig;
use crate::models::ArticleRecord;
use browser::RenderPage;
use dom::DomSelectors;
use scraper::Html;
use std::error::Error;
use tracing::{info, instrument};

/// Render the listing page and extract up to `config.max_items` articles.
///
/// # Errors
///
/// Fails if a configured selector is invalid or the page cannot be rendered.
#[instrument(level = "info", skip_all, fields(url = %config.url, max_items = config.max_items))]
pub async fn scrape_news<R: RenderPage>(
    renderer: &R,
    config: &ExtractorConfig,
) -> Result<Vec<ArticleRecord>, Box<dyn Error>> {
    // Compile selectors before paying for a browser launch.
    let selectors = DomSelectors::from_config(config)?;
    let html = renderer.render(&config.url).await?;
    Ok(extract_from_html(&html, &selectors, config))
}

/// Run both extraction strategies over already-rendered HTML.
pub fn extract_from_html(
    html: &str,
    selectors: &DomSelectors,
    config: &ExtractorConfig,
) -> Vec<ArticleRecord> {
    let document = Html::parse_document(html);

    let mut articles = dom::extract_articles(&document, selectors, config.max_items);
    if articles.is_empty() {
        info!("No articles in the DOM; trying embedded page data");
        articles = next_data::extract_from_document(&document, config);
    }

    articles.truncate(config.max_items);
    info!(count = articles.len(), "Scraped articles");
    articles
}

//! # AAU News Board
//!
//! Scrapes the AAU Update news listing and renders the newest articles into a
//! static, fixed-size HTML board for a digital signage screen.
//!
//! ## Usage
//!
//! ```sh
//! aau_news_board --output /srv/signage/index.html
//! ```
//!
//! ## Architecture
//!
//! One pass, no state carried between runs:
//! 1. **Rendering**: Load the client-rendered listing in headless Chromium
//! 2. **Extraction**: Pull article cards out of the DOM, falling back to the
//!    embedded page data
//! 3. **Output**: Lay up to six articles into the board and write the file
//!
//! If nothing could be extracted the board shows a single "News temporarily
//! unavailable" cell, so the screen never keeps a broken page. Only a failure
//! to reach the page at all ends the run without writing a file.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{Level, debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::load_config;
use models::or_placeholder;
use outputs::html::{render_board, write_board};
use scrapers::browser::ChromiumPage;
use utils::{ensure_writable_parent, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("aau_news_board starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.output, ?args.config, "Parsed CLI arguments");

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };
    args.apply(&mut config);

    // Early check: fail before launching a browser if the board cannot be written
    if let Err(e) = ensure_writable_parent(&args.output) {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output location is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Scrape ----
    info!(url = %config.extractor.url, "Scraping news listing");
    let renderer = ChromiumPage::new(&config.extractor, args.chrome_path.clone());
    let articles = match scrapers::scrape_news(&renderer, &config.extractor).await {
        Ok(articles) => articles,
        Err(e) => {
            error!(url = %config.extractor.url, error = %e, "Could not scrape the news listing; no board written");
            return Err(e);
        }
    };

    if articles.is_empty() {
        warn!("No articles found; generating placeholder board");
    } else {
        info!(count = articles.len(), "Found articles");
        for article in &articles {
            info!(title = %truncate_for_log(&article.title, 50), url = %article.url, "Article");
        }
        if tracing::enabled!(Level::DEBUG) {
            let records = serde_json::to_string(&articles)?;
            debug!(%records, "Extracted records");
        }
    }

    // ---- Render ----
    let board = build_board(articles, &config.board);
    write_board(&args.output, &board)?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        path = %args.output.display(),
        "Execution complete"
    );

    Ok(())
}

/// Render the board for `articles`, or the placeholder board if there are none.
fn build_board(articles: Vec<models::ArticleRecord>, board: &config::BoardConfig) -> String {
    let today = Local::now().date_naive();
    render_board(&or_placeholder(articles, today), board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoardConfig, ExtractorConfig};
    use crate::models::UNAVAILABLE_TITLE;
    use crate::scrapers::tests::FixturePage;

    #[tokio::test]
    async fn test_empty_page_produces_placeholder_board() {
        let page = FixturePage::ok("<html><body><div id=\"app\"></div></body></html>");
        let articles = scrapers::scrape_news(&page, &ExtractorConfig::default())
            .await
            .unwrap();
        assert!(articles.is_empty());

        let html = build_board(articles, &BoardConfig::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert_eq!(html.matches("<div class=\"article article--").count(), 1);
        assert!(html.contains(UNAVAILABLE_TITLE));
        assert!(html.contains(models::UNAVAILABLE_IMAGE));
        let today = Local::now().date_naive().format("%d.%m.%Y").to_string();
        assert!(html.contains(&today));
    }

    #[tokio::test]
    async fn test_scraped_page_to_board_file() {
        let page = FixturePage::ok(
            r#"<section>
                 <article>
                   <a href="/news/2024/lab"><img src="/media/lab.jpg?width=120"><h3>New lab</h3></a>
                   <time>2024-03-15T10:00:00Z</time>
                 </article>
                 <article><a href="/news/2024/prize"><h3>Prize &amp; honours</h3></a></article>
                 <article><a href="/news/2024/lab"><h3>New lab again</h3></a></article>
               </section>"#,
        );
        let articles = scrapers::scrape_news(&page, &ExtractorConfig::default())
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        write_board(&path, &build_board(articles, &BoardConfig::default())).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(html.matches("class=\"article article--hero\"").count(), 2);
        assert!(html.contains("https://www.en.update.aau.dk/media/lab.jpg?width=800"));
        assert!(html.contains("update.aau.dk &bull; 15.03.2024"));
        assert!(html.contains("Prize &amp; honours"));
        assert!(html.contains("https://www.en.update.aau.dk/media/aau-logo.png"));
    }
}

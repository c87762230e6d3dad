//! Command-line interface definitions for the news board.
//!
//! Every option is optional and can also come from an environment variable,
//! so a scheduler can run the bare binary.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news board generator.
///
/// Flags override values from the `--config` file, which in turn override
/// the built-in defaults.
///
/// # Examples
///
/// ```sh
/// # Scrape the default listing into ./index.html
/// aau_news_board
///
/// # Custom output and a slower settle delay
/// aau_news_board --output /srv/signage/index.html --settle-ms 5000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// News listing page to scrape
    #[arg(short, long, env = "NEWS_BOARD_URL")]
    pub url: Option<String>,

    /// Maximum number of articles to extract
    #[arg(short = 'n', long, env = "NEWS_BOARD_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Path of the generated HTML board
    #[arg(short, long, env = "NEWS_BOARD_OUTPUT", default_value = "index.html")]
    pub output: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_BOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extra wait in milliseconds after the page's network goes idle
    #[arg(long, env = "NEWS_BOARD_SETTLE_MS")]
    pub settle_ms: Option<u64>,

    /// Chromium/Chrome executable; auto-detected when absent
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.extractor.url = url.clone();
        }
        if let Some(max_items) = self.max_items {
            config.extractor.max_items = max_items;
        }
        if let Some(settle_ms) = self.settle_ms {
            config.extractor.settle_ms = settle_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::parse_from(["aau_news_board"]);
        assert_eq!(cli.output, PathBuf::from("index.html"));
        assert!(cli.url.is_none());
        assert!(cli.config.is_none());

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.extractor.max_items, 10);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "aau_news_board",
            "--url",
            "https://www.en.update.aau.dk/news?page=2",
            "-n",
            "4",
            "--settle-ms",
            "5000",
            "-o",
            "/tmp/board.html",
        ]);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.extractor.url, "https://www.en.update.aau.dk/news?page=2");
        assert_eq!(config.extractor.max_items, 4);
        assert_eq!(config.extractor.settle_ms, 5000);
        assert_eq!(cli.output, PathBuf::from("/tmp/board.html"));
    }
}

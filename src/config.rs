//! Runtime configuration for the scraper and the board renderer.
//!
//! Every knob has a default matching the current AAU Update site, so the
//! binary runs with no configuration at all. A YAML file passed with
//! `--config` may override any subset of fields:
//!
//! ```yaml
//! extractor:
//!   settle_ms: 4000
//!   candidate_strategies:
//!     - "div.news-card"
//!     - "a[href*='/news/']"
//! board:
//!   site_label: "news.aau.dk"
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub board: BoardConfig,
}

/// Heuristics and timings used to pull articles out of the listing page.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Page that lists the news.
    pub url: String,
    /// Origin that relative links and images are resolved against.
    pub site_origin: String,
    /// Maximum number of records returned.
    pub max_items: usize,
    /// Upper bound for navigation plus the network-idle wait.
    pub navigation_timeout_ms: u64,
    /// How long the resource count must stay unchanged to count as idle.
    pub network_idle_ms: u64,
    /// Extra wait after the network went idle.
    pub settle_ms: u64,
    /// Ordered selector groups for candidate containers. The first group
    /// that matches anything wins.
    pub candidate_strategies: Vec<String>,
    pub link_selector: String,
    pub title_selector: String,
    pub image_selector: String,
    pub date_selector: String,
    /// Candidate text at or above this many characters is never used as a
    /// fallback title.
    pub max_fallback_title_chars: usize,
    /// Value forced into an image URL's `width` query parameter.
    pub image_width: u32,
    /// Element id of the embedded page-data script.
    pub data_script_id: String,
    pub json_title_keys: Vec<String>,
    pub json_url_keys: Vec<String>,
    pub json_image_keys: Vec<String>,
    pub json_date_keys: Vec<String>,
    /// Keys tried on a nested image object.
    pub json_image_object_keys: Vec<String>,
    /// Article URL built from a `slug`; `{origin}` and `{slug}` are replaced.
    pub slug_url_template: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            url: "https://www.en.update.aau.dk/news".to_string(),
            site_origin: "https://www.en.update.aau.dk".to_string(),
            max_items: 10,
            navigation_timeout_ms: 30_000,
            network_idle_ms: 500,
            settle_ms: 2_000,
            candidate_strategies: strings(&[
                "article, .news-item, [class*='news'], [class*='article'], a[href*='/news/']",
                "a[href*='/news/'][href*='202']",
            ]),
            link_selector: "a".to_string(),
            title_selector: "h2, h3, h4, [class*='title'], [class*='heading']".to_string(),
            image_selector: "img".to_string(),
            date_selector: "time, [class*='date'], [class*='time']".to_string(),
            max_fallback_title_chars: 200,
            image_width: 800,
            data_script_id: "__NEXT_DATA__".to_string(),
            json_title_keys: strings(&["title", "headline", "name"]),
            json_url_keys: strings(&["url", "href", "link"]),
            json_image_keys: strings(&["image", "img", "thumbnail", "media", "photo"]),
            json_date_keys: strings(&["date", "publishedAt", "createdAt", "updateDate", "createDate"]),
            json_image_object_keys: strings(&["url", "src", "href"]),
            slug_url_template: "{origin}/news/{slug}".to_string(),
        }
    }
}

/// Presentation settings for the generated board.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Document `<title>`.
    pub page_title: String,
    /// Label shown before the date on every cell.
    pub site_label: String,
    /// Image used when a record has none or its image fails to load.
    pub placeholder_image: String,
    /// Meta-refresh interval for the viewer.
    pub refresh_secs: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            page_title: "AAU Update News".to_string(),
            site_label: "update.aau.dk".to_string(),
            placeholder_image: "https://www.en.update.aau.dk/media/aau-logo.png".to_string(),
            refresh_secs: 3600,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Load configuration from a YAML file, or the defaults when `path` is `None`.
#[instrument(level = "info")]
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    let config = parse_config(&raw)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Parse configuration YAML. Empty input yields the defaults.
pub fn parse_config(raw: &str) -> Result<Config, Box<dyn Error>> {
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_aau_update() {
        let config = Config::default();
        assert_eq!(config.extractor.url, "https://www.en.update.aau.dk/news");
        assert_eq!(config.extractor.max_items, 10);
        assert_eq!(config.extractor.image_width, 800);
        assert_eq!(config.extractor.candidate_strategies.len(), 2);
        assert_eq!(config.board.refresh_secs, 3600);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
extractor:
  settle_ms: 4000
  candidate_strategies:
    - "div.card"
board:
  site_label: "news.example.org"
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.extractor.settle_ms, 4000);
        assert_eq!(config.extractor.candidate_strategies, vec!["div.card".to_string()]);
        assert_eq!(config.extractor.max_items, 10);
        assert_eq!(config.extractor.title_selector, ExtractorConfig::default().title_selector);
        assert_eq!(config.board.site_label, "news.example.org");
        assert_eq!(config.board.refresh_secs, 3600);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = parse_config("  \n").unwrap();
        assert_eq!(config.extractor.site_origin, "https://www.en.update.aau.dk");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_config("extractor: [1, 2").is_err());
        assert!(parse_config("extractor:\n  max_items: lots").is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.yaml");
        std::fs::write(&path, "extractor:\n  max_items: 4\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.extractor.max_items, 4);
    }
}

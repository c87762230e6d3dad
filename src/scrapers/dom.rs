//! Article extraction from the rendered DOM.
//!
//! Candidate containers are found with an ordered list of selector groups;
//! the first group that matches anything is used. Each candidate is then
//! mined for a link, a title, an image and a date on its own, so one odd
//! card never costs the rest of the page.

use crate::config::ExtractorConfig;
use crate::models::ArticleRecord;
use crate::utils::{resolve_url, truncate_for_log, upscale_image_width};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, info, warn};

/// Tags whose boundaries start a new line in visible text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Selectors compiled once from [`ExtractorConfig`].
#[derive(Debug)]
pub struct DomSelectors {
    candidate_strategies: Vec<Selector>,
    link: Selector,
    title: Selector,
    image: Selector,
    date: Selector,
    origin: String,
    image_width: u32,
    max_fallback_title_chars: usize,
}

impl DomSelectors {
    /// Compile every configured selector.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first selector that does not parse.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, Box<dyn Error>> {
        let candidate_strategies = config
            .candidate_strategies
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            candidate_strategies,
            link: parse_selector(&config.link_selector)?,
            title: parse_selector(&config.title_selector)?,
            image: parse_selector(&config.image_selector)?,
            date: parse_selector(&config.date_selector)?,
            origin: config.site_origin.clone(),
            image_width: config.image_width,
            max_fallback_title_chars: config.max_fallback_title_chars,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, Box<dyn Error>> {
    Selector::parse(selector).map_err(|e| format!("invalid selector {selector:?}: {e}").into())
}

/// Candidate containers from the first strategy that matches anything.
fn find_candidates<'a>(document: &'a Html, selectors: &DomSelectors) -> Vec<ElementRef<'a>> {
    for (rank, strategy) in selectors.candidate_strategies.iter().enumerate() {
        let found: Vec<ElementRef<'a>> = document.select(strategy).collect();
        if !found.is_empty() {
            info!(strategy = rank, count = found.len(), "Found candidate elements");
            return found;
        }
        debug!(strategy = rank, "Selector strategy matched nothing");
    }
    Vec::new()
}

/// Extract up to `max_items` records from the rendered document.
///
/// Only the first `max_items` candidates are inspected. Records are
/// deduplicated by URL as they are accepted, so the result keeps page order.
pub fn extract_articles(
    document: &Html,
    selectors: &DomSelectors,
    max_items: usize,
) -> Vec<ArticleRecord> {
    let mut seen = HashSet::new();
    let mut articles = Vec::new();

    for (index, element) in find_candidates(document, selectors)
        .into_iter()
        .take(max_items)
        .enumerate()
    {
        match extract_candidate(element, selectors) {
            Ok(Some(article)) => {
                if seen.insert(article.url.clone()) {
                    debug!(index, title = %truncate_for_log(&article.title, 50), "Accepted article");
                    articles.push(article);
                } else {
                    debug!(index, url = %article.url, "Duplicate article URL");
                }
            }
            Ok(None) => debug!(index, "Candidate has no title or link"),
            Err(e) => warn!(index, error = %e, "Error processing article candidate; skipping"),
        }
    }

    info!(count = articles.len(), "Extracted articles from DOM");
    articles
}

/// Pull one record out of a candidate element.
///
/// Returns `Ok(None)` when the element lacks a title or a link.
fn extract_candidate(
    element: ElementRef<'_>,
    selectors: &DomSelectors,
) -> Result<Option<ArticleRecord>, Box<dyn Error>> {
    let href = element
        .value()
        .attr("href")
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            element
                .select(&selectors.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .filter(|h| !h.trim().is_empty())
        });
    let url = match href {
        Some(href) => Some(resolve_url(&selectors.origin, href)?),
        None => None,
    };

    let title = match element.select(&selectors.title).next() {
        Some(heading) => Some(collapse_whitespace(&visible_text(heading))),
        None => fallback_title(element, selectors.max_fallback_title_chars),
    };

    let (Some(title), Some(url)) = (title.filter(|t| !t.is_empty()), url) else {
        return Ok(None);
    };
    let mut article = ArticleRecord::new(title, url);

    if let Some(img) = element.select(&selectors.image).next() {
        let src = img
            .value()
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| img.value().attr("data-src").filter(|s| !s.trim().is_empty()));
        if let Some(src) = src {
            match resolve_url(&selectors.origin, src) {
                Ok(absolute) => {
                    article.image = Some(upscale_image_width(&absolute, selectors.image_width));
                }
                Err(e) => warn!(url = %article.url, error = %e, "Unusable image; using placeholder"),
            }
        }
    }

    if let Some(date) = element.select(&selectors.date).next() {
        let text = collapse_whitespace(&visible_text(date));
        let date = if text.is_empty() {
            date.value().attr("datetime").map(str::to_string)
        } else {
            Some(text)
        };
        article.date = date.filter(|d| !d.is_empty());
    }

    Ok(Some(article))
}

/// First line of the candidate's own text, if the whole text is short.
///
/// Long text means the selector caught a whole card or list, and its first
/// line is unlikely to be a headline.
fn fallback_title(element: ElementRef<'_>, max_chars: usize) -> Option<String> {
    let text = visible_text(element);
    if text.is_empty() || text.chars().count() >= max_chars {
        return None;
    }
    text.lines().next().map(str::to_string)
}

/// Approximate rendered text: block elements break lines, whitespace within
/// a line collapses, blank lines and script/style content are dropped.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_TAGS.contains(&el.name()) => raw.push('\n'),
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .is_some_and(|p| matches!(p.name(), "script" | "style" | "noscript" | "template"));
                if !hidden {
                    raw.push_str(text);
                }
            }
            _ => {}
        }
    }
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

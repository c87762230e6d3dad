//! Fallback extraction from the embedded page-data blob.
//!
//! Server-rendered JavaScript frameworks ship the page's data as JSON in a
//! `<script id="__NEXT_DATA__">` tag. When no article cards can be found in
//! the DOM, this module walks that JSON looking for objects shaped like
//! articles: something title-like plus something link- or image-like.
//!
//! # Walk order
//!
//! Nodes are visited pre-order, depth first: an object is inspected before
//! its children, object members in document order, array items in index
//! order. The walk uses an explicit stack, so deeply nested payloads cannot
//! overflow the call stack.
//!
//! Parsing still recurses, so blobs nested deeper than [`MAX_DATA_DEPTH`]
//! are rejected before they reach the parser.

use crate::config::ExtractorConfig;
use crate::models::{ArticleRecord, dedup_by_url};
use crate::utils::{resolve_url, upscale_image_width};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Locate the data script in `document` and extract articles from it.
///
/// A missing script, or one that is not valid JSON, yields an empty list.
#[instrument(level = "info", skip_all, fields(script_id = %config.data_script_id))]
pub fn extract_from_document(document: &Html, config: &ExtractorConfig) -> Vec<ArticleRecord> {
    let Some(raw) = find_data_script(document, &config.data_script_id) else {
        info!("No embedded page data found");
        return Vec::new();
    };
    let depth = nesting_depth(&raw);
    if depth > MAX_DATA_DEPTH {
        warn!(depth, max = MAX_DATA_DEPTH, "Embedded page data is nested too deeply; ignoring it");
        return Vec::new();
    }
    match parse_data(&raw) {
        Ok(data) => extract_from_value(&data, config),
        Err(e) => {
            warn!(error = %e, bytes = raw.len(), "Error parsing embedded page data");
            Vec::new()
        }
    }
}

/// Deepest object/array nesting accepted in the page data.
pub const MAX_DATA_DEPTH: usize = 1000;

/// Parse without serde_json's default 128-level limit; callers bound the
/// depth with [`nesting_depth`] first.
fn parse_data(raw: &str) -> Result<Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(raw);
    de.disable_recursion_limit();
    let data = Value::deserialize(&mut de)?;
    de.end()?;
    Ok(data)
}

/// Maximum bracket nesting of a JSON text, ignoring brackets inside strings.
fn nesting_depth(raw: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let mut in_string = false;
    let mut escaped = false;
    for byte in raw.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn find_data_script(document: &Html, id: &str) -> Option<String> {
    // Ids like `__NEXT_DATA__` are fine in an attribute selector but not in
    // every `#id` form, so match on the attribute.
    let selector = Selector::parse(&format!("script[id={}]", css_string(id))).ok()?;
    document
        .select(&selector)
        .next()
        .map(|script| script.text().collect::<String>())
}

fn css_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Walk `data` and collect every article-shaped object, in walk order.
pub fn extract_from_value(data: &Value, config: &ExtractorConfig) -> Vec<ArticleRecord> {
    let mut articles = Vec::new();
    let mut stack: Vec<&Value> = vec![data];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(obj) => {
                if looks_like_article(obj, config) {
                    match article_from_object(obj, config) {
                        Ok(Some(article)) => articles.push(article),
                        Ok(None) => {}
                        Err(e) => debug!(error = %e, "Skipping article-like object"),
                    }
                }
                stack.extend(obj.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    let articles = dedup_by_url(articles);
    info!(count = articles.len(), "Extracted articles from embedded page data");
    articles
}

fn has_any(obj: &Map<String, Value>, keys: &[String]) -> bool {
    keys.iter().any(|k| obj.contains_key(k))
}

fn looks_like_article(obj: &Map<String, Value>, config: &ExtractorConfig) -> bool {
    let has_link = has_any(obj, &config.json_url_keys) || obj.contains_key("slug");
    has_any(obj, &config.json_title_keys) && (has_link || has_any(obj, &config.json_image_keys))
}

/// First string value among `keys`, skipping keys of any other type.
fn first_string<'a>(obj: &'a Map<String, Value>, keys: &[String]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(k))
        .find_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn article_from_object(
    obj: &Map<String, Value>,
    config: &ExtractorConfig,
) -> Result<Option<ArticleRecord>, Box<dyn Error>> {
    let Some(title) = first_string(obj, &config.json_title_keys) else {
        return Ok(None);
    };

    let slug_url = obj
        .get("slug")
        .and_then(scalar_string)
        .filter(|slug| !slug.is_empty())
        .map(|slug| {
            config
                .slug_url_template
                .replace("{origin}", config.site_origin.trim_end_matches('/'))
                .replace("{slug}", slug.trim_start_matches('/'))
        });
    let url = match slug_url.or_else(|| first_string(obj, &config.json_url_keys).map(str::to_string)) {
        Some(url) => resolve_url(&config.site_origin, &url)?,
        None => return Ok(None),
    };

    let mut article = ArticleRecord::new(title, url);

    // Only the first image key present counts, whatever its shape.
    if let Some(image) = config.json_image_keys.iter().find_map(|k| obj.get(k)) {
        let src = match image {
            Value::String(s) => Some(s.as_str()),
            Value::Object(nested) => first_string(nested, &config.json_image_object_keys),
            _ => None,
        };
        if let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) {
            match resolve_url(&config.site_origin, src) {
                Ok(absolute) => {
                    article.image = Some(upscale_image_width(&absolute, config.image_width));
                }
                Err(e) => warn!(url = %article.url, error = %e, "Unusable image; using placeholder"),
            }
        }
    }

    if let Some(date) = config.json_date_keys.iter().find_map(|k| obj.get(k)) {
        article.date = scalar_string(date)
            .map(|d| d.chars().take(10).collect::<String>())
            .filter(|d| !d.is_empty());
    }

    Ok(Some(article))
}

/// Strings as-is, numbers in decimal; anything else is not a scalar.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

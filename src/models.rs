//! Data model for scraped news items.
//!
//! A run builds a fresh list of [`ArticleRecord`]s from the live listing page,
//! hands it to the board renderer and drops it. Nothing is persisted.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Title used for the synthetic record rendered when nothing was scraped.
pub const UNAVAILABLE_TITLE: &str = "News temporarily unavailable";

/// Link target of the synthetic record.
pub const UNAVAILABLE_URL: &str = "https://www.en.update.aau.dk/news";

/// Logo shown by the synthetic record.
pub const UNAVAILABLE_IMAGE: &str = "https://www.aau.dk/digitalAssets/1075/1075444_aau-logo-rgb.png";

/// One news item extracted from the listing page.
///
/// `title` and `url` are always present; a candidate missing either never
/// becomes a record. `url` and `image` are absolute by the time a record is
/// built. `date` is kept exactly as the page wrote it and only normalized
/// when the board is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The article headline.
    pub title: String,
    /// Absolute link to the article.
    pub url: String,
    /// Absolute image URL, if the listing showed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Raw publication date as found on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            image: None,
            date: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Drop every record whose `url` was already seen, keeping the first.
pub fn dedup_by_url(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records
        .into_iter()
        .unique_by(|record| record.url.clone())
        .collect()
}

/// The record rendered in place of real news when extraction came back empty.
pub fn placeholder_record(today: NaiveDate) -> ArticleRecord {
    ArticleRecord::new(UNAVAILABLE_TITLE, UNAVAILABLE_URL)
        .with_image(UNAVAILABLE_IMAGE)
        .with_date(today.format("%Y-%m-%d").to_string())
}

/// Return `records` unchanged, or the single placeholder record if empty.
pub fn or_placeholder(records: Vec<ArticleRecord>, today: NaiveDate) -> Vec<ArticleRecord> {
    if records.is_empty() {
        vec![placeholder_record(today)]
    } else {
        records
    }
}

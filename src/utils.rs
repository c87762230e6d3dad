//! Utility functions for URL normalization, log formatting, and file system checks.
//!
//! This module provides helpers shared by the scrapers and the board writer:
//! - Resolving site-relative links and images against the site origin
//! - Requesting a larger rendition of thumbnail images
//! - String truncation for logging
//! - Output location validation

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

/// Make `href` absolute against `origin`.
///
/// Absolute URLs are returned unchanged. Anything else (`/news/123`,
/// `//cdn.example.com/x.jpg`, `news/123`) is joined onto the origin.
///
/// # Errors
///
/// Returns an error if `origin` is not a valid base URL, the join fails, or
/// the result is not an `http`/`https` URL (`javascript:`, `mailto:`, ...).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     resolve_url("https://www.en.update.aau.dk", "/news/123")?,
///     "https://www.en.update.aau.dk/news/123"
/// );
/// ```
pub fn resolve_url(origin: &str, href: &str) -> Result<String, Box<dyn Error>> {
    let href = href.trim();
    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(_) => {
            let base =
                Url::parse(origin).map_err(|e| format!("invalid site origin {origin:?}: {e}"))?;
            base.join(href)
                .map_err(|e| format!("cannot resolve {href:?} against {origin}: {e}"))?
        }
    };
    match resolved.scheme() {
        "http" | "https" => Ok(resolved.to_string()),
        scheme => Err(format!("unsupported URL scheme {scheme:?} in {href:?}").into()),
    }
}

/// Replace the `width` query parameter of an image URL with `width`.
///
/// Listing pages ask the CDN for tiny thumbnails; the board cells are much
/// larger. URLs without a `width` parameter, or that do not parse, are
/// returned unchanged. Other query parameters are kept in order.
pub fn upscale_image_width(image: &str, width: u32) -> String {
    let Ok(mut parsed) = Url::parse(image) else {
        return image.to_string();
    };
    if !parsed.query_pairs().any(|(key, _)| key == "width") {
        return image.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            if key == "width" {
                (key.into_owned(), width.to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    debug!(from = %image, to = %parsed, "Upscaled image width");
    parsed.to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always land on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the directory that will hold `path` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
/// Run before scraping so a bad output location fails before the browser
/// is launched.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_writable_parent(path: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    stdfs::create_dir_all(dir)?;
    let scratch = dir.join("..__write_check__");
    stdfs::File::create(&scratch)?;
    let _ = stdfs::remove_file(&scratch);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.en.update.aau.dk";

    #[test]
    fn test_resolve_site_relative_path() {
        assert_eq!(
            resolve_url(ORIGIN, "/news/123").unwrap(),
            "https://www.en.update.aau.dk/news/123"
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_urls() {
        assert_eq!(
            resolve_url(ORIGIN, "https://www.aau.dk/news/x").unwrap(),
            "https://www.aau.dk/news/x"
        );
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(
            resolve_url(ORIGIN, "//cdn.aau.dk/img.png").unwrap(),
            "https://cdn.aau.dk/img.png"
        );
    }

    #[test]
    fn test_resolve_rejects_non_web_schemes() {
        assert!(resolve_url(ORIGIN, "javascript:alert(1)").is_err());
        assert!(resolve_url(ORIGIN, "mailto:news@aau.dk").is_err());
        assert!(resolve_url(ORIGIN, "data:image/png;base64,AAAA").is_err());
        assert!(resolve_url(ORIGIN, "http://www.aau.dk/news/x").is_ok());
    }

    #[test]
    fn test_resolve_with_bad_origin_fails() {
        assert!(resolve_url("not a url", "/news/1").is_err());
    }

    #[test]
    fn test_upscale_replaces_width() {
        assert_eq!(
            upscale_image_width("https://www.en.update.aau.dk/media/img.jpg?width=120", 800),
            "https://www.en.update.aau.dk/media/img.jpg?width=800"
        );
    }

    #[test]
    fn test_upscale_keeps_other_parameters() {
        assert_eq!(
            upscale_image_width("https://x.dk/img.jpg?height=90&width=120&mode=crop", 800),
            "https://x.dk/img.jpg?height=90&width=800&mode=crop"
        );
    }

    #[test]
    fn test_upscale_without_width_is_untouched() {
        let url = "https://x.dk/img.jpg?height=90";
        assert_eq!(upscale_image_width(url, 800), url);
        assert_eq!(upscale_image_width("relative.jpg?width=1", 800), "relative.jpg?width=1");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ææææ", 2);
        assert_eq!(result, "ææ…(+4 bytes)");
    }

    #[test]
    fn test_ensure_writable_parent_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/index.html");
        ensure_writable_parent(&target).unwrap();
        assert!(dir.path().join("nested/out").is_dir());
        assert!(!dir.path().join("nested/out/..__write_check__").exists());
    }
}
